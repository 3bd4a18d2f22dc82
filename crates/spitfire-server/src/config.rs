//! Server configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("map size {0} must be a positive multiple of 4")]
    InvalidMapSize(u32),
}

/// Server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// World side length in tiles (positive multiple of 4)
    pub map_size: u32,
    /// Seed for the deterministic world RNG
    pub rng_seed: u64,
    /// Member cap per alliance
    pub member_limit: u32,
    /// Lockout after a war declaration
    pub enemy_cooldown: Duration,
    /// Cadence of the full zone-statistics rescan
    pub rescan_interval: Duration,
    /// Market settings
    pub market: MarketConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            map_size: 400,
            rng_seed: 1945,
            member_limit: 500,
            enemy_cooldown: Duration::from_secs(24 * 60 * 60),
            rescan_interval: Duration::from_secs(300),
            market: MarketConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.map_size == 0 || self.map_size % 4 != 0 {
            return Err(ConfigError::InvalidMapSize(self.map_size));
        }
        Ok(())
    }
}

/// Market configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Staleness window of the listing snapshot cache
    pub cache_ttl: Duration,
    /// Cadence of the matching pass
    pub matching_interval: Duration,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(5),
            matching_interval: Duration::from_secs(30),
        }
    }
}

/// Load and validate a YAML config file.
pub fn load(path: impl AsRef<Path>) -> Result<ServerConfig, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    let config: ServerConfig = serde_yaml::from_str(&text)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ServerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.map_size, 400);
        assert_eq!(config.market.cache_ttl, Duration::from_secs(5));
        assert_eq!(config.enemy_cooldown, Duration::from_secs(86_400));
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let config: ServerConfig = serde_yaml::from_str("map_size: 200\n").unwrap();
        config.validate().unwrap();
        assert_eq!(config.map_size, 200);
        assert_eq!(config.member_limit, 500);
    }

    #[test]
    fn odd_map_sizes_are_rejected() {
        let config: ServerConfig = serde_yaml::from_str("map_size: 30\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMapSize(30))));
    }
}
