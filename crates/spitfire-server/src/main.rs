//! Spitfire world core
//!
//! Hosts the world map, alliance diplomacy and the resource market with
//! their periodic background passes. Sessions, packet routing and the
//! database live in the surrounding game server.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use spitfire_core::{MemoryAllianceStore, NullNotifier};
use spitfire_server::{config, spawn_background_tasks, ServerConfig, World};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => config::load(path)?,
        None => ServerConfig::default(),
    };
    config.validate()?;

    info!(
        map_size = config.map_size,
        rescan_secs = config.rescan_interval.as_secs(),
        "starting spitfire world core"
    );

    let world = Arc::new(World::new(
        config,
        Arc::new(MemoryAllianceStore::new()),
        Arc::new(NullNotifier),
    )?);
    world.rescan();

    let tasks = spawn_background_tasks(world.clone());

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    for task in tasks {
        task.abort();
    }
    Ok(())
}
