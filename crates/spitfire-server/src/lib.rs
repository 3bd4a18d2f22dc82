//! Spitfire world server shell.
//!
//! Wires the map, alliance, and market cores behind shared locks, runs the
//! periodic rescan and matching tasks, and owns configuration. Packet
//! dispatch and transport live in the surrounding server, not here.

pub mod config;
pub mod tasks;
pub mod world;

pub use config::{ConfigError, MarketConfig, ServerConfig};
pub use tasks::{spawn_background_tasks, unix_ms};
pub use world::World;
