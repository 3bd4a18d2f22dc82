//! Periodic background work: zone rescans and market matching.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::world::World;

/// Milliseconds since the unix epoch.
pub fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before unix epoch")
        .as_millis() as u64
}

/// Spawn the rescan and matching loops. Handles are returned so the caller
/// can abort them on shutdown.
pub fn spawn_background_tasks(world: Arc<World>) -> Vec<JoinHandle<()>> {
    let rescan = {
        let world = world.clone();
        tokio::spawn(async move {
            let mut ticker = interval(world.config().rescan_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let started = Instant::now();
                world.rescan();
                debug!(elapsed_ms = started.elapsed().as_millis() as u64, "zone rescan complete");
            }
        })
    };

    let matching = {
        let world = world.clone();
        tokio::spawn(async move {
            let mut ticker = interval(world.config().market.matching_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let fills = world.process_market(unix_ms());
                if !fills.is_empty() {
                    // The economy layer applies resource/coin transfers from
                    // these fills; this core only reports them.
                    info!(fills = fills.len(), "market matching pass crossed orders");
                }
            }
        })
    };

    vec![rescan, matching]
}
