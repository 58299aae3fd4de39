//! Background expiration sweeper.
//!
//! Every 10 seconds the sweeper asks the keyspace to purge everything the
//! TTL index says is due. Lazy per-read expiration keeps results correct
//! even when the sweeper falls behind; this task only reclaims memory for
//! keys nobody touches.

use std::sync::Arc;
use std::time::Duration;

use ferrite_core::time::now_secs;
use ferrite_core::Keyspace;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Interval between sweeps.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Runs until `shutdown` flips.
pub async fn run(keyspace: Arc<Keyspace>, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // the first tick completes immediately; skip it so sweeps start one
    // interval after boot
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let removed = keyspace.purge_expired(now_secs());
                if removed > 0 {
                    debug!(removed, "evicted expired keys");
                }
            }
            _ = shutdown.changed() => return,
        }
    }
}
