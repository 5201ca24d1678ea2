use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use super::SyncJob;

/// Spawns the fixed-interval sync loop. Cycles run inline on the loop task,
/// so a slow cycle delays the next tick instead of overlapping it. The loop
/// exits once `shutdown` flips to `true` or its sender is dropped.
pub fn spawn_sync_loop(
    job: Arc<SyncJob>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("Sync loop started (every {}s)", interval.as_secs());

        loop {
            tokio::select! {
                _ = ticker.tick() => job.tick().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Sync loop stopped");
    })
}
