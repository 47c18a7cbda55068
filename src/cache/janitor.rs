//! Background purge of expired cache entries.

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::cache::ResourceCache;

/// Spawn a task that purges expired entries every `interval` until `shutdown` fires.
///
/// A zero interval disables purging; the task only waits for shutdown and
/// expired entries are still evicted lazily on lookup.
pub fn spawn_janitor(
    cache: ResourceCache,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if interval.is_zero() {
            tracing::debug!("Cache janitor disabled (zero interval)");
            let _ = shutdown.recv().await;
            return;
        }

        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::debug!("Cache janitor stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = cache.purge_expired();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = cache.len(), "Purged expired cache entries");
                    }
                }
            }
        }
    })
}
