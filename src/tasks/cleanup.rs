//! Expiry Sweep Task
//!
//! Background task that periodically purges expired cache entries.
//!
//! Reads evict expired entries lazily, but keys that are never read again
//! would otherwise stay in memory until invalidated. The same pass forgets
//! rate-limit windows with no recent calls.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::ResourceCache;

/// Spawns a background task that periodically sweeps the cache.
///
/// # Arguments
/// * `cache` - Cache to sweep; the task stops on `close` or once every
///   other handle to the cache is dropped
/// * `cleanup_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task.
///
/// # Example
/// ```ignore
/// let cache = ResourceCache::new();
/// let sweeper = spawn_cleanup_task(&cache, 60);
/// // Later, during shutdown:
/// cache.close().await;
/// ```
pub fn spawn_cleanup_task(cache: &ResourceCache, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));
    let weak = cache.downgrade();

    let handle = tokio::spawn(async move {
        info!(
            "Starting expiry sweep task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let Some(cache) = ResourceCache::upgrade(&weak) else {
                info!("Cache dropped, stopping expiry sweep task");
                break;
            };
            cache.sweep().await;
        }
    });

    cache.attach_sweeper(handle.abort_handle());
    handle
}
