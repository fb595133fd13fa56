//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries ahead of
//! access.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::SharedCache;

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// Each sweep locks the shared adapter on the blocking pool and calls
/// `cleanup_expired`. Adapters that expire items on their own report zero.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let state = AppState::new(Box::new(MemoryCache::new(0)));
/// let cleanup_handle = spawn_cleanup_task(state.cache.clone(), 1);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(cache: SharedCache, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} seconds",
            cleanup_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let cache = Arc::clone(&cache);
            let swept = tokio::task::spawn_blocking(move || cache.blocking_lock().cleanup_expired())
                .await;

            match swept {
                Ok(Ok(0)) => debug!("TTL cleanup: no expired entries found"),
                Ok(Ok(removed)) => info!("TTL cleanup: removed {} expired entries", removed),
                Ok(Err(err)) => warn!("TTL cleanup failed: {}", err),
                Err(err) => warn!("TTL cleanup task panicked: {}", err),
            }
        }
    })
}
