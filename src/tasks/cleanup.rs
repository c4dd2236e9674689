//! Cache Sweep Task
//!
//! Background task that periodically removes expired cache entries.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::TtlCache;

/// Spawns a background task that periodically sweeps expired entries out
/// of the cache.
///
/// The sweep plus the lazy expiry check on reads are the only expiry
/// mechanisms; no entry carries its own timer. The task runs until the
/// returned handle is aborted.
///
/// # Arguments
/// * `cache` - Cache handle to sweep
/// * `interval_ms` - Milliseconds between sweep runs
///
/// # Example
/// ```ignore
/// let cache: TtlCache<String> = TtlCache::new(1000, 300_000);
/// let sweep_handle = spawn_cache_sweep(cache.clone(), 30_000);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_cache_sweep<V>(cache: TtlCache<V>, interval_ms: u64) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    let interval = Duration::from_millis(interval_ms);

    tokio::spawn(async move {
        info!(interval_ms, "starting cache sweep task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.cleanup_expired().await;

            if removed > 0 {
                info!(removed, "cache sweep removed expired entries");
            } else {
                debug!("cache sweep found no expired entries");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sweep_removes_expired_entries() {
        let cache: TtlCache<String> = TtlCache::new(100, 300_000);

        cache.set("expire_soon", "value".to_string(), Some(20)).await;

        let handle = spawn_cache_sweep(cache.clone(), 30);

        // Wait for the entry to expire and a sweep to run
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(cache.len().await, 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_preserves_valid_entries() {
        let cache: TtlCache<String> = TtlCache::new(100, 300_000);

        cache.set("long_lived", "value".to_string(), Some(60_000)).await;

        let handle = spawn_cache_sweep(cache.clone(), 20);

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(cache.get("long_lived").await, Some("value".to_string()));

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let cache: TtlCache<String> = TtlCache::new(100, 300_000);

        let handle = spawn_cache_sweep(cache, 20);
        handle.abort();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
