//! TTL Cache Module
//!
//! Shared async facade over [`CacheStore`] adding single-flight computation.
//!
//! Many concurrent tasks (one per chat interaction) read through this type.
//! When several of them miss on the same key at once, exactly one
//! computation runs; the rest await its result. In-flight computations live
//! in a registry separate from the store, so they are never visible through
//! `len()`, eviction, or statistics.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::cache::store::CacheStore;
use crate::cache::StatsSnapshot;
use crate::error::{Error, Result};

/// Outcome delivered to every caller awaiting one in-flight computation.
type FlightResult<V> = Result<V>;

/// In-flight computations by key. Entries exist only while a computation
/// is running and are removed when it settles, on success and on failure.
type FlightMap<V> = HashMap<String, broadcast::Sender<FlightResult<V>>>;

// == TTL Cache ==
/// Cloneable handle to a shared TTL/LRU cache.
///
/// All operations except the computation inside
/// [`get_or_compute`](Self::get_or_compute) complete without suspending on
/// anything but the store lock, which is never held across a computation.
/// A slow computation therefore only delays callers awaiting that key.
///
/// # Example
/// ```no_run
/// use hivekit::TtlCache;
///
/// # async fn demo() -> hivekit::Result<()> {
/// let cache: TtlCache<String> = TtlCache::new(100, 60_000);
/// let value = cache
///     .get_or_compute("guild:1:settings", None, || async {
///         Ok("from the database".to_string())
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TtlCache<V> {
    /// Shared store; exclusively mutated through this handle's methods
    store: Arc<RwLock<CacheStore<V>>>,
    /// In-flight computation registry, keyed identically to the store
    inflight: Arc<Mutex<FlightMap<V>>>,
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            inflight: Arc::clone(&self.inflight),
        }
    }
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a new cache handle.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries the cache can hold
    /// * `default_ttl_ms` - Default TTL in milliseconds, 0 disables expiry by default
    pub fn new(max_entries: usize, default_ttl_ms: u64) -> Self {
        Self {
            store: Arc::new(RwLock::new(CacheStore::new(max_entries, default_ttl_ms))),
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    // == Set ==
    /// Stores a key-value pair, evicting the oldest entry at capacity.
    pub async fn set(&self, key: &str, value: V, ttl_ms: Option<u64>) {
        self.store.write().await.set(key.to_string(), value, ttl_ms);
    }

    // == Get ==
    /// Retrieves a value if present and unexpired.
    pub async fn get(&self, key: &str) -> Option<V> {
        // Write lock: a read re-touches LRU order and updates counters
        self.store.write().await.get(key)
    }

    /// Checks whether a `get` for this key would hit, with identical
    /// accounting.
    pub async fn has(&self, key: &str) -> bool {
        self.store.write().await.has(key)
    }

    // == Delete ==
    /// Removes an entry; returns whether one existed.
    pub async fn del(&self, key: &str) -> bool {
        self.store.write().await.del(key)
    }

    /// Deletes every key matching the regular expression `pattern`;
    /// returns the number removed.
    pub async fn del_pattern(&self, pattern: &str) -> Result<usize> {
        self.store.write().await.del_pattern(pattern)
    }

    // == Clear ==
    /// Empties the cache and resets statistics.
    pub async fn clear(&self) {
        self.store.write().await.clear();
    }

    // == Introspection ==
    /// Current number of entries. In-flight computations are not counted.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Returns true if the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    /// Snapshot of counters and occupancy.
    pub async fn stats(&self) -> StatsSnapshot {
        self.store.read().await.stats()
    }

    /// Removes all expired entries; returns the number removed.
    pub async fn cleanup_expired(&self) -> usize {
        self.store.write().await.cleanup_expired()
    }

    // == Get Or Compute ==
    /// Returns the cached value for `key`, computing it at most once across
    /// all concurrent callers.
    ///
    /// On a hit the value is returned immediately. On a miss, the first
    /// caller registers the computation and every later caller joins it,
    /// so `compute` runs at most once per key at any moment, including when
    /// two calls are issued in the same scheduling tick. The registration
    /// happens before the computation is first polled.
    ///
    /// The computation runs as a detached task: a caller that drops its
    /// future does not cancel it, and a successful result still lands in
    /// the cache for the next reader. A failure is delivered to every
    /// waiting caller and is never cached, so the next call retries.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, ttl_ms: Option<u64>, compute: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        // Join an existing flight, or register a new one. Registration is
        // atomic with the lookup: a second caller in the same tick lands in
        // the Some branch below.
        let (mut rx, lead_tx) = {
            let mut inflight = self.inflight.lock().expect("in-flight registry poisoned");
            match inflight.get(key) {
                Some(tx) => {
                    debug!(key, "joining in-flight computation");
                    (tx.subscribe(), None)
                }
                None => {
                    let (tx, rx) = broadcast::channel(1);
                    inflight.insert(key.to_string(), tx.clone());
                    (rx, Some(tx))
                }
            }
        };

        if let Some(tx) = lead_tx {
            let future = compute();
            let store = Arc::clone(&self.store);
            let key_owned = key.to_string();
            let guard = FlightGuard {
                key: key_owned.clone(),
                inflight: Arc::clone(&self.inflight),
            };

            tokio::spawn(async move {
                // The guard removes the registry entry on every exit path,
                // so a failed or panicked computation never blocks retries.
                let result = match future.await {
                    Ok(value) => {
                        // Populate the cache before the flight is deregistered
                        store.write().await.set(key_owned.clone(), value.clone(), ttl_ms);
                        Ok(value)
                    }
                    Err(cause) => {
                        debug!(key = %key_owned, "computation failed; result not cached");
                        Err(Error::compute(key_owned.clone(), cause))
                    }
                };

                drop(guard);
                // Waiters may all have gone away; the value is cached regardless
                let _ = tx.send(result);
            });
        }

        match rx.recv().await {
            Ok(result) => result,
            Err(_) => Err(Error::Interrupted(key.to_string())),
        }
    }
}

// == Flight Guard ==
/// Removes an in-flight registry entry when dropped.
struct FlightGuard<V> {
    key: String,
    inflight: Arc<Mutex<FlightMap<V>>>,
}

impl<V> Drop for FlightGuard<V> {
    fn drop(&mut self) {
        if let Ok(mut inflight) = self.inflight.lock() {
            inflight.remove(&self.key);
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache: TtlCache<String> = TtlCache::new(100, 300_000);

        cache.set("key1", "value1".to_string(), None).await;

        assert_eq!(cache.get("key1").await, Some("value1".to_string()));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_or_compute_hit_skips_computation() {
        let cache: TtlCache<String> = TtlCache::new(100, 300_000);
        cache.set("key1", "cached".to_string(), None).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let value = cache
            .get_or_compute("key1", None, move || async move {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                Ok("computed".to_string())
            })
            .await
            .unwrap();

        assert_eq!(value, "cached");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_get_or_compute_miss_populates_cache() {
        let cache: TtlCache<String> = TtlCache::new(100, 300_000);

        let value = cache
            .get_or_compute("key1", None, || async { Ok("computed".to_string()) })
            .await
            .unwrap();

        assert_eq!(value, "computed");
        assert_eq!(cache.get("key1").await, Some("computed".to_string()));
    }

    #[tokio::test]
    async fn test_get_or_compute_single_flight() {
        let cache: TtlCache<String> = TtlCache::new(100, 300_000);
        let calls = Arc::new(AtomicUsize::new(0));

        let make = |cache: TtlCache<String>, calls: Arc<AtomicUsize>| async move {
            cache
                .get_or_compute("key1", None, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok("shared".to_string())
                })
                .await
        };

        let (a, b) = tokio::join!(
            make(cache.clone(), Arc::clone(&calls)),
            make(cache.clone(), Arc::clone(&calls))
        );

        assert_eq!(a.unwrap(), "shared");
        assert_eq!(b.unwrap(), "shared");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_compute_failure_not_cached() {
        let cache: TtlCache<String> = TtlCache::new(100, 300_000);

        let failed = cache
            .get_or_compute("key1", None, || async { Err(anyhow::anyhow!("db down")) })
            .await;
        assert!(matches!(failed, Err(Error::Compute { .. })));

        // A later call runs its own computation and succeeds
        let value = cache
            .get_or_compute("key1", None, || async { Ok("recovered".to_string()) })
            .await
            .unwrap();
        assert_eq!(value, "recovered");
    }

    #[tokio::test]
    async fn test_get_or_compute_failure_shared_by_waiters() {
        let cache: TtlCache<String> = TtlCache::new(100, 300_000);
        let calls = Arc::new(AtomicUsize::new(0));

        let make = |cache: TtlCache<String>, calls: Arc<AtomicUsize>| async move {
            cache
                .get_or_compute("key1", None, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    Err::<String, _>(anyhow::anyhow!("transient"))
                })
                .await
        };

        let (a, b) = tokio::join!(
            make(cache.clone(), Arc::clone(&calls)),
            make(cache.clone(), Arc::clone(&calls))
        );

        assert!(a.is_err());
        assert!(b.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_inflight_not_visible_in_size_or_stats() {
        let cache: TtlCache<String> = TtlCache::new(100, 300_000);

        let pending = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .get_or_compute("slow", None, || async {
                        tokio::time::sleep(Duration::from_millis(60)).await;
                        Ok("done".to_string())
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;

        // The flight is registered but contributes nothing to occupancy;
        // its initial miss is the only trace in the counters.
        assert_eq!(cache.len().await, 0);
        assert_eq!(cache.stats().await.sets, 0);

        pending.await.unwrap().unwrap();
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_abandoned_caller_still_populates_cache() {
        let cache: TtlCache<String> = TtlCache::new(100, 300_000);

        let task = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .get_or_compute("key1", None, || async {
                        tokio::time::sleep(Duration::from_millis(40)).await;
                        Ok("survived".to_string())
                    })
                    .await
            })
        };

        // Abandon the caller while the computation is in flight
        tokio::time::sleep(Duration::from_millis(10)).await;
        task.abort();

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(cache.get("key1").await, Some("survived".to_string()));
    }

    #[tokio::test]
    async fn test_slow_key_does_not_block_other_keys() {
        let cache: TtlCache<String> = TtlCache::new(100, 300_000);

        let slow = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .get_or_compute("slow", None, || async {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok("slow".to_string())
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;

        // Operations on other keys complete while "slow" is pending
        cache.set("fast", "now".to_string(), None).await;
        assert_eq!(cache.get("fast").await, Some("now".to_string()));

        slow.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_del_pattern_through_facade() {
        let cache: TtlCache<String> = TtlCache::new(100, 300_000);

        cache.set("guild:1:eggs", "a".to_string(), None).await;
        cache.set("guild:1:hives", "b".to_string(), None).await;
        cache.set("guild:2:eggs", "c".to_string(), None).await;

        let removed = cache.del_pattern("^guild:1:").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(cache.len().await, 1);
    }
}
