//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU ordering and TTL
//! expiration. The store is synchronous and exclusively owned; concurrent
//! access goes through [`TtlCache`](super::TtlCache).

use std::collections::HashMap;

use regex::Regex;

use crate::cache::{CacheEntry, CacheStats, LruOrder, StatsSnapshot};
use crate::error::Result;

// == Cache Store ==
/// Bounded key/value store with LRU eviction and per-entry TTL.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Insertion/touch order tracker
    lru: LruOrder,
    /// Performance counters
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// Default TTL in milliseconds for entries without explicit TTL
    default_ttl_ms: u64,
}

impl<V: Clone> CacheStore<V> {
    // == Constructor ==
    /// Creates a new CacheStore with specified capacity and default TTL.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries the cache can hold
    /// * `default_ttl_ms` - Default TTL in milliseconds, 0 disables expiry by default
    pub fn new(max_entries: usize, default_ttl_ms: u64) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruOrder::new(),
            stats: CacheStats::new(),
            max_entries,
            default_ttl_ms,
        }
    }

    // == Set ==
    /// Stores a key-value pair.
    ///
    /// If the key already exists, the value is overwritten and its TTL is
    /// reset. If the cache is at capacity and the key is new, the oldest
    /// entry is evicted first. After insertion the key is the most
    /// recently used.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl_ms` - TTL in milliseconds; `None` uses the default, `Some(0)` means no expiry
    pub fn set(&mut self, key: String, value: V, ttl_ms: Option<u64>) {
        let is_overwrite = self.entries.contains_key(&key);

        // If not overwriting and at capacity, evict the oldest entry
        if !is_overwrite && self.entries.len() >= self.max_entries {
            if let Some(evicted_key) = self.lru.pop_oldest() {
                self.entries.remove(&evicted_key);
                self.stats.record_eviction();
                tracing::debug!(key = %evicted_key, "evicted oldest entry at capacity");
            }
        }

        let effective_ttl = ttl_ms.unwrap_or(self.default_ttl_ms);
        let entry = CacheEntry::new(value, effective_ttl);
        self.entries.insert(key.clone(), entry);

        // Touch moves the key to the most-recently-used end
        self.lru.touch(&key);
        self.stats.record_set();
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns the value if present and unexpired, counting a hit and
    /// re-positioning the key as most recently used. An expired entry is
    /// removed on the spot and counted as a miss.
    pub fn get(&mut self, key: &str) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired() {
                self.entries.remove(key);
                self.lru.remove(key);
                self.stats.record_miss();
                return None;
            }

            let value = entry.value.clone();
            self.stats.record_hit();
            self.lru.touch(key);
            Some(value)
        } else {
            self.stats.record_miss();
            None
        }
    }

    // == Has ==
    /// Checks whether a `get` for this key would hit.
    ///
    /// Defined in terms of [`get`](Self::get), so it shares the same
    /// hit/miss accounting and lazy expiry behavior.
    pub fn has(&mut self, key: &str) -> bool {
        self.get(key).is_some()
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether an entry existed.
    pub fn del(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.lru.remove(key);
            true
        } else {
            false
        }
    }

    // == Delete By Pattern ==
    /// Deletes every live key matching `pattern`, treated as a regular
    /// expression. Returns the number of entries removed.
    ///
    /// Used to invalidate a family of related keys, for example every key
    /// belonging to one guild after a write.
    pub fn del_pattern(&mut self, pattern: &str) -> Result<usize> {
        let re = Regex::new(pattern)?;

        let matched: Vec<String> = self
            .entries
            .keys()
            .filter(|key| re.is_match(key))
            .cloned()
            .collect();

        for key in &matched {
            self.entries.remove(key);
            self.lru.remove(key);
        }

        Ok(matched.len())
    }

    // == Clear ==
    /// Empties the store and resets all counters to zero.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.stats = CacheStats::new();
    }

    // == Stats ==
    /// Returns a snapshot of current counters and occupancy.
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot::new(&self.stats, self.entries.len(), self.max_entries)
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed. Together with the lazy check
    /// in [`get`](Self::get) this is the sole expiry mechanism; there is no
    /// per-entry timer.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.entries.remove(key);
            self.lru.remove(key);
        }

        expired_keys.len()
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
