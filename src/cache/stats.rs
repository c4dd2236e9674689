//! Cache Statistics Module
//!
//! Tracks cache performance counters across the process lifetime.

use serde::Serialize;

// == Cache Stats ==
/// Process-lifetime cache counters. Reset only by an explicit clear.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of insertions and overwrites
    pub sets: u64,
    /// Number of entries evicted due to capacity pressure
    pub evictions: u64,
}

impl CacheStats {
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Increments the set counter.
    pub fn record_set(&mut self) {
        self.sets += 1;
    }

    /// Increments the eviction counter.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Formats the hit rate as a percentage string.
    ///
    /// Returns `"0%"` when no reads have occurred, otherwise a value with
    /// two decimals such as `"50.00%"`.
    pub fn hit_rate_display(&self) -> String {
        if self.hits + self.misses == 0 {
            "0%".to_string()
        } else {
            format!("{:.2}%", self.hit_rate() * 100.0)
        }
    }
}

// == Stats Snapshot ==
/// Point-in-time view of cache counters plus current occupancy.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of insertions and overwrites
    pub sets: u64,
    /// Number of capacity evictions
    pub evictions: u64,
    /// Hit rate formatted as a percentage, "0%" with no reads
    pub hit_rate: String,
    /// Current number of entries
    pub size: usize,
    /// Configured entry capacity
    pub max_size: usize,
}

impl StatsSnapshot {
    /// Builds a snapshot from live counters and occupancy.
    pub fn new(stats: &CacheStats, size: usize, max_size: usize) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            sets: stats.sets,
            evictions: stats.evictions,
            hit_rate: stats.hit_rate_display(),
            size,
            max_size,
        }
    }
}
