//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// Represents a single cache entry with value and expiry metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry.
    ///
    /// A `ttl_ms` of zero means the entry never expires.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl_ms` - TTL in milliseconds, 0 for no expiry
    pub fn new(value: V, ttl_ms: u64) -> Self {
        let now = current_timestamp_ms();
        let expires_at = (ttl_ms > 0).then(|| now + ttl_ms);

        Self {
            value,
            created_at: now,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is considered expired once the current time reaches the
    /// expiration instant, so a fully elapsed TTL is never observable.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// Returns `Some(0)` once the TTL has fully elapsed.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at.map(|expires| {
            let now = current_timestamp_ms();
            expires.saturating_sub(now)
        })
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
