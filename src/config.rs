//! Configuration Module
//!
//! Handles loading and managing configuration from environment variables.

use std::env;

/// Configuration parameters for the cache and the rate limiter registry.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub cache_max_entries: usize,
    /// Default TTL in milliseconds for entries without explicit TTL
    pub cache_default_ttl_ms: u64,
    /// Interval in milliseconds between expired-entry sweeps
    pub cache_sweep_interval_ms: u64,
    /// How long an idle rate limit bucket is retained, in milliseconds
    pub limiter_retention_ms: u64,
    /// Interval in milliseconds between rate limiter cleanup runs
    pub limiter_cleanup_interval_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `CACHE_SWEEP_INTERVAL_MS` - Sweep frequency in milliseconds (default: 30000)
    /// - `LIMITER_RETENTION_MS` - Idle bucket retention in milliseconds (default: 300000)
    /// - `LIMITER_CLEANUP_INTERVAL_MS` - Limiter cleanup frequency in milliseconds (default: 60000)
    pub fn from_env() -> Self {
        Self {
            cache_max_entries: env::var("CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            cache_default_ttl_ms: env::var("CACHE_DEFAULT_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300_000),
            cache_sweep_interval_ms: env::var("CACHE_SWEEP_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30_000),
            limiter_retention_ms: env::var("LIMITER_RETENTION_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300_000),
            limiter_cleanup_interval_ms: env::var("LIMITER_CLEANUP_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60_000),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_max_entries: 1000,
            cache_default_ttl_ms: 300_000,
            cache_sweep_interval_ms: 30_000,
            limiter_retention_ms: 300_000,
            limiter_cleanup_interval_ms: 60_000,
        }
    }
}
