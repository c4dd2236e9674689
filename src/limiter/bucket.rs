//! Token Bucket Module
//!
//! Refill math for per-identity rate limiting.

use std::time::{Duration, Instant};

// == Bucket Config ==
/// Quota shape for one limiter: capacity and refill schedule.
#[derive(Debug, Clone, Copy)]
pub struct BucketConfig {
    /// Maximum tokens a bucket can hold
    pub max_tokens: f64,
    /// Tokens credited per elapsed refill interval
    pub refill_rate: f64,
    /// Length of one refill interval
    pub refill_interval: Duration,
}

impl BucketConfig {
    /// Creates a quota from capacity, per-interval rate, and interval length
    /// in milliseconds.
    pub fn new(max_tokens: f64, refill_rate: f64, refill_interval_ms: u64) -> Self {
        Self {
            max_tokens,
            refill_rate,
            refill_interval: Duration::from_millis(refill_interval_ms),
        }
    }
}

// == Token Bucket ==
/// Token state for a single identity.
///
/// Tokens are credited only for whole elapsed refill intervals; a partial
/// interval is carried forward untouched, so `last_refill` always sits on
/// an interval boundary.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    /// Current token count, always within [0, max_tokens]
    tokens: f64,
    /// Start of the current refill interval
    last_refill: Instant,
    /// Last time this bucket served a check, for idle reclamation
    last_activity: Instant,
}

impl TokenBucket {
    // == Constructor ==
    /// Creates a full bucket.
    pub fn new(config: &BucketConfig) -> Self {
        let now = Instant::now();
        Self {
            tokens: config.max_tokens,
            last_refill: now,
            last_activity: now,
        }
    }

    // == Refill ==
    /// Credits tokens for every whole interval elapsed since `last_refill`,
    /// capped at capacity.
    pub fn refill(&mut self, config: &BucketConfig) {
        let periods = self.elapsed_periods(config);
        if periods >= 1 {
            self.tokens =
                (self.tokens + periods as f64 * config.refill_rate).min(config.max_tokens);
            self.last_refill += config.refill_interval * periods;
        }
    }

    // == Try Consume ==
    /// Refills, then deducts `cost` tokens if available.
    ///
    /// Returns whether the deduction happened. Always marks the bucket as
    /// recently active.
    pub fn try_consume(&mut self, config: &BucketConfig, cost: f64) -> bool {
        self.refill(config);
        self.last_activity = Instant::now();

        if self.tokens >= cost {
            self.tokens -= cost;
            true
        } else {
            false
        }
    }

    // == Available ==
    /// Token count as it would stand after a refill, without mutating.
    pub fn available(&self, config: &BucketConfig) -> f64 {
        let periods = self.elapsed_periods(config);
        (self.tokens + periods as f64 * config.refill_rate).min(config.max_tokens)
    }

    /// Current token count without applying any refill.
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    // == Refill Timing ==
    /// Seconds until the next refill interval boundary.
    pub fn seconds_until_refill(&self, config: &BucketConfig) -> f64 {
        let interval = config.refill_interval.as_nanos();
        if interval == 0 {
            return 0.0;
        }
        let elapsed = self.last_refill.elapsed().as_nanos();
        let remaining = interval - (elapsed % interval);
        remaining as f64 / 1e9
    }

    // == Idle Time ==
    /// Time since this bucket last served a check.
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Whole refill intervals elapsed since `last_refill`.
    fn elapsed_periods(&self, config: &BucketConfig) -> u32 {
        let interval = config.refill_interval.as_nanos();
        if interval == 0 {
            return 0;
        }
        let elapsed = self.last_refill.elapsed().as_nanos();
        (elapsed / interval).min(u32::MAX as u128) as u32
    }
}
