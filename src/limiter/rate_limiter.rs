//! Rate Limiter Module
//!
//! Per-identity token bucket limiting with penalty windows and idle-state
//! reclamation.
//!
//! Every check returns a deterministic verdict; there are no exceptional
//! failure modes. Mutations are always scoped to the single identity being
//! checked, so one misbehaving identity cannot disturb another's state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::limiter::bucket::{BucketConfig, TokenBucket};

// == Deny Reason ==
/// Why a check was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The identity's bucket has too few tokens
    RateLimit,
    /// The identity is under an active penalty
    RateLimitExceeded,
}

// == Limit Decision ==
/// Verdict for a single rate limit check.
#[derive(Debug, Clone, Serialize)]
pub struct LimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Tokens left after deduction, present on allowed checks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<f64>,
    /// Seconds until the caller should retry, present on denied checks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<f64>,
    /// Seconds until the next refill tick, present on allowed checks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_in: Option<f64>,
    /// Denial reason, present on denied checks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenyReason>,
}

impl LimitDecision {
    fn allow(remaining: f64, reset_in: f64) -> Self {
        Self {
            allowed: true,
            remaining: Some(remaining),
            retry_after: None,
            reset_in: Some(reset_in),
            reason: None,
        }
    }

    fn deny_tokens(retry_after: f64) -> Self {
        Self {
            allowed: false,
            remaining: None,
            retry_after: Some(retry_after),
            reset_in: None,
            reason: Some(DenyReason::RateLimit),
        }
    }

    fn deny_penalty(retry_after: f64) -> Self {
        Self {
            allowed: false,
            remaining: None,
            retry_after: Some(retry_after),
            reset_in: None,
            reason: Some(DenyReason::RateLimitExceeded),
        }
    }
}

// == Limiter Status ==
/// Read-only projection of one identity's state.
#[derive(Debug, Clone, Serialize)]
pub struct LimiterStatus {
    /// Effective token count after a refill preview
    pub tokens: f64,
    /// Configured bucket capacity
    pub max_tokens: f64,
    /// Whether a penalty is currently active
    pub penalized: bool,
}

// == Rate Limiter Config ==
/// Configuration for one limiter instance.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    /// Quota shape applied to every identity
    pub bucket: BucketConfig,
    /// How long an idle bucket is retained before reclamation
    pub retention: Duration,
    /// Interval between automatic cleanup runs
    pub cleanup_interval: Duration,
}

impl RateLimiterConfig {
    /// Creates a limiter configuration with retention and cleanup interval
    /// in milliseconds.
    pub fn new(bucket: BucketConfig, retention_ms: u64, cleanup_interval_ms: u64) -> Self {
        Self {
            bucket,
            retention: Duration::from_millis(retention_ms),
            cleanup_interval: Duration::from_millis(cleanup_interval_ms),
        }
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::new(BucketConfig::new(10.0, 5.0, 10_000), 300_000, 60_000)
    }
}

// == Rate Limiter ==
/// Token bucket rate limiter with per-identity penalties.
///
/// Construction spawns a periodic cleanup task, so a limiter must be
/// created from within a Tokio runtime. The task runs until
/// [`destroy`](Self::destroy) is called; a long-lived singleton that is
/// never destroyed intentionally keeps its timer for the life of the
/// process, but ad hoc instances must be destroyed to stop theirs.
pub struct RateLimiter {
    config: RateLimiterConfig,
    buckets: Arc<RwLock<HashMap<String, TokenBucket>>>,
    penalties: Arc<RwLock<HashMap<String, Instant>>>,
    cleanup_task: Mutex<Option<JoinHandle<()>>>,
}

impl RateLimiter {
    // == Constructor ==
    /// Creates a limiter and starts its periodic cleanup task.
    pub fn new(config: RateLimiterConfig) -> Self {
        let buckets = Arc::new(RwLock::new(HashMap::new()));
        let penalties = Arc::new(RwLock::new(HashMap::new()));

        let cleanup_task = Self::spawn_cleanup(
            Arc::clone(&buckets),
            Arc::clone(&penalties),
            config.retention,
            config.cleanup_interval,
        );

        Self {
            config,
            buckets,
            penalties,
            cleanup_task: Mutex::new(Some(cleanup_task)),
        }
    }

    // == Check Limit ==
    /// Checks whether `identity` may spend `cost` tokens.
    ///
    /// An active penalty always wins over token availability. Otherwise
    /// the identity's bucket (created full on first sight) is refilled for
    /// whole elapsed intervals and the cost deducted if covered.
    pub fn check_limit(&self, identity: &str, cost: f64) -> LimitDecision {
        // Penalty gate; expired penalties are cleared on the way through
        {
            let mut penalties = self.penalties.write().expect("penalty table poisoned");
            if let Some(&until) = penalties.get(identity) {
                let now = Instant::now();
                if until > now {
                    return LimitDecision::deny_penalty((until - now).as_secs_f64());
                }
                penalties.remove(identity);
            }
        }

        let mut buckets = self.buckets.write().expect("bucket table poisoned");
        let bucket = buckets
            .entry(identity.to_string())
            .or_insert_with(|| TokenBucket::new(&self.config.bucket));

        if bucket.try_consume(&self.config.bucket, cost) {
            LimitDecision::allow(
                bucket.tokens(),
                bucket.seconds_until_refill(&self.config.bucket),
            )
        } else {
            debug!(identity, cost, "rate limit check denied");
            LimitDecision::deny_tokens(bucket.seconds_until_refill(&self.config.bucket))
        }
    }

    // == Penalize ==
    /// Puts `identity` under a penalty for `duration_ms`, replacing any
    /// existing penalty. Token state is left untouched.
    pub fn penalize(&self, identity: &str, duration_ms: u64) {
        let until = Instant::now() + Duration::from_millis(duration_ms);
        self.penalties
            .write()
            .expect("penalty table poisoned")
            .insert(identity.to_string(), until);
        info!(identity, duration_ms, "penalty applied");
    }

    // == Reset ==
    /// Clears both bucket and penalty for an identity.
    pub fn reset(&self, identity: &str) {
        self.buckets
            .write()
            .expect("bucket table poisoned")
            .remove(identity);
        self.penalties
            .write()
            .expect("penalty table poisoned")
            .remove(identity);
    }

    // == Status ==
    /// Read-only view of an identity's effective state. Applies the same
    /// refill computation as [`check_limit`](Self::check_limit) without
    /// mutating anything.
    pub fn status(&self, identity: &str) -> LimiterStatus {
        let tokens = self
            .buckets
            .read()
            .expect("bucket table poisoned")
            .get(identity)
            .map(|bucket| bucket.available(&self.config.bucket))
            .unwrap_or(self.config.bucket.max_tokens);

        let penalized = self
            .penalties
            .read()
            .expect("penalty table poisoned")
            .get(identity)
            .map(|&until| until > Instant::now())
            .unwrap_or(false);

        LimiterStatus {
            tokens,
            max_tokens: self.config.bucket.max_tokens,
            penalized,
        }
    }

    // == Cleanup ==
    /// Removes buckets idle past the retention window and expired
    /// penalties. Returns (buckets removed, penalties removed).
    pub fn cleanup(&self) -> (usize, usize) {
        Self::sweep(&self.buckets, &self.penalties, self.config.retention)
    }

    // == Destroy ==
    /// Stops the periodic cleanup task. Safe to call more than once.
    pub fn destroy(&self) {
        if let Some(handle) = self
            .cleanup_task
            .lock()
            .expect("cleanup handle poisoned")
            .take()
        {
            handle.abort();
            debug!("rate limiter cleanup task stopped");
        }
    }

    fn sweep(
        buckets: &RwLock<HashMap<String, TokenBucket>>,
        penalties: &RwLock<HashMap<String, Instant>>,
        retention: Duration,
    ) -> (usize, usize) {
        let removed_buckets = {
            let mut buckets = buckets.write().expect("bucket table poisoned");
            let before = buckets.len();
            buckets.retain(|_, bucket| bucket.idle_for() < retention);
            before - buckets.len()
        };

        let removed_penalties = {
            let now = Instant::now();
            let mut penalties = penalties.write().expect("penalty table poisoned");
            let before = penalties.len();
            penalties.retain(|_, until| *until > now);
            before - penalties.len()
        };

        (removed_buckets, removed_penalties)
    }

    fn spawn_cleanup(
        buckets: Arc<RwLock<HashMap<String, TokenBucket>>>,
        penalties: Arc<RwLock<HashMap<String, Instant>>>,
        retention: Duration,
        interval: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;

                let (removed_buckets, removed_penalties) =
                    Self::sweep(&buckets, &penalties, retention);

                if removed_buckets > 0 || removed_penalties > 0 {
                    debug!(
                        removed_buckets,
                        removed_penalties, "rate limiter cleanup pass"
                    );
                }
            }
        })
    }
}
