//! Limiter Registry Module
//!
//! Fixed set of named limiter classes, one per cost class of operation,
//! plus the check-and-respond helper command handlers call before doing
//! costly work.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::Config;
use crate::limiter::bucket::BucketConfig;
use crate::limiter::rate_limiter::{LimitDecision, RateLimiter, RateLimiterConfig};

/// Class used when a caller names a class the registry does not know.
pub const GENERAL_CLASS: &str = "light";

/// Quota table: class name, capacity, refill rate, refill interval (ms).
///
/// Cheap and frequent operations get the light class; expensive renders
/// the heavy class; anything moving user balances the transactional
/// class; administrative commands the privileged class.
const CLASS_QUOTAS: &[(&str, f64, f64, u64)] = &[
    ("light", 10.0, 5.0, 10_000),
    ("heavy", 3.0, 1.0, 30_000),
    ("transactional", 5.0, 1.0, 5_000),
    ("privileged", 30.0, 10.0, 10_000),
];

// == Denial Notifier ==
/// Outbound seam for user-facing denial responses.
///
/// The registry does not own a messaging channel; the process that does
/// implements this trait (for a chat bot, a reply to the interaction).
pub trait DenialNotifier: Send + Sync {
    /// Called exactly once per denied check.
    fn notify_denied(&self, identity: &str, decision: &LimitDecision);
}

/// Notifier that only logs. Useful as a default and in tests.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl DenialNotifier for TracingNotifier {
    fn notify_denied(&self, identity: &str, decision: &LimitDecision) {
        warn!(
            identity,
            reason = ?decision.reason,
            retry_after = ?decision.retry_after,
            "request denied by rate limiter"
        );
    }
}

// == Limiter Registry ==
/// Named limiter instances with distinct quotas.
///
/// The set of classes is fixed at construction. Looking up an unknown
/// class falls back to the general class rather than failing, keeping
/// callers simple.
pub struct LimiterRegistry {
    classes: HashMap<String, RateLimiter>,
}

impl LimiterRegistry {
    // == Constructor ==
    /// Creates the registry with default retention and cleanup settings.
    ///
    /// Must be called from within a Tokio runtime; every class starts its
    /// own cleanup task.
    pub fn new() -> Self {
        Self::from_config(&Config::default())
    }

    /// Creates the registry using retention and cleanup intervals from
    /// `config`.
    pub fn from_config(config: &Config) -> Self {
        let classes = CLASS_QUOTAS
            .iter()
            .map(|&(name, max_tokens, refill_rate, interval_ms)| {
                let limiter = RateLimiter::new(RateLimiterConfig::new(
                    BucketConfig::new(max_tokens, refill_rate, interval_ms),
                    config.limiter_retention_ms,
                    config.limiter_cleanup_interval_ms,
                ));
                (name.to_string(), limiter)
            })
            .collect();

        debug!(classes = CLASS_QUOTAS.len(), "limiter registry initialized");
        Self { classes }
    }

    // == Get ==
    /// Returns the limiter for `class`, falling back to the general class
    /// for unrecognized names.
    pub fn get(&self, class: &str) -> &RateLimiter {
        self.classes.get(class).unwrap_or_else(|| {
            self.classes
                .get(GENERAL_CLASS)
                .expect("registry always contains the general class")
        })
    }

    /// Names of all registered classes.
    pub fn class_names(&self) -> Vec<&str> {
        self.classes.keys().map(String::as_str).collect()
    }

    // == Check And Notify ==
    /// Checks `identity` against the named class; on denial, informs the
    /// notifier and returns false. Callers must stop processing when this
    /// returns false.
    pub fn check_and_notify(
        &self,
        identity: &str,
        class: &str,
        notifier: &dyn DenialNotifier,
    ) -> bool {
        let decision = self.get(class).check_limit(identity, 1.0);

        if !decision.allowed {
            notifier.notify_denied(identity, &decision);
        }

        decision.allowed
    }

    // == Destroy All ==
    /// Stops every class's cleanup task.
    pub fn destroy_all(&self) {
        for limiter in self.classes.values() {
            limiter.destroy();
        }
    }
}
