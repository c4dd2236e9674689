//! Rate Limiter Module
//!
//! Token bucket rate limiting keyed by identity, with penalty windows,
//! idle-state reclamation, and a registry of named limiter classes.

mod bucket;
mod rate_limiter;
mod registry;

// Re-export public types
pub use bucket::{BucketConfig, TokenBucket};
pub use rate_limiter::{DenyReason, LimitDecision, LimiterStatus, RateLimiter, RateLimiterConfig};
pub use registry::{DenialNotifier, LimiterRegistry, TracingNotifier, GENERAL_CLASS};
