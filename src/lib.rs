//! hivekit - In-memory caching and rate limiting for chat bot workloads
//!
//! Two independent components shared by many concurrent interaction
//! handlers: a bounded TTL/LRU cache that deduplicates expensive
//! recomputation per key, and a per-identity token bucket rate limiter
//! with named quota classes.

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod limiter;
pub mod tasks;

pub use cache::TtlCache;
pub use config::Config;
pub use context::ServiceContext;
pub use error::{Error, Result};
pub use limiter::{DenialNotifier, LimiterRegistry, RateLimiter, TracingNotifier};
pub use tasks::spawn_cache_sweep;
