//! Error types for the cache and rate limiter
//!
//! Provides unified error handling using thiserror.
//!
//! The cache itself cannot fail on ordinary reads and writes; errors arise
//! only from caller-supplied computations and from invalid invalidation
//! patterns. The error type is cheap to clone so a single computation
//! failure can be delivered to every caller awaiting the same key.

use std::sync::Arc;

use thiserror::Error;

// == Error Enum ==
/// Unified error type for the crate.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A caller-supplied computation failed. The failure is shared by
    /// every caller awaiting the same key and is never cached.
    #[error("computation for key '{key}' failed: {cause}")]
    Compute {
        /// The cache key the computation was filling
        key: String,
        /// The underlying application error
        cause: Arc<anyhow::Error>,
    },

    /// The computation task stopped before producing a result.
    #[error("computation for key '{0}' stopped before completing")]
    Interrupted(String),

    /// An invalidation pattern failed to compile as a regular expression.
    #[error("invalid key pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl Error {
    /// Wraps an application error raised while computing a value for `key`.
    pub fn compute(key: impl Into<String>, cause: anyhow::Error) -> Self {
        Self::Compute {
            key: key.into(),
            cause: Arc::new(cause),
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the crate.
pub type Result<T> = std::result::Result<T, Error>;
