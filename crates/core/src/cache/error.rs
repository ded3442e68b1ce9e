//! Error type shared by every cache tier.
//!
//! Tier faults are deliberately separate from [`strata_domain::StrataError`]:
//! a cache failure is never fatal to a read path, so callers absorb these at
//! the boundary (log, then treat the lookup as a miss) instead of bubbling
//! them into domain results.

use thiserror::Error;

/// Faults a cache tier can report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The backing store is unreachable or not configured.
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// A value could not be serialized into or out of the tier.
    #[error("Cache serialization error: {0}")]
    Serialization(String),

    /// The tier cannot honor the requested key pattern.
    #[error("Unsupported key pattern: {0}")]
    PatternUnsupported(String),

    /// The operation did not complete within the configured deadline.
    #[error("Cache operation timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The tier was constructed from invalid settings.
    #[error("Cache configuration error: {0}")]
    Config(String),
}

impl CacheError {
    /// Returns true when the fault means the backend cannot serve requests
    /// at all, as opposed to rejecting this one operation.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, CacheError::Unavailable(_) | CacheError::Timeout { .. })
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

/// Result alias for tier operations.
pub type CacheResult<T> = Result<T, CacheError>;
