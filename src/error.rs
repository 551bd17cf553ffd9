//! Error types for the caching layer
//!
//! Provides unified error handling using thiserror.
//!
//! Propagation policy: read-path failures (decode, backend lookup) degrade to
//! a cache miss inside [`crate::service::CacheService`]; write- and
//! invalidation-path failures are returned to the caller, since silently
//! losing a write or an invalidation would leave stale data behind.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the caching layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key is empty or otherwise unusable
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Value or option rejected before any I/O
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Removal pattern failed to parse
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Value could not be serialized or compressed
    #[error("Encode failed: {0}")]
    Encode(String),

    /// Stored bytes could not be decoded into the requested type
    #[error("Decode failed for key '{key}': {reason}")]
    Decode { key: String, reason: String },

    /// The underlying store failed during a mutation
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// User-supplied factory in get_or_create failed; propagated unchanged
    #[error("Factory error: {0}")]
    Factory(anyhow::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the caching layer.
pub type Result<T> = std::result::Result<T, CacheError>;
