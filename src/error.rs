//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache commands.
///
/// TTL expiry is never reported through this type: an expired entry is a
/// plain miss, surfaced as [`CacheError::KeyNotExist`] by commands that
/// require a live entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The command requires an existing live entry and none is present
    #[error("key not exist")]
    KeyNotExist,

    /// The stored value's variant does not match what the command requires.
    /// Carries the expected category, e.g. "a list" or "int64".
    #[error("value is not {0}")]
    TypeMismatch(&'static str),

    /// The caller's deadline had already passed at command entry
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The caller canceled before the command started
    #[error("operation canceled")]
    Canceled,
}

// == Result Type Alias ==
/// Convenience Result type for cache commands.
pub type Result<T> = std::result::Result<T, CacheError>;
