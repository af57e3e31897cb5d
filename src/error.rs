//! Error types for the cache crate.

use std::fmt;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cache operations.
///
/// All cache operations return `Result<T>` where `Result` is defined as
/// `std::result::Result<T, Error>`. Validation errors (`KeyNull`, `ValueNull`,
/// `FieldNull`, `HashFieldType`, `FieldValueCount`) are detected before the
/// backing store is touched; everything else propagates from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Key or hash field absent (or expired) on a single-item read.
    ///
    /// This is the not-found sentinel: `get`/`hget` return it instead of an
    /// empty string so callers can distinguish "no value" from `""`.
    /// `hget_all` and `get_keys_page` return empty collections instead.
    Nil,

    /// Empty key argument.
    KeyNull,

    /// Null value argument, or a value that marshals to the empty string.
    ValueNull,

    /// Empty hash field argument.
    FieldNull,

    /// Non-string field argument in a variadic `hset` call.
    HashFieldType,

    /// Odd field/value argument count in a variadic `hset` call.
    FieldValueCount,

    /// Value could not be JSON-marshaled for storage.
    Serialization(String),

    /// Backend storage error (Redis connection, protocol, auth, ...).
    ///
    /// No operation is retried internally; retry/backoff policy belongs to
    /// the caller.
    Backend(String),

    /// Invalid configuration during backend construction.
    Config(String),
}

impl Error {
    /// True for the not-found sentinel.
    pub fn is_nil(&self) -> bool {
        matches!(self, Error::Nil)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Nil => write!(f, "cache: nil"),
            Error::KeyNull => write!(f, "key is null"),
            Error::ValueNull => write!(f, "value is null"),
            Error::FieldNull => write!(f, "field is null"),
            Error::HashFieldType => write!(f, "hash set field's type is not string"),
            Error::FieldValueCount => write!(f, "hash set field and value number mismatch"),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Error::Backend(msg) => write!(f, "Backend error: {}", msg),
            Error::Config(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Backend(e.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::Backend(format!("Redis error: {}", e))
    }
}
