//! Cache backend implementations.

use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

pub mod inmemory;
#[cfg(feature = "redis")]
pub mod redis;

pub use inmemory::InMemoryBackend;
#[cfg(feature = "redis")]
pub use redis::RedisBackend;

/// The cache contract, uniform across backends.
///
/// Keys are arbitrary non-empty strings; payloads are strings (a string
/// value is stored verbatim, anything else is JSON-marshaled, see
/// [`crate::payload`]). Hash fields are strings, namespaced per outer key.
///
/// **IMPORTANT:** All methods use `&self` to allow concurrent access.
/// Implementations use interior mutability (DashMap, connection pool).
///
/// Every method is a direct synchronous call into the backing store: no
/// internal retries, no per-call deadline. Single-item reads (`get`,
/// `hget`) fail with [`Error::Nil`] when nothing is there; collection reads
/// (`hget_all`, `get_keys_page`) return empty collections instead.
#[allow(async_fn_in_trait)]
pub trait CacheBackend: Send + Sync + Clone {
    /// Store a value under `key`.
    ///
    /// `ttl` of `None` means the backend default: 24h for the in-memory
    /// backend, no expiration for Redis.
    ///
    /// # Errors
    /// `KeyNull` for an empty key, `ValueNull` for a null value.
    async fn set(&self, key: &str, value: &Value, ttl: Option<Duration>) -> Result<()>;

    /// Retrieve the stored string for `key`.
    ///
    /// # Errors
    /// `Err(Nil)` when the key is absent or expired, never a silent `""`.
    async fn get(&self, key: &str) -> Result<String>;

    /// Remove keys. Removing an absent key is not an error.
    async fn del(&self, keys: &[&str]) -> Result<()>;

    /// Set hash fields from a variadic field/value list.
    ///
    /// Arguments alternate field, value. A lone object argument is the
    /// `hmset` shorthand with the backend default TTL. An empty argument
    /// list (or empty object) is a no-op on both backends.
    ///
    /// # Errors
    /// `HashFieldType` for a non-string field, `FieldValueCount` for an odd
    /// argument count, `FieldNull`/`ValueNull` for empty field/value, all
    /// detected before the store is touched.
    async fn hset(&self, key: &str, args: &[Value]) -> Result<()>;

    /// Bulk hash-field set from a mapping.
    ///
    /// TTL semantics differ by backend: the in-memory backend applies the
    /// TTL to each field, Redis applies one `EXPIRE` to the whole hash key.
    /// An empty map is a no-op on both backends.
    async fn hmset(
        &self,
        key: &str,
        map: &serde_json::Map<String, Value>,
        ttl: Option<Duration>,
    ) -> Result<()>;

    /// Retrieve one hash field.
    ///
    /// # Errors
    /// `KeyNull` for an empty key, `Err(Nil)` when the key or the field
    /// does not exist.
    async fn hget(&self, key: &str, field: &str) -> Result<String>;

    /// Remove hash fields. No-op when the key or fields are absent.
    ///
    /// # Errors
    /// `KeyNull` for an empty key.
    async fn hdel(&self, key: &str, fields: &[&str]) -> Result<()>;

    /// Retrieve all fields of a hash key.
    ///
    /// Returns an empty map (not an error) when the key does not exist.
    ///
    /// # Errors
    /// `KeyNull` for an empty key.
    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Count of present keys (1 when `key` exists).
    ///
    /// # Errors
    /// `Err(Nil)` when the key is absent, on both backends.
    async fn exists(&self, key: &str) -> Result<i64>;

    /// Reset the TTL of an existing key.
    ///
    /// # Errors
    /// `Err(Nil)` when the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Count keys matching a glob pattern (`*`, `?`) without materializing
    /// the full key list.
    ///
    /// # Errors
    /// `KeyNull` for an empty pattern.
    async fn count_keys_by_pattern(&self, pattern: &str) -> Result<i64>;

    /// One page of keys matching a glob pattern, plus the total match count.
    ///
    /// `page` is 1-indexed; the window start is clamped at zero, so
    /// `page <= 1` yields the first page. A page beyond the last returns
    /// `(vec![], total)`, not an error. Key order is unspecified and
    /// pagination over a mutating keyspace is not stable across calls.
    async fn get_keys_page(
        &self,
        pattern: &str,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<String>, i64)>;

    /// Release backend resources. Idempotent.
    async fn close(&self) -> Result<()>;
}

/// Reject empty keys before touching the store.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::KeyNull);
    }
    Ok(())
}

/// Reject empty patterns before scanning.
pub(crate) fn validate_pattern(pattern: &str) -> Result<()> {
    if pattern.is_empty() {
        return Err(Error::KeyNull);
    }
    Ok(())
}

/// Clamp a 1-indexed page window to `[0, total]`.
///
/// `page < 1` is not validated; the signed start index is clamped at zero,
/// so page 0 and page 1 both produce the first page.
pub(crate) fn page_window(page: i64, page_size: i64, total: usize) -> (usize, usize) {
    let start = page
        .saturating_sub(1)
        .saturating_mul(page_size)
        .max(0) as usize;
    let end = start.saturating_add(page_size.max(0) as usize).min(total);
    (start.min(total), end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert_eq!(validate_key(""), Err(Error::KeyNull));
        assert!(validate_key("k").is_ok());
    }

    #[test]
    fn test_page_window_first_page() {
        assert_eq!(page_window(1, 10, 25), (0, 10));
    }

    #[test]
    fn test_page_window_last_partial_page() {
        assert_eq!(page_window(3, 10, 25), (20, 25));
    }

    #[test]
    fn test_page_window_out_of_range() {
        let (start, end) = page_window(4, 10, 25);
        assert_eq!(start, end);
    }

    #[test]
    fn test_page_window_clamps_below_one() {
        assert_eq!(page_window(0, 10, 25), page_window(1, 10, 25));
        assert_eq!(page_window(-3, 10, 25), (0, 10));
    }

    #[test]
    fn test_page_window_extreme_arguments() {
        let (start, end) = page_window(i64::MAX, i64::MAX, 25);
        assert_eq!(start, end);

        assert_eq!(page_window(i64::MIN, 10, 25), (0, 10));
        assert_eq!(page_window(2, i64::MIN, 25), (0, 0));
    }
}
