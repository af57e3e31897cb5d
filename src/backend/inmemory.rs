//! In-memory cache backend (default, thread-safe, async).
//!
//! Uses DashMap for lock-free concurrent access with per-key sharding.
//! Expiration is lazy: expired entries are treated as absent and removed
//! on access, not on a realtime schedule.
//!
//! A key holds either a plain string payload or a hash of fields, never
//! both; writing one kind over the other replaces the slot wholesale.
//! Hash fields live in a nested map of their own, with inner keys prefixed
//! `outerkey:field` to keep them distinguishable if ever flattened.

use super::{page_window, validate_key, validate_pattern, CacheBackend};
use crate::error::{Error, Result};
use crate::pattern;
use crate::payload::{self, HsetArgs};
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// TTL applied when the caller passes `None`.
const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// One stored payload with its expiration deadline.
struct Entry {
    payload: String,
    expires_at: Instant,
}

impl Entry {
    fn new(payload: String, ttl: Duration) -> Self {
        Entry {
            payload,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// A key slot: plain value or nested hash.
enum Slot {
    Value(Entry),
    Hash {
        fields: Arc<DashMap<String, Entry>>,
        expires_at: Instant,
    },
}

impl Slot {
    fn is_expired(&self) -> bool {
        let expires_at = match self {
            Slot::Value(entry) => entry.expires_at,
            Slot::Hash { expires_at, .. } => *expires_at,
        };
        Instant::now() > expires_at
    }
}

fn effective_ttl(ttl: Option<Duration>) -> Duration {
    ttl.filter(|d| !d.is_zero()).unwrap_or(DEFAULT_TTL)
}

/// Thread-safe async in-memory cache backend.
///
/// Implements the full cache contract without any network dependency,
/// including glob-pattern key enumeration and pagination.
///
/// # Example
///
/// ```no_run
/// use duocache::backend::{CacheBackend, InMemoryBackend};
/// use serde_json::json;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let backend = InMemoryBackend::new();
///
///     backend.set("user:1", &json!({"id": 1}), Some(Duration::from_secs(3600))).await?;
///     let value = backend.get("user:1").await?;
///     assert_eq!(value, "{\"id\":1}");
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct InMemoryBackend {
    store: Arc<DashMap<String, Slot>>,
}

impl InMemoryBackend {
    /// Create a new in-memory cache backend.
    pub fn new() -> Self {
        InMemoryBackend {
            store: Arc::new(DashMap::new()),
        }
    }

    /// Current number of key slots, expired ones included.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Clone out the field map and deadline of a live hash slot.
    ///
    /// Returns `None` when the key is absent, expired, or holds a plain
    /// value. Expired slots are removed on the way.
    fn hash_slot(&self, key: &str) -> Option<(Arc<DashMap<String, Entry>>, Instant)> {
        let mut stale = false;
        if let Some(slot) = self.store.get(key) {
            if slot.is_expired() {
                stale = true;
            } else if let Slot::Hash { fields, expires_at } = &*slot {
                return Some((Arc::clone(fields), *expires_at));
            } else {
                return None;
            }
        }
        if stale {
            self.store.remove(key);
        }
        None
    }

    /// Clone out the field map of a live hash slot.
    fn hash_fields(&self, key: &str) -> Option<Arc<DashMap<String, Entry>>> {
        self.hash_slot(key).map(|(fields, _)| fields)
    }

    /// Write field/value pairs into the hash under `key`, each with `ttl`,
    /// and refresh the outer slot.
    ///
    /// The outer slot must outlive every field it holds: its deadline is
    /// the latest of the refreshed default, the field deadline being
    /// written, and whatever deadline the slot already had (so a prior
    /// `expire` extension survives later writes).
    ///
    /// Concurrent first writes to the same key may build separate field
    /// maps and the last outer insert wins; individual map operations are
    /// the only atomic unit here.
    fn insert_fields(&self, key: &str, pairs: &[(String, String)], ttl: Duration) {
        let (fields, existing_deadline) = match self.hash_slot(key) {
            Some((fields, deadline)) => (fields, Some(deadline)),
            None => (Arc::new(DashMap::new()), None),
        };

        let now = Instant::now();
        let field_deadline = now + ttl;
        for (field, value) in pairs {
            fields.insert(
                format!("{}:{}", key, field),
                Entry {
                    payload: value.clone(),
                    expires_at: field_deadline,
                },
            );
        }

        let mut slot_deadline = (now + DEFAULT_TTL).max(field_deadline);
        if let Some(deadline) = existing_deadline {
            slot_deadline = slot_deadline.max(deadline);
        }

        self.store.insert(
            key.to_string(),
            Slot::Hash {
                fields,
                expires_at: slot_deadline,
            },
        );
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for InMemoryBackend {
    async fn set(&self, key: &str, value: &Value, ttl: Option<Duration>) -> Result<()> {
        validate_key(key)?;
        let payload = payload::marshal(value)?;
        if payload.is_empty() {
            return Err(Error::ValueNull);
        }

        let ttl = effective_ttl(ttl);
        self.store
            .insert(key.to_string(), Slot::Value(Entry::new(payload, ttl)));

        debug!("✓ InMemory SET {} (TTL: {:?})", key, ttl);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<String> {
        if let Some(slot) = self.store.get(key) {
            match &*slot {
                Slot::Value(entry) if !entry.is_expired() => {
                    debug!("✓ InMemory GET {} -> HIT", key);
                    return Ok(entry.payload.clone());
                }
                // Live hash slot: the key exists but holds no plain payload.
                Slot::Hash { .. } if !slot.is_expired() => return Err(Error::Nil),
                _ => {}
            }
        }

        // Remove the expired slot if there was one.
        self.store.remove(key);
        debug!("✓ InMemory GET {} -> MISS", key);
        Err(Error::Nil)
    }

    async fn del(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.store.remove(*key);
        }
        debug!("✓ InMemory DEL {} keys", keys.len());
        Ok(())
    }

    async fn hset(&self, key: &str, args: &[Value]) -> Result<()> {
        validate_key(key)?;
        match payload::parse_hset_args(args)? {
            HsetArgs::Map(map) => self.hmset(key, &map, None).await,
            HsetArgs::Pairs(pairs) => {
                if pairs.is_empty() {
                    return Ok(());
                }
                self.insert_fields(key, &pairs, DEFAULT_TTL);
                debug!("✓ InMemory HSET {} ({} fields)", key, pairs.len());
                Ok(())
            }
        }
    }

    async fn hmset(
        &self,
        key: &str,
        map: &serde_json::Map<String, Value>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        validate_key(key)?;
        let pairs = payload::pairs_from_map(map)?;
        if pairs.is_empty() {
            return Ok(());
        }

        // In-memory hmset applies the TTL per field; the Redis backend
        // expires the whole hash key instead.
        let ttl = effective_ttl(ttl);
        self.insert_fields(key, &pairs, ttl);
        debug!(
            "✓ InMemory HMSET {} ({} fields, TTL: {:?})",
            key,
            pairs.len(),
            ttl
        );
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<String> {
        validate_key(key)?;
        let Some(fields) = self.hash_fields(key) else {
            return Err(Error::Nil);
        };

        let inner_key = format!("{}:{}", key, field);
        let result = match fields.get(&inner_key) {
            Some(entry) if !entry.is_expired() => Ok(entry.payload.clone()),
            _ => Err(Error::Nil),
        };
        result
    }

    async fn hdel(&self, key: &str, fields: &[&str]) -> Result<()> {
        validate_key(key)?;
        let Some(map) = self.hash_fields(key) else {
            return Ok(());
        };

        for field in fields {
            map.remove(&format!("{}:{}", key, field));
        }
        debug!("✓ InMemory HDEL {} ({} fields)", key, fields.len());
        Ok(())
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>> {
        validate_key(key)?;
        let mut result = HashMap::new();
        let Some(fields) = self.hash_fields(key) else {
            return Ok(result);
        };

        let prefix = format!("{}:", key);
        for entry in fields.iter() {
            if entry.value().is_expired() {
                continue;
            }
            let field = entry
                .key()
                .strip_prefix(&prefix)
                .unwrap_or_else(|| entry.key().as_str());
            result.insert(field.to_string(), entry.value().payload.clone());
        }
        Ok(result)
    }

    async fn exists(&self, key: &str) -> Result<i64> {
        if let Some(slot) = self.store.get(key) {
            if !slot.is_expired() {
                return Ok(1);
            }
        }
        self.store.remove(key);
        Err(Error::Nil)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        if let Some(mut slot) = self.store.get_mut(key) {
            if !slot.is_expired() {
                let deadline = Instant::now() + ttl;
                match slot.value_mut() {
                    Slot::Value(entry) => entry.expires_at = deadline,
                    Slot::Hash { expires_at, .. } => *expires_at = deadline,
                }
                debug!("✓ InMemory EXPIRE {} (TTL: {:?})", key, ttl);
                return Ok(());
            }
        }
        Err(Error::Nil)
    }

    async fn count_keys_by_pattern(&self, pattern: &str) -> Result<i64> {
        validate_pattern(pattern)?;

        let count = self
            .store
            .iter()
            .filter(|entry| !entry.value().is_expired() && pattern::matches(entry.key(), pattern))
            .count();
        Ok(count as i64)
    }

    async fn get_keys_page(
        &self,
        pattern: &str,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<String>, i64)> {
        validate_pattern(pattern)?;

        // No native ordering here: enumerate, filter, then slice. The
        // order is whatever the map yields, same as an unordered SCAN.
        let matched: Vec<String> = self
            .store
            .iter()
            .filter(|entry| !entry.value().is_expired() && pattern::matches(entry.key(), pattern))
            .map(|entry| entry.key().clone())
            .collect();

        let total = matched.len();
        if total == 0 {
            return Ok((Vec::new(), 0));
        }

        let (start, end) = page_window(page, page_size, total);
        if start >= total {
            return Ok((Vec::new(), total as i64));
        }
        Ok((matched[start..end].to_vec(), total as i64))
    }

    async fn close(&self) -> Result<()> {
        self.store.clear();
        debug!("✓ InMemory CLOSE - store flushed");
        Ok(())
    }
}
