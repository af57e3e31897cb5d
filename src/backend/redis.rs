//! Redis cache backend implementation.
//!
//! Thin adapter over the native Redis commands. TTL, key scanning and
//! pattern matching are delegated to the server; pattern counting and
//! pagination ride on cursor-based `SCAN MATCH`.

use super::{page_window, validate_key, validate_pattern, CacheBackend};
use crate::config::{RedisConfig, DEFAULT_POOL_SIZE};
use crate::error::{Error, Result};
use crate::payload::{self, HsetArgs};
use deadpool_redis::{redis::AsyncCommands, Config as PoolConfig, Connection, Pool, Runtime};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Floor for the `SCAN COUNT` batch hint used by pagination.
const MIN_SCAN_BATCH: i64 = 100;

/// Redis backend with connection pooling and async operations.
///
/// Uses deadpool for async resource management. Construction is fail-fast:
/// [`RedisBackend::connect`] issues a `PING` and an unreachable server is an
/// error at startup, never discovered later. Errors from the server
/// propagate unchanged; nothing is retried.
///
/// # Example
///
/// ```no_run
/// # use duocache::backend::{CacheBackend, RedisBackend};
/// # use duocache::config::RedisConfig;
/// # use duocache::error::Result;
/// # use serde_json::json;
/// # async fn example() -> Result<()> {
/// let backend = RedisBackend::connect(&RedisConfig::default()).await?;
///
/// backend.set("key", &json!("value"), None).await?;
/// let value = backend.get("key").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisBackend {
    pool: Pool,
}

impl RedisBackend {
    /// Create a Redis backend from configuration and verify the connection.
    ///
    /// # Errors
    /// Returns `Err` if pool creation fails or the server does not answer
    /// the startup `PING`.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let mut cfg = PoolConfig::from_url(config.connection_string());
        cfg.pool = Some(deadpool_redis::PoolConfig::new(config.pool_size as usize));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Error::Backend(format!("Failed to create Redis pool: {}", e)))?;

        let backend = RedisBackend { pool };
        backend.ping().await.map_err(|e| {
            Error::Backend(format!(
                "Redis unreachable at {}:{}: {}",
                config.host, config.port, e
            ))
        })?;

        info!("✓ Redis backend initialized: {}:{}", config.host, config.port);
        Ok(backend)
    }

    /// Create from a connection string directly.
    ///
    /// Pool size comes from the `REDIS_POOL_SIZE` environment variable when
    /// set, otherwise the default of 16.
    ///
    /// # Errors
    /// Same failure modes as [`RedisBackend::connect`].
    pub async fn from_connection_string(conn_str: &str) -> Result<Self> {
        let pool_size = std::env::var("REDIS_POOL_SIZE")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_POOL_SIZE);

        let mut cfg = PoolConfig::from_url(conn_str);
        cfg.pool = Some(deadpool_redis::PoolConfig::new(pool_size as usize));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Error::Backend(format!("Failed to create Redis pool: {}", e)))?;

        let backend = RedisBackend { pool };
        backend.ping().await?;

        info!(
            "✓ Redis backend initialized from connection string (pool size: {})",
            pool_size
        );
        Ok(backend)
    }

    /// Verify the server answers `PING`.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn().await?;
        let pong: String = deadpool_redis::redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(|e| Error::Backend(format!("Redis PING failed: {}", e)))?;

        if pong.contains("PONG") {
            Ok(())
        } else {
            Err(Error::Backend(format!("unexpected PING reply: {}", pong)))
        }
    }

    async fn conn(&self) -> Result<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| Error::Backend(format!("Failed to get Redis connection: {}", e)))
    }

    /// One `SCAN` step. A zero `count` omits the batch hint.
    async fn scan(
        conn: &mut Connection,
        cursor: u64,
        pattern: &str,
        count: i64,
    ) -> Result<(u64, Vec<String>)> {
        let mut cmd = deadpool_redis::redis::cmd("SCAN");
        cmd.arg(cursor).arg("MATCH").arg(pattern);
        if count > 0 {
            cmd.arg("COUNT").arg(count);
        }

        let (next, keys): (u64, Vec<String>) = cmd
            .query_async(&mut **conn)
            .await
            .map_err(|e| Error::Backend(format!("Redis SCAN failed: {}", e)))?;
        Ok((next, keys))
    }
}

impl CacheBackend for RedisBackend {
    async fn set(&self, key: &str, value: &Value, ttl: Option<Duration>) -> Result<()> {
        validate_key(key)?;
        let data = payload::marshal(value)?;
        if data.is_empty() {
            return Err(Error::ValueNull);
        }

        let mut conn = self.conn().await?;
        match ttl.filter(|d| !d.is_zero()) {
            Some(duration) => {
                let seconds = duration.as_secs();
                conn.set_ex::<_, _, ()>(key, data, seconds)
                    .await
                    .map_err(|e| {
                        Error::Backend(format!("Redis SET_EX failed for key {}: {}", key, e))
                    })?;
                debug!("✓ Redis SET {} (TTL: {}s)", key, seconds);
            }
            None => {
                conn.set::<_, _, ()>(key, data).await.map_err(|e| {
                    Error::Backend(format!("Redis SET failed for key {}: {}", key, e))
                })?;
                debug!("✓ Redis SET {}", key);
            }
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<String> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| Error::Backend(format!("Redis GET failed for key {}: {}", key, e)))?;

        match value {
            Some(data) => {
                debug!("✓ Redis GET {} -> HIT", key);
                Ok(data)
            }
            None => {
                debug!("✓ Redis GET {} -> MISS", key);
                Err(Error::Nil)
            }
        }
    }

    async fn del(&self, keys: &[&str]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn().await?;
        conn.del::<_, ()>(keys)
            .await
            .map_err(|e| Error::Backend(format!("Redis DEL failed: {}", e)))?;

        debug!("✓ Redis DEL {} keys", keys.len());
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
                let mut conn = self.conn().await?;
                conn.hset_multiple::<_, _, _, ()>(key, &pairs)
                    .await
                    .map_err(|e| {
                        Error::Backend(format!("Redis HSET failed for key {}: {}", key, e))
                    })?;
                debug!("✓ Redis HSET {} ({} fields)", key, pairs.len());
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

        let mut conn = self.conn().await?;
        conn.hset_multiple::<_, _, _, ()>(key, &pairs)
            .await
            .map_err(|e| Error::Backend(format!("Redis HSET failed for key {}: {}", key, e)))?;

        // Whole-key expiry; the in-memory backend expires per field instead.
        if let Some(duration) = ttl.filter(|d| !d.is_zero()) {
            conn.expire::<_, ()>(key, duration.as_secs() as i64)
                .await
                .map_err(|e| {
                    Error::Backend(format!("Redis EXPIRE failed for key {}: {}", key, e))
                })?;
        }

        debug!("✓ Redis HMSET {} ({} fields)", key, pairs.len());
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<String> {
        validate_key(key)?;
        let mut conn = self.conn().await?;
        let value: Option<String> = conn
            .hget(key, field)
            .await
            .map_err(|e| Error::Backend(format!("Redis HGET failed for key {}: {}", key, e)))?;

        value.ok_or(Error::Nil)
    }

    async fn hdel(&self, key: &str, fields: &[&str]) -> Result<()> {
        validate_key(key)?;
        if fields.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn().await?;
        conn.hdel::<_, _, ()>(key, fields)
            .await
            .map_err(|e| Error::Backend(format!("Redis HDEL failed for key {}: {}", key, e)))?;

        debug!("✓ Redis HDEL {} ({} fields)", key, fields.len());
        Ok(())
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>> {
        validate_key(key)?;
        let mut conn = self.conn().await?;
        let map: HashMap<String, String> = conn
            .hgetall(key)
            .await
            .map_err(|e| Error::Backend(format!("Redis HGETALL failed for key {}: {}", key, e)))?;
        Ok(map)
    }

    async fn exists(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn().await?;
        let count: i64 = conn
            .exists(key)
            .await
            .map_err(|e| Error::Backend(format!("Redis EXISTS failed for key {}: {}", key, e)))?;

        // Uniform contract with the in-memory backend: absence is Nil,
        // not a zero count.
        if count == 0 {
            return Err(Error::Nil);
        }
        Ok(count)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn().await?;
        let updated: bool = conn
            .expire(key, ttl.as_secs() as i64)
            .await
            .map_err(|e| Error::Backend(format!("Redis EXPIRE failed for key {}: {}", key, e)))?;

        if !updated {
            return Err(Error::Nil);
        }
        debug!("✓ Redis EXPIRE {} (TTL: {:?})", key, ttl);
        Ok(())
    }

    async fn count_keys_by_pattern(&self, pattern: &str) -> Result<i64> {
        validate_pattern(pattern)?;

        let mut conn = self.conn().await?;
        let mut count: i64 = 0;
        let mut cursor: u64 = 0;

        // One full logical pass: the cursor returning to 0 means the
        // keyspace has been covered.
        loop {
            let (next, batch) = Self::scan(&mut conn, cursor, pattern, 0).await?;
            count += batch.len() as i64;
            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(count)
    }

    async fn get_keys_page(
        &self,
        pattern: &str,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<String>, i64)> {
        // Counting pass first; not stable against concurrent key mutation
        // between the two passes.
        let total = self.count_keys_by_pattern(pattern).await?;
        if total == 0 {
            return Ok((Vec::new(), 0));
        }

        let (start, end) = page_window(page, page_size, total as usize);
        if start >= end {
            return Ok((Vec::new(), total));
        }

        // Larger batches for larger pages to cut round trips; COUNT is
        // only a hint, the server may return more or fewer keys.
        let scan_count = (page_size * 2).max(MIN_SCAN_BATCH);

        let mut conn = self.conn().await?;
        let mut result = Vec::new();
        let mut seen = 0usize;
        let mut cursor: u64 = 0;

        loop {
            let (next, batch) = Self::scan(&mut conn, cursor, pattern, scan_count).await?;
            for key in batch {
                if seen >= start {
                    result.push(key);
                }
                seen += 1;
                if seen >= end {
                    return Ok((result, total));
                }
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok((result, total))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close();
        debug!("✓ Redis CLOSE - pool shut down");
        Ok(())
    }
}
