//! Backend selection and the process-wide cache client.
//!
//! [`CacheClient`] is an explicit dependency: build it once from
//! configuration at application start and pass it (or clone it, cheaply)
//! into every component that caches. The initialize-once [`shared_client`]
//! accessor exists for the outermost composition boundary only.

use crate::backend::CacheBackend;
use crate::backend::InMemoryBackend;
#[cfg(feature = "redis")]
use crate::backend::RedisBackend;
use crate::config::CacheConfig;
use crate::error::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::OnceCell;

/// The active cache backend, resolved once from configuration.
///
/// `"redis"` selects the remote backend; any other selector value falls
/// back to the in-process store. Implements [`CacheBackend`] by delegation,
/// so call sites are backend-agnostic.
#[derive(Clone)]
pub enum CacheClient {
    Memory(InMemoryBackend),
    #[cfg(feature = "redis")]
    Redis(RedisBackend),
}

impl CacheClient {
    /// Resolve and construct the backend selected by `config`.
    ///
    /// # Errors
    /// `Config` when `"redis"` is selected without the `redis` cargo
    /// feature; `Backend` when the Redis server is unreachable (fail-fast,
    /// checked with a `PING` at construction).
    pub async fn from_config(config: &CacheConfig) -> Result<Self> {
        if config.backend == "redis" {
            #[cfg(feature = "redis")]
            {
                let backend = RedisBackend::connect(&config.redis).await?;
                return Ok(CacheClient::Redis(backend));
            }
            #[cfg(not(feature = "redis"))]
            {
                return Err(crate::error::Error::Config(
                    "backend \"redis\" selected but the `redis` feature is not enabled"
                        .to_string(),
                ));
            }
        }

        info!("✓ Cache client initialized: in-memory backend");
        Ok(CacheClient::Memory(InMemoryBackend::new()))
    }

    /// An in-memory client, without going through configuration.
    pub fn in_memory() -> Self {
        CacheClient::Memory(InMemoryBackend::new())
    }
}

macro_rules! delegate {
    ($self:ident, $backend:ident => $call:expr) => {
        match $self {
            CacheClient::Memory($backend) => $call,
            #[cfg(feature = "redis")]
            CacheClient::Redis($backend) => $call,
        }
    };
}

impl CacheBackend for CacheClient {
    async fn set(&self, key: &str, value: &Value, ttl: Option<Duration>) -> Result<()> {
        delegate!(self, b => b.set(key, value, ttl).await)
    }

    async fn get(&self, key: &str) -> Result<String> {
        delegate!(self, b => b.get(key).await)
    }

    async fn del(&self, keys: &[&str]) -> Result<()> {
        delegate!(self, b => b.del(keys).await)
    }

    async fn hset(&self, key: &str, args: &[Value]) -> Result<()> {
        delegate!(self, b => b.hset(key, args).await)
    }

    async fn hmset(
        &self,
        key: &str,
        map: &serde_json::Map<String, Value>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        delegate!(self, b => b.hmset(key, map, ttl).await)
    }

    async fn hget(&self, key: &str, field: &str) -> Result<String> {
        delegate!(self, b => b.hget(key, field).await)
    }

    async fn hdel(&self, key: &str, fields: &[&str]) -> Result<()> {
        delegate!(self, b => b.hdel(key, fields).await)
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>> {
        delegate!(self, b => b.hget_all(key).await)
    }

    async fn exists(&self, key: &str) -> Result<i64> {
        delegate!(self, b => b.exists(key).await)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        delegate!(self, b => b.expire(key, ttl).await)
    }

    async fn count_keys_by_pattern(&self, pattern: &str) -> Result<i64> {
        delegate!(self, b => b.count_keys_by_pattern(pattern).await)
    }

    async fn get_keys_page(
        &self,
        pattern: &str,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<String>, i64)> {
        delegate!(self, b => b.get_keys_page(pattern, page, page_size).await)
    }

    async fn close(&self) -> Result<()> {
        delegate!(self, b => b.close().await)
    }
}

static SHARED: OnceCell<CacheClient> = OnceCell::const_new();

/// Initialize-once accessor for the process-wide client.
///
/// At most one backend instance is ever constructed, even under concurrent
/// first calls; `config` is only read by whichever call wins the
/// initialization. After resolution the stored reference is returned
/// without locking. A failed initialization is not cached, so the next
/// call retries.
pub async fn shared_client(config: &CacheConfig) -> Result<&'static CacheClient> {
    SHARED
        .get_or_try_init(|| CacheClient::from_config(config))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_non_redis_selector_falls_back_to_memory() {
        for selector in ["", "memory", "ram", "anything"] {
            let config = CacheConfig {
                backend: selector.to_string(),
                ..CacheConfig::default()
            };
            let client = CacheClient::from_config(&config)
                .await
                .expect("Failed to build client");
            assert!(matches!(client, CacheClient::Memory(_)));
        }
    }

    #[cfg(not(feature = "redis"))]
    #[tokio::test]
    async fn test_redis_selector_without_feature_is_config_error() {
        let config = CacheConfig::redis();
        let err = CacheClient::from_config(&config)
            .await
            .map(|_| ())
            .expect_err("must fail");
        assert!(matches!(err, crate::error::Error::Config(_)));
    }

    #[tokio::test]
    async fn test_client_delegates_to_backend() {
        let client = CacheClient::in_memory();

        client
            .set("user:1", &json!("{\"id\":1}"), Some(Duration::from_secs(3600)))
            .await
            .expect("Failed to set");
        assert_eq!(client.exists("user:1").await.expect("exists failed"), 1);
        assert_eq!(
            client.get("user:1").await.expect("get failed"),
            "{\"id\":1}"
        );

        client.del(&["user:1"]).await.expect("del failed");
        assert_eq!(client.get("user:1").await, Err(crate::error::Error::Nil));
    }

    #[tokio::test]
    async fn test_shared_client_converges_on_one_instance() {
        let config = CacheConfig::in_memory();

        let mut handles = vec![];
        for _ in 0..8 {
            let config = config.clone();
            handles.push(tokio::spawn(async move {
                let client = shared_client(&config).await.expect("init failed");
                client as *const CacheClient as usize
            }));
        }

        let mut addrs = vec![];
        for handle in handles {
            addrs.push(handle.await.expect("Task failed"));
        }
        addrs.dedup();
        assert_eq!(addrs.len(), 1);
    }
}
