//! # duocache
//!
//! A string-oriented key/value cache presenting one contract over two
//! structurally different backends: an in-process expiring map and a
//! remote Redis server.
//!
//! ## Features
//!
//! - **One contract:** [`CacheBackend`] covers plain values, hash-field
//!   sub-maps, TTLs, and glob-pattern key counting/pagination
//! - **Two backends:** [`backend::InMemoryBackend`] (always available) and
//!   [`backend::RedisBackend`] (behind the `redis` cargo feature)
//! - **Opaque payloads:** strings stored verbatim, everything else
//!   JSON-marshaled; typed (de)serialization stays at the call site via
//!   [`payload::encode`] / [`payload::decode`]
//! - **Explicit wiring:** build one [`CacheClient`] from configuration and
//!   pass it around; a guarded [`client::shared_client`] accessor exists
//!   for the composition boundary
//!
//! ## Quick Start
//!
//! ```no_run
//! use duocache::{CacheBackend, CacheClient, CacheConfig};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> duocache::Result<()> {
//!     // "redis" selects the remote backend, anything else in-memory.
//!     let client = CacheClient::from_config(&CacheConfig::in_memory()).await?;
//!
//!     client.set("user:1", &json!({"id": 1}), Some(Duration::from_secs(3600))).await?;
//!     let payload = client.get("user:1").await?;
//!     assert_eq!(payload, "{\"id\":1}");
//!
//!     client.hset("session:9", &[json!("ip"), json!("10.0.0.9")]).await?;
//!     let fields = client.hget_all("session:9").await?;
//!     assert_eq!(fields["ip"], "10.0.0.9");
//!
//!     let (keys, total) = client.get_keys_page("user:*", 1, 50).await?;
//!     assert_eq!((keys.len(), total), (1, 1));
//!     Ok(())
//! }
//! ```
//!
//! ## Not-found semantics
//!
//! Single-item reads (`get`, `hget`) fail with [`Error::Nil`] when nothing
//! is there, so an empty string value and a missing key are
//! distinguishable. Collection reads (`hget_all`, `get_keys_page`) return
//! empty collections instead.

#[macro_use]
extern crate log;

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod pattern;
pub mod payload;

// Re-exports for convenience
pub use backend::CacheBackend;
pub use backend::InMemoryBackend;
#[cfg(feature = "redis")]
pub use backend::RedisBackend;
pub use client::{shared_client, CacheClient};
pub use config::{CacheConfig, RedisConfig};
pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
