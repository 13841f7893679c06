//! Cache-aside layer for query results
//!
//! Three pieces:
//! - [`cache_key`]: deterministic fingerprint of a query payload,
//! - [`CacheStore`]: backend abstraction with Redis and in-memory
//!   implementations,
//! - [`QueryCache`]: the adapter request code talks to. It is the single
//!   absorption point for backend errors — every failure degrades to a miss
//!   or a no-op, so cache unavailability can never fail a request.

use async_trait::async_trait;
use redis::AsyncCommands;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

/// Cache key prefixes per entity class
pub mod keys {
    pub const BOOKS_SEARCH: &str = "books_search";
    pub const AUTHORS_SEARCH: &str = "authors_search";
}

/// Number of hex digits kept from the digest
const KEY_DIGEST_LEN: usize = 24;

/// Derive a deterministic cache key `prefix:hash` from a query payload.
///
/// The parameter map is key-sorted before hashing, so the same logical query
/// yields the same key regardless of insertion order. SHA-256 truncated to
/// 24 hex chars keeps collisions negligible at catalog scale.
pub fn cache_key(prefix: &str, params: &BTreeMap<&str, serde_json::Value>) -> String {
    let canonical = serde_json::to_string(params).unwrap_or_default();
    let digest = Sha256::digest(canonical.as_bytes());
    let hash = hex::encode(digest);
    format!("{}:{}", prefix, &hash[..KEY_DIGEST_LEN])
}

/// Cache backend errors, absorbed by [`QueryCache`]
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("Cache connection failed: {message}")]
    Connect { message: String },

    #[error("Cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Abstract cache store interface
///
/// Implementations must handle TTL expiration and be thread-safe.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a cached value; `None` when the key is absent or expired
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Set a cached value with an expiry
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;

    /// Delete every key under `prefix:*`, returning the number removed
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError>;
}

/// Redis-backed cache store
pub struct RedisCacheStore {
    connection: redis::aio::MultiplexedConnection,
}

impl RedisCacheStore {
    /// Connect with a bounded timeout; fail-fast keeps startup snappy when
    /// the backend is down (callers fall back to the in-memory store)
    pub async fn connect(url: &str, connect_timeout: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let connection =
            tokio::time::timeout(connect_timeout, client.get_multiplexed_async_connection())
                .await
                .map_err(|_| CacheError::Connect {
                    message: format!("timed out after {:?}", connect_timeout),
                })??;
        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.connection.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let _: () = conn.set_ex(key, value, ttl.as_secs()).await?;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        let mut conn = self.connection.clone();
        let pattern = format!("{}:*", prefix);
        let keys: Vec<String> = conn.keys(&pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let deleted: i64 = conn.del(&keys).await?;
        Ok(deleted as usize)
    }
}

struct CacheEntry {
    data: Vec<u8>,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }
}

/// In-memory cache store with TTL support
///
/// Used by tests and as the fallback when the Redis backend is disabled or
/// unreachable at startup.
#[derive(Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.data.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                data: value.to_vec(),
                created_at: Instant::now(),
                ttl,
            },
        );
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        let needle = format!("{}:", prefix);
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(&needle));
        Ok(before - entries.len())
    }
}

/// Fail-open adapter over a [`CacheStore`]
///
/// Every backend error is logged at debug level and converted to a miss or
/// no-op here; nothing cache-related propagates to request handlers.
#[derive(Clone)]
pub struct QueryCache {
    store: Arc<dyn CacheStore>,
}

impl QueryCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Typed cache read; any backend or decode failure is a miss
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.store.get(key).await {
            Ok(bytes) => bytes?,
            Err(e) => {
                debug!("cache get failed for {}: {}", key, e);
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("cache entry for {} failed to decode: {}", key, e);
                None
            }
        }
    }

    /// Typed cache write; failures are dropped
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("cache encode failed for {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.store.set(key, &bytes, ttl).await {
            debug!("cache set failed for {}: {}", key, e);
        }
    }

    /// Remove every entry under `prefix:*`; runs synchronously before the
    /// triggering mutation's response is returned
    pub async fn invalidate_prefix(&self, prefix: &str) {
        match self.store.delete_prefix(prefix).await {
            Ok(count) if count > 0 => debug!("invalidated {} cache entries under {}", count, prefix),
            Ok(_) => {}
            Err(e) => debug!("cache invalidation failed for {}: {}", prefix, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&'static str, serde_json::Value)]) -> BTreeMap<&'static str, serde_json::Value> {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn test_cache_key_is_order_independent() {
        let a = params(&[
            ("q", json!("rust")),
            ("skip", json!(0)),
            ("limit", json!(10)),
        ]);
        let b = params(&[
            ("limit", json!(10)),
            ("q", json!("rust")),
            ("skip", json!(0)),
        ]);
        assert_eq!(cache_key("books_search", &a), cache_key("books_search", &b));
    }

    #[test]
    fn test_cache_key_differs_per_value_and_prefix() {
        let a = params(&[("q", json!("rust")), ("skip", json!(0))]);
        let b = params(&[("q", json!("rust")), ("skip", json!(1))]);
        assert_ne!(cache_key("books_search", &a), cache_key("books_search", &b));
        assert_ne!(
            cache_key("books_search", &a),
            cache_key("authors_search", &a)
        );
    }

    #[test]
    fn test_cache_key_shape() {
        let key = cache_key("books_search", &params(&[("q", json!("x"))]));
        let (prefix, hash) = key.split_once(':').unwrap();
        assert_eq!(prefix, "books_search");
        assert_eq!(hash.len(), KEY_DIGEST_LEN);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_in_memory_store_round_trip() {
        let store = InMemoryCacheStore::new();
        store
            .set("books_search:abc", b"payload", Duration::from_secs(60))
            .await
            .unwrap();

        let got = store.get("books_search:abc").await.unwrap();
        assert_eq!(got.as_deref(), Some(&b"payload"[..]));
        assert!(store.get("books_search:other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_store_expires() {
        let store = InMemoryCacheStore::new();
        store
            .set("books_search:abc", b"payload", Duration::from_millis(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(store.get("books_search:abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_delete_prefix_spares_other_prefixes() {
        let store = InMemoryCacheStore::new();
        let ttl = Duration::from_secs(60);
        store.set("books_search:a", b"1", ttl).await.unwrap();
        store.set("books_search:b", b"2", ttl).await.unwrap();
        store.set("authors_search:c", b"3", ttl).await.unwrap();

        let removed = store.delete_prefix("books_search").await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.get("books_search:a").await.unwrap().is_none());
        assert!(store.get("authors_search:c").await.unwrap().is_some());
    }

    struct FailingStore;

    #[async_trait]
    impl CacheStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Err(CacheError::Connect {
                message: "down".to_string(),
            })
        }

        async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Connect {
                message: "down".to_string(),
            })
        }

        async fn delete_prefix(&self, _prefix: &str) -> Result<usize, CacheError> {
            Err(CacheError::Connect {
                message: "down".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_query_cache_absorbs_backend_failures() {
        let cache = QueryCache::new(Arc::new(FailingStore));

        // all three operations degrade silently
        let miss: Option<serde_json::Value> = cache.get_json("books_search:x").await;
        assert!(miss.is_none());
        cache
            .set_json("books_search:x", &json!({"k": 1}), Duration::from_secs(1))
            .await;
        cache.invalidate_prefix("books_search").await;
    }

    #[tokio::test]
    async fn test_query_cache_json_round_trip() {
        let cache = QueryCache::new(Arc::new(InMemoryCacheStore::new()));
        let value = json!({"query": "rust", "total_count": 3});

        cache
            .set_json("books_search:k", &value, Duration::from_secs(60))
            .await;
        let got: Option<serde_json::Value> = cache.get_json("books_search:k").await;
        assert_eq!(got, Some(value));
    }
}
