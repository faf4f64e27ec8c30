//! Redis key-value store

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};

use crate::domain::store::KeyValueStore;
use crate::domain::DomainError;

/// Configuration for the Redis store
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
    /// Connection timeout
    pub connection_timeout: Duration,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisStoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

/// Maps a redis error to the domain, separating "cannot reach Redis" from
/// "Redis answered with something unusable".
fn map_error(action: &str, e: RedisError) -> DomainError {
    if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout()
    {
        DomainError::store_unavailable(format!("Failed to {}: {}", action, e))
    } else {
        DomainError::store(format!("Failed to {}: {}", action, e))
    }
}

/// Redis-backed store shared between processes
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisStore {
    /// Connects to Redis; fails with `StoreUnavailable` when the server cannot be reached
    pub async fn new(config: RedisStoreConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str()).map_err(|e| {
            DomainError::configuration(format!("Invalid Redis URL '{}': {}", config.url, e))
        })?;

        let connection =
            tokio::time::timeout(config.connection_timeout, ConnectionManager::new(client))
                .await
                .map_err(|_| {
                    DomainError::store_unavailable(format!(
                        "Timed out connecting to Redis after {:?}",
                        config.connection_timeout
                    ))
                })?
                .map_err(|e| map_error("connect to Redis", e))?;

        Ok(Self { connection, config })
    }

    pub async fn with_url(url: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(RedisStoreConfig::new(url)).await
    }

    fn prefix_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    fn strip_prefix(&self, key: String) -> String {
        match &self.config.key_prefix {
            Some(prefix) => key
                .strip_prefix(&format!("{}:", prefix))
                .map(str::to_string)
                .unwrap_or(key),
            None => key,
        }
    }

    fn ttl_secs(ttl: Duration) -> u64 {
        ttl.as_secs().max(1)
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        let prefixed_pattern = self.prefix_key(pattern);
        let mut conn = self.connection.clone();

        let mut cursor = 0u64;
        let mut found = Vec::new();

        loop {
            let (new_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&prefixed_pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(|e| map_error(&format!("scan keys with pattern '{}'", pattern), e))?;

            found.extend(keys);
            cursor = new_cursor;

            if cursor == 0 {
                break;
            }
        }

        Ok(found)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let mut conn = self.connection.clone();

        conn.get(self.prefix_key(key))
            .await
            .map_err(|e| map_error(&format!("get key '{}'", key), e))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        conn.set_ex(self.prefix_key(key), value, Self::ttl_secs(ttl))
            .await
            .map_err(|e| map_error(&format!("set key '{}'", key), e))
    }

    async fn set_persistent_raw(&self, key: &str, value: &str) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        conn.set(self.prefix_key(key), value)
            .await
            .map_err(|e| map_error(&format!("set key '{}'", key), e))
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        let deleted: i64 = conn
            .del(self.prefix_key(key))
            .await
            .map_err(|e| map_error(&format!("delete key '{}'", key), e))?;

        Ok(deleted > 0)
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError> {
        let keys = self.scan(pattern).await?;
        let mut conn = self.connection.clone();
        let mut total_deleted = 0usize;

        for chunk in keys.chunks(100) {
            let deleted: i64 = conn
                .del(chunk)
                .await
                .map_err(|e| map_error("delete keys", e))?;
            total_deleted += deleted as usize;
        }

        Ok(total_deleted)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        Ok(self
            .scan(pattern)
            .await?
            .into_iter()
            .map(|k| self.strip_prefix(k))
            .collect())
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        conn.exists(self.prefix_key(key))
            .await
            .map_err(|e| map_error(&format!("check existence of key '{}'", key), e))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        conn.expire(self.prefix_key(key), Self::ttl_secs(ttl) as i64)
            .await
            .map_err(|e| map_error(&format!("update TTL for key '{}'", key), e))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        let mut conn = self.connection.clone();

        let ttl_secs: i64 = conn
            .ttl(self.prefix_key(key))
            .await
            .map_err(|e| map_error(&format!("get TTL for key '{}'", key), e))?;

        // -2 when missing, -1 when no expiry
        if ttl_secs < 0 {
            Ok(None)
        } else {
            Ok(Some(Duration::from_secs(ttl_secs as u64)))
        }
    }

    async fn clear(&self) -> Result<(), DomainError> {
        match &self.config.key_prefix {
            Some(_) => {
                self.delete_pattern("*").await?;
            }
            None => {
                let mut conn = self.connection.clone();
                redis::cmd("FLUSHDB")
                    .query_async::<()>(&mut conn)
                    .await
                    .map_err(|e| map_error("flush database", e))?;
            }
        }

        Ok(())
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64, DomainError> {
        let mut conn = self.connection.clone();

        conn.incr(self.prefix_key(key), delta)
            .await
            .map_err(|e| map_error(&format!("increment key '{}'", key), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::store::KeyValueStoreExt;

    fn get_test_config() -> RedisStoreConfig {
        RedisStoreConfig::new("redis://127.0.0.1:6379").with_key_prefix("semantic-engine-test")
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_set_and_get() {
        let store = RedisStore::new(get_test_config()).await.unwrap();

        store.set("key1", &"value1", Duration::from_secs(60)).await.unwrap();

        let result: Option<String> = store.get("key1").await.unwrap();
        assert_eq!(result, Some("value1".to_string()));

        store.delete("key1").await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_increment() {
        let store = RedisStore::new(get_test_config()).await.unwrap();
        store.delete("counter").await.unwrap();

        assert_eq!(store.increment("counter", 5).await.unwrap(), 5);
        assert_eq!(store.increment("counter", 3).await.unwrap(), 8);

        store.delete("counter").await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_persistent_value_and_counter_expiry() {
        let store = RedisStore::new(get_test_config()).await.unwrap();

        store.set_persistent("forever", &"value").await.unwrap();
        assert!(store.ttl("forever").await.unwrap().is_none());

        store.delete("hits").await.unwrap();
        assert_eq!(store.increment("hits", 1).await.unwrap(), 1);
        assert!(store.expire("hits", Duration::from_secs(60)).await.unwrap());
        assert_eq!(store.increment("hits", 1).await.unwrap(), 2);
        assert!(store.ttl("hits").await.unwrap().is_some());

        store.delete("forever").await.unwrap();
        store.delete("hits").await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_keys_strip_prefix() {
        let store = RedisStore::new(get_test_config()).await.unwrap();
        store.set("scan:a", &1, Duration::from_secs(60)).await.unwrap();
        store.set("scan:b", &2, Duration::from_secs(60)).await.unwrap();

        let mut keys = store.keys("scan:*").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["scan:a", "scan:b"]);

        assert_eq!(store.delete_pattern("scan:*").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let config = RedisStoreConfig::new("redis://127.0.0.1:1")
            .with_connection_timeout(Duration::from_millis(500));

        let result = RedisStore::new(config).await;
        assert!(matches!(result, Err(DomainError::StoreUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_invalid_url_is_configuration_error() {
        let result = RedisStore::with_url("not a url").await;
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[test]
    fn test_key_prefix() {
        let config = RedisStoreConfig::new("redis://localhost").with_key_prefix("myapp");
        assert_eq!(config.key_prefix, Some("myapp".to_string()));
    }
}
