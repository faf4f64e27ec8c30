//! In-memory key-value store using moka

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use tokio::sync::Mutex;

use crate::domain::store::{glob_to_regex, KeyValueStore};
use crate::domain::DomainError;

/// Configuration for the in-memory store
#[derive(Debug, Clone)]
pub struct InMemoryStoreConfig {
    /// Maximum number of entries before moka starts evicting
    pub max_capacity: u64,
    /// Entries not accessed for this long are evicted
    pub time_to_idle: Option<Duration>,
}

impl Default for InMemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            time_to_idle: None,
        }
    }
}

impl InMemoryStoreConfig {
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    pub fn with_time_to_idle(mut self, tti: Duration) -> Self {
        self.time_to_idle = Some(tti);
        self
    }
}

#[derive(Debug, Clone)]
struct StoredValue {
    data: String,
    /// Millis since epoch; `None` never expires
    expires_at: Option<u64>,
}

impl StoredValue {
    fn is_expired(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Bounded, process-local store.
///
/// Per-entry TTLs are checked on read. `expire` and `increment` are
/// serialized through a write lock so they stay atomic.
#[derive(Debug)]
pub struct InMemoryStore {
    cache: MokaCache<String, StoredValue>,
    write_lock: Mutex<()>,
    config: InMemoryStoreConfig,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_config(InMemoryStoreConfig::default())
    }

    pub fn with_config(config: InMemoryStoreConfig) -> Self {
        let mut builder = MokaCache::builder().max_capacity(config.max_capacity);

        if let Some(tti) = config.time_to_idle {
            builder = builder.time_to_idle(tti);
        }

        Self {
            cache: builder.build(),
            write_lock: Mutex::new(()),
            config,
        }
    }

    pub fn config(&self) -> &InMemoryStoreConfig {
        &self.config
    }

    fn now_millis() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    fn expiry(ttl: Duration) -> Option<u64> {
        Some(Self::now_millis() + ttl.as_millis() as u64)
    }

    async fn live(&self, key: &str) -> Option<StoredValue> {
        let value = self.cache.get(key).await?;

        if value.is_expired(Self::now_millis()) {
            self.cache.remove(key).await;
            return None;
        }

        Some(value)
    }

    async fn matching_keys(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        let regex = glob_to_regex(pattern)?;

        self.cache.run_pending_tasks().await;

        let cache = self.cache.clone();
        let now = Self::now_millis();

        tokio::task::spawn_blocking(move || {
            cache
                .iter()
                .filter(|(_, value)| !value.is_expired(now))
                .map(|(key, _)| key.as_ref().clone())
                .filter(|key| regex.is_match(key))
                .collect()
        })
        .await
        .map_err(|e| DomainError::store(format!("Failed to iterate store: {}", e)))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.live(key).await.map(|v| v.data))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let stored = StoredValue {
            data: value.to_string(),
            expires_at: Self::expiry(ttl),
        };

        self.cache.insert(key.to_string(), stored).await;
        Ok(())
    }

    async fn set_persistent_raw(&self, key: &str, value: &str) -> Result<(), DomainError> {
        let stored = StoredValue {
            data: value.to_string(),
            expires_at: None,
        };

        self.cache.insert(key.to_string(), stored).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.cache.remove(key).await.is_some())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError> {
        let keys = self.matching_keys(pattern).await?;
        let mut deleted = 0;

        for key in keys {
            if self.cache.remove(&key).await.is_some() {
                deleted += 1;
            }
        }

        Ok(deleted)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        self.matching_keys(pattern).await
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.live(key).await.is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, DomainError> {
        let _guard = self.write_lock.lock().await;

        match self.live(key).await {
            Some(value) => {
                let refreshed = StoredValue {
                    data: value.data,
                    expires_at: Self::expiry(ttl),
                };

                self.cache.insert(key.to_string(), refreshed).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        let now = Self::now_millis();

        Ok(self
            .live(key)
            .await
            .and_then(|v| v.expires_at)
            .map(|at| Duration::from_millis(at.saturating_sub(now))))
    }

    async fn clear(&self) -> Result<(), DomainError> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(())
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64, DomainError> {
        let _guard = self.write_lock.lock().await;

        // An existing counter keeps its expiry
        let (current, expires_at) = match self.live(key).await {
            Some(value) => {
                let current = value.data.parse::<i64>().map_err(|e| {
                    DomainError::store(format!("Value at '{}' is not an integer: {}", key, e))
                })?;
                (current, value.expires_at)
            }
            None => (0, None),
        };
        let next = current + delta;

        let stored = StoredValue {
            data: next.to_string(),
            expires_at,
        };
        self.cache.insert(key.to_string(), stored).await;

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::store::KeyValueStoreExt;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = InMemoryStore::new();

        store.set("key1", &"value1", Duration::from_secs(60)).await.unwrap();

        let result: Option<String> = store.get("key1").await.unwrap();
        assert_eq!(result, Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = InMemoryStore::new();

        let result: Option<String> = store.get("missing").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryStore::new();
        store.set("key1", &"value1", Duration::from_secs(60)).await.unwrap();

        assert!(store.delete("key1").await.unwrap());
        assert!(!store.delete("key1").await.unwrap());
        assert!(!store.exists("key1").await.unwrap());
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let store = InMemoryStore::new();

        store.set("key1", &"value1", Duration::from_millis(50)).await.unwrap();
        assert!(store.exists("key1").await.unwrap());

        tokio::time::sleep(Duration::from_millis(100)).await;

        let result: Option<String> = store.get("key1").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_ttl_remaining_and_expire() {
        let store = InMemoryStore::new();
        store.set("key1", &"value1", Duration::from_secs(60)).await.unwrap();

        let remaining = store.ttl("key1").await.unwrap().unwrap();
        assert!(remaining.as_secs() > 50 && remaining.as_secs() <= 60);

        assert!(store.expire("key1", Duration::from_secs(2)).await.unwrap());
        assert!(store.ttl("key1").await.unwrap().unwrap().as_secs() <= 2);

        assert!(!store.expire("missing", Duration::from_secs(2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_persistent_value_has_no_expiry() {
        let store = InMemoryStore::new();

        store.set_persistent("key1", &"value1").await.unwrap();

        assert!(store.ttl("key1").await.unwrap().is_none());
        let value: Option<String> = store.get("key1").await.unwrap();
        assert_eq!(value, Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_concurrent_increment() {
        let store = Arc::new(InMemoryStore::new());

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment("counter", 1).await.unwrap() })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.increment("counter", 0).await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_increment_keeps_expiry() {
        let store = InMemoryStore::new();

        assert_eq!(store.increment("hits", 1).await.unwrap(), 1);
        assert!(store.ttl("hits").await.unwrap().is_none());

        assert!(store.expire("hits", Duration::from_secs(30)).await.unwrap());
        assert_eq!(store.increment("hits", 1).await.unwrap(), 2);

        let remaining = store.ttl("hits").await.unwrap().unwrap();
        assert!(remaining.as_secs() <= 30);
    }

    #[tokio::test]
    async fn test_increment_non_integer_fails() {
        let store = InMemoryStore::new();
        store.set("text", &"abc", Duration::from_secs(60)).await.unwrap();

        assert!(store.increment("text", 1).await.is_err());
    }

    #[tokio::test]
    async fn test_keys_and_delete_pattern() {
        let store = InMemoryStore::new();
        store.set("user:1:profile", &"a", Duration::from_secs(60)).await.unwrap();
        store.set("user:2:profile", &"b", Duration::from_secs(60)).await.unwrap();
        store.set("other:key", &"c", Duration::from_secs(60)).await.unwrap();

        let mut keys = store.keys("user:*").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["user:1:profile", "user:2:profile"]);

        assert_eq!(store.delete_pattern("user:*:profile").await.unwrap(), 2);
        assert_eq!(store.keys("*").await.unwrap(), vec!["other:key"]);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = InMemoryStore::new();
        store.set("key1", &"value1", Duration::from_secs(60)).await.unwrap();
        store.set("key2", &"value2", Duration::from_secs(60)).await.unwrap();

        store.clear().await.unwrap();

        assert!(store.keys("*").await.unwrap().is_empty());
    }

    #[test]
    fn test_config() {
        let config = InMemoryStoreConfig::default()
            .with_max_capacity(100)
            .with_time_to_idle(Duration::from_secs(60));

        let store = InMemoryStore::with_config(config);

        assert_eq!(store.config().max_capacity, 100);
        assert_eq!(store.config().time_to_idle, Some(Duration::from_secs(60)));
    }
}
