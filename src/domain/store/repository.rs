//! Key-value store trait definition

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::domain::DomainError;

/// Backing key-value store with TTL support
///
/// Values are JSON strings so the trait stays dyn-compatible; use
/// [`KeyValueStoreExt`] for typed access. Patterns are globs where `*`
/// matches any run of characters.
#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Sets a value that never expires
    async fn set_persistent_raw(&self, key: &str, value: &str) -> Result<(), DomainError>;

    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError>;

    /// Lists live keys matching a pattern
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, DomainError>;

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.get_raw(key).await?.is_some())
    }

    /// Updates the TTL of an existing key
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, DomainError>;

    /// Remaining TTL of a key, `None` if absent or without expiry
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError>;

    async fn clear(&self) -> Result<(), DomainError>;

    /// Atomically increments a counter, returning the new value
    async fn increment(&self, key: &str, delta: i64) -> Result<i64, DomainError>;
}

/// Typed get/set on top of the raw JSON interface
pub trait KeyValueStoreExt: KeyValueStore {
    fn get<'a, V>(
        &'a self,
        key: &'a str,
    ) -> impl std::future::Future<Output = Result<Option<V>, DomainError>> + Send
    where
        V: DeserializeOwned + Send,
    {
        async move {
            match self.get_raw(key).await? {
                Some(data) => serde_json::from_str(&data).map(Some).map_err(|e| {
                    DomainError::store(format!("Failed to deserialize value for '{}': {}", key, e))
                }),
                None => Ok(None),
            }
        }
    }

    fn set<'a, V>(
        &'a self,
        key: &'a str,
        value: &'a V,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<(), DomainError>> + Send
    where
        V: Serialize + Send + Sync,
    {
        async move {
            let data = serde_json::to_string(value).map_err(|e| {
                DomainError::internal(format!("Failed to serialize value for '{}': {}", key, e))
            })?;
            self.set_raw(key, &data, ttl).await
        }
    }

    fn set_persistent<'a, V>(
        &'a self,
        key: &'a str,
        value: &'a V,
    ) -> impl std::future::Future<Output = Result<(), DomainError>> + Send
    where
        V: Serialize + Send + Sync,
    {
        async move {
            let data = serde_json::to_string(value).map_err(|e| {
                DomainError::internal(format!("Failed to serialize value for '{}': {}", key, e))
            })?;
            self.set_persistent_raw(key, &data).await
        }
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStoreExt for T {}

/// Converts a `*` glob into an anchored regex
pub fn glob_to_regex(pattern: &str) -> Result<regex::Regex, DomainError> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");

    regex::Regex::new(&format!("^{}$", body))
        .map_err(|e| DomainError::validation(format!("Invalid key pattern '{}': {}", pattern, e)))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_is_anchored_and_escaped() {
        let regex = glob_to_regex("prompt:exact:*").unwrap();

        assert!(regex.is_match("prompt:exact:abc"));
        assert!(!regex.is_match("x:prompt:exact:abc"));

        let dotted = glob_to_regex("a.b*").unwrap();
        assert!(dotted.is_match("a.bc"));
        assert!(!dotted.is_match("axbc"));
    }
}
