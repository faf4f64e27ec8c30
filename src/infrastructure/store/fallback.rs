//! Store wrapper that switches to a local in-memory store when the primary
//! store becomes unreachable

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, warn};

use super::in_memory::InMemoryStore;
use crate::domain::store::KeyValueStore;
use crate::domain::DomainError;

/// Runs `$call` against the primary store unless degraded. An unavailable
/// error or a timeout flips the wrapper into degraded mode and the same call
/// is replayed against the fallback store.
macro_rules! route {
    ($self:ident, $action:expr, |$store:ident| $call:expr) => {{
        let primary = if $self.is_degraded() {
            None
        } else {
            let $store: &dyn KeyValueStore = $self.primary.as_ref();
            match tokio::time::timeout($self.operation_timeout, $call).await {
                Ok(Err(e)) if e.is_unavailable() => {
                    $self.degrade($action, &e.to_string());
                    None
                }
                Ok(result) => Some(result),
                Err(_) => {
                    $self.degrade($action, "operation timed out");
                    None
                }
            }
        };

        match primary {
            Some(result) => result,
            None => {
                let $store: &dyn KeyValueStore = &$self.fallback;
                $call.await
            }
        }
    }};
}

/// Primary store with a sticky in-memory fallback.
///
/// Once degraded, every operation is served locally for the rest of the
/// process lifetime; data written to the fallback is never copied back.
#[derive(Debug)]
pub struct FallbackStore {
    primary: Arc<dyn KeyValueStore>,
    fallback: InMemoryStore,
    operation_timeout: Duration,
    degraded: AtomicBool,
}

impl FallbackStore {
    pub fn new(
        primary: Arc<dyn KeyValueStore>,
        fallback: InMemoryStore,
        operation_timeout: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            operation_timeout,
            degraded: AtomicBool::new(false),
        }
    }

    /// Starts already degraded, used when the primary could not be reached at startup
    pub fn degraded(fallback: InMemoryStore, reason: &str) -> Self {
        error!(reason = %reason, "Primary store unavailable at startup, using in-memory fallback");
        metrics::gauge!("store_degraded").set(1.0);

        Self {
            primary: Arc::new(InMemoryStore::new()),
            fallback,
            operation_timeout: Duration::from_secs(1),
            degraded: AtomicBool::new(true),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    fn degrade(&self, action: &str, reason: &str) {
        if !self.degraded.swap(true, Ordering::AcqRel) {
            warn!(
                action = %action,
                reason = %reason,
                "Primary store unavailable, switching to in-memory fallback"
            );
            metrics::gauge!("store_degraded").set(1.0);
        }
    }
}

#[async_trait]
impl KeyValueStore for FallbackStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        route!(self, "get", |store| store.get_raw(key))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        route!(self, "set", |store| store.set_raw(key, value, ttl))
    }

    async fn set_persistent_raw(&self, key: &str, value: &str) -> Result<(), DomainError> {
        route!(self, "set_persistent", |store| store.set_persistent_raw(key, value))
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        route!(self, "delete", |store| store.delete(key))
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError> {
        route!(self, "delete_pattern", |store| store.delete_pattern(pattern))
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        route!(self, "keys", |store| store.keys(pattern))
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        route!(self, "exists", |store| store.exists(key))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, DomainError> {
        route!(self, "expire", |store| store.expire(key, ttl))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        route!(self, "ttl", |store| store.ttl(key))
    }

    async fn clear(&self) -> Result<(), DomainError> {
        route!(self, "clear", |store| store.clear())
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64, DomainError> {
        route!(self, "increment", |store| store.increment(key, delta))
    }
}
