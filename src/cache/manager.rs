//! Cache manager that dispatches to the configured backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::embedded::EmbeddedCache;
use crate::cache::redis::RedisCache;
use crate::cache::sweeper::ExpirySweeper;
use crate::cache::{Cache, CacheError, CacheValue};
use crate::config::settings::{CacheBackend, CacheConfig};

/// Cache manager that provides access to the configured cache backend.
///
/// Owned by whoever composes the application and cloned where needed; all
/// clones share the same backend.
#[derive(Clone)]
pub struct CacheManager {
    backend: Arc<dyn Cache>,
    kind: CacheBackend,
    embedded: Option<EmbeddedCache>,
    config: CacheConfig,
}

impl CacheManager {
    /// Create a new cache manager with the given configuration.
    ///
    /// Fails with [`CacheError::Configuration`] for an unknown backend name
    /// and with [`CacheError::Connection`] when the backend cannot be opened.
    pub async fn new(config: &CacheConfig) -> Result<Self, CacheError> {
        let kind = config.backend_kind()?;

        let (backend, embedded): (Arc<dyn Cache>, Option<EmbeddedCache>) = match kind {
            CacheBackend::Embedded => {
                let cache = EmbeddedCache::open(&config.embedded, &config.prefix)?;
                (Arc::new(cache.clone()), Some(cache))
            }
            CacheBackend::Redis => (
                Arc::new(RedisCache::new(&config.redis, &config.prefix).await?),
                None,
            ),
        };

        tracing::info!(backend = %kind, prefix = %config.prefix, "Cache backend ready");

        Ok(Self {
            backend,
            kind,
            embedded,
            config: config.clone(),
        })
    }

    /// Get a reference to the cache backend.
    pub fn backend(&self) -> &Arc<dyn Cache> {
        &self.backend
    }

    pub fn backend_kind(&self) -> CacheBackend {
        self.kind
    }

    /// The embedded adapter, when that backend is selected.
    pub fn embedded(&self) -> Option<&EmbeddedCache> {
        self.embedded.as_ref()
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Build the expiry sweeper for an embedded backend with sweeping enabled.
    ///
    /// Returns `None` for Redis or when `sweep_enabled` is false. The sweeper
    /// is not started.
    pub async fn sweeper(&self) -> Result<Option<ExpirySweeper>, CacheError> {
        match &self.embedded {
            Some(cache) if self.config.embedded.sweep_enabled => {
                let sweeper =
                    ExpirySweeper::new(cache.clone(), &self.config.embedded.sweep_schedule).await?;
                Ok(Some(sweeper))
            }
            _ => Ok(None),
        }
    }
}

// ============================================================================
// Cache proxy methods
// ============================================================================

#[async_trait]
impl Cache for CacheManager {
    fn prefix(&self) -> &str {
        self.backend.prefix()
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.backend.exists(key).await
    }

    async fn get(&self, key: &str) -> Result<CacheValue, CacheError> {
        self.backend.get(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: CacheValue,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        self.backend.set(key, value, ttl).await
    }

    async fn update(&self, key: &str, value: CacheValue) -> Result<(), CacheError> {
        self.backend.update(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.backend.delete(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        self.backend.expire(key, ttl).await
    }

    async fn ttl(&self, key: &str) -> Result<Duration, CacheError> {
        self.backend.ttl(key).await
    }

    async fn keys(&self, patterns: &[&str]) -> Result<Vec<String>, CacheError> {
        self.backend.keys(patterns).await
    }

    async fn empty_by_match(&self, pattern: &str) -> Result<(), CacheError> {
        self.backend.empty_by_match(pattern).await
    }

    async fn empty(&self) -> Result<(), CacheError> {
        self.backend.empty().await
    }
}
