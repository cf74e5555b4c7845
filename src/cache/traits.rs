//! Cache trait definition.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cache::{CacheError, CacheValue};

/// Trait for cache operations.
///
/// Both backends implement this trait so callers can hold an `Arc<dyn Cache>`
/// and switch storage through configuration alone. Every key argument is a
/// logical key; implementations namespace it with [`Cache::prefix`] before
/// touching storage, and key listings return the namespaced form.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Instance prefix all keys are namespaced under.
    fn prefix(&self) -> &str;

    /// Whether a live entry exists. Absence is `Ok(false)`, never an error.
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Fetch and decode the value stored under `key`.
    async fn get(&self, key: &str) -> Result<CacheValue, CacheError>;

    /// Store a value, replacing any existing one, with an optional time-to-live.
    async fn set(
        &self,
        key: &str,
        value: CacheValue,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError>;

    /// Replace the value of an existing key.
    ///
    /// Fails with [`CacheError::NotFound`] when the key is absent. The entry
    /// is rewritten without an expiration.
    async fn update(&self, key: &str, value: CacheValue) -> Result<(), CacheError>;

    /// Remove a key. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Set a new time-to-live on an existing key.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Remaining time-to-live; zero when the key never expires.
    async fn ttl(&self, key: &str) -> Result<Duration, CacheError>;

    /// List namespaced keys.
    ///
    /// - no patterns: every key owned by this instance
    /// - one pattern: keys whose logical part starts with it (literal prefix, no globbing)
    /// - several: each named key that exists, in argument order
    async fn keys(&self, patterns: &[&str]) -> Result<Vec<String>, CacheError>;

    /// Delete every key whose logical part starts with `pattern`.
    async fn empty_by_match(&self, pattern: &str) -> Result<(), CacheError>;

    /// Delete every key owned by this instance.
    async fn empty(&self) -> Result<(), CacheError>;
}

/// Typed helpers available on every [`Cache`].
#[async_trait]
pub trait CacheExt: Cache {
    /// Fetch a value and down-cast it to `T`.
    async fn get_as<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: TryFrom<CacheValue, Error = CacheError> + Send,
    {
        T::try_from(self.get(key).await?)
    }

    /// Fetch a value stored with [`CacheExt::set_serialized`].
    async fn get_deserialized<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: DeserializeOwned + Send,
    {
        self.get(key).await?.deserialize_into()
    }

    /// Store any serializable structure.
    async fn set_serialized<T>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError>
    where
        T: Serialize + Sync,
    {
        let value = CacheValue::from_serialize(value)?;
        self.set(key, value, ttl).await
    }
}

impl<C: Cache + ?Sized> CacheExt for C {}
