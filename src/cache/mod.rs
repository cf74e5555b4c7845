//! Namespaced key-value cache with interchangeable storage backends.
//!
//! Two adapters implement the same [`Cache`] contract:
//! - [`EmbeddedCache`], a local sled database storing expiry next to each record
//! - [`RedisCache`], a Redis server reached through a bb8 pool
//!
//! Every logical key is stored under `prefix:key`, so several instances with
//! different prefixes can share one store. Values are [`CacheValue`]s wrapped
//! in a versioned envelope that also records the physical key it was written
//! under.
//!
//! # Configuration
//!
//! ```toml
//! [cache]
//! backend = "embedded"  # or "redis"
//! prefix = "keyspace"
//!
//! [cache.embedded]
//! directory = "tmp/keyspace"
//! batch_size = 10000
//! sweep_schedule = "0 0 0 * * *"
//!
//! [cache.redis]
//! url = "redis://127.0.0.1:6379"
//! pool_size = 10
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let manager = CacheManager::new(&settings.cache).await?;
//! manager.set("session:42", CacheValue::from("alice"), Some(Duration::from_secs(60))).await?;
//! let user: String = manager.get_as("session:42").await?;
//! ```

pub mod embedded;
pub mod envelope;
mod error;
mod manager;
pub mod namespace;
pub mod redis;
pub mod sweeper;
mod traits;
mod value;

pub use embedded::EmbeddedCache;
pub use error::CacheError;
pub use manager::CacheManager;
pub use self::redis::{RedisCache, RedisPool};
pub use sweeper::ExpirySweeper;
pub use traits::{Cache, CacheExt};
pub use value::CacheValue;

// Re-export config types
pub use crate::config::settings::{
    CacheBackend, CacheConfig, EmbeddedCacheConfig, RedisCacheConfig,
};
