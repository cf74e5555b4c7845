//! Keyspace Library
//!
//! A namespaced key-value cache with an embedded (sled) backend and a Redis
//! backend behind one async [`cache::Cache`] trait, plus the configuration,
//! logging and CLI layers of the `keyspace` binary.

use shadow_rs::shadow;
shadow!(build);

pub mod cache;
pub mod cli;
pub mod config;
pub mod logger;

pub use cache::{Cache, CacheError, CacheExt, CacheManager, CacheValue};

pub fn pkg_version() -> &'static str {
    build::PKG_VERSION
}

pub fn clap_long_version() -> &'static str {
    build::CLAP_LONG_VERSION
}
