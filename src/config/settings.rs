//! Configuration settings structures for keyspace
//!
//! This module defines all configuration structures that can be loaded from
//! TOML files and environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::CacheError;
use crate::config::error::ConfigError;
use crate::logger::{ConsoleOutput, FileOutput, LogFormat, LoggerConfig};

// ============================================================================
// Default value functions
// ============================================================================

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs/keyspace.log".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_cache_backend() -> String {
    "embedded".to_string()
}

fn default_cache_prefix() -> String {
    "keyspace".to_string()
}

fn default_cache_directory() -> String {
    "tmp/keyspace".to_string()
}

fn default_embedded_batch_size() -> usize {
    10_000
}

fn default_sweep_schedule() -> String {
    // sec min hour day-of-month month day-of-week: daily at midnight
    "0 0 0 * * *".to_string()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_redis_pool_size() -> u32 {
    10
}

fn default_redis_connection_timeout() -> u64 {
    5
}

fn default_redis_scan_count() -> usize {
    1000
}

fn default_redis_batch_size() -> usize {
    1000
}

// ============================================================================
// Logger Settings
// ============================================================================

/// Console output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    /// Whether console output is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether to use colored output
    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            colored: default_true(),
        }
    }
}

/// File output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    /// Whether file output is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Path to the log file
    #[serde(default = "default_log_path")]
    pub path: String,

    /// Whether to append to existing file
    #[serde(default = "default_true")]
    pub append: bool,

    /// Log format: "full", "compact", or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: default_true(),
            format: default_log_format(),
        }
    }
}

/// Logger configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Console output settings
    #[serde(default)]
    pub console: ConsoleSettings,

    /// File output settings
    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    /// Build the runtime logger configuration, dropping disabled outputs
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let console = self.console.enabled.then_some(ConsoleOutput {
            colored: self.console.colored,
        });

        let file = if self.file.enabled {
            let format = self
                .file
                .format
                .parse::<LogFormat>()
                .map_err(|e| ConfigError::ValidationError {
                    field: "logger.file.format".to_string(),
                    message: e.to_string(),
                })?;
            Some(FileOutput {
                path: PathBuf::from(self.file.path),
                append: self.file.append,
                format,
            })
        } else {
            None
        };

        LoggerConfig::new(&self.level, console, file).map_err(|e| ConfigError::ValidationError {
            field: "logger".to_string(),
            message: e.to_string(),
        })
    }
}

// ============================================================================
// Cache Configuration
// ============================================================================

/// Embedded (sled) cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedCacheConfig {
    /// Directory holding the database files
    #[serde(default = "default_cache_directory")]
    pub directory: String,

    /// Use a throwaway database at a fresh path, removed on drop; `directory` is ignored
    #[serde(default)]
    pub temporary: bool,

    /// Maximum number of deletions per batch in `empty` / `empty_by_match`
    #[serde(default = "default_embedded_batch_size")]
    pub batch_size: usize,

    /// Run the expiry sweeper
    #[serde(default = "default_true")]
    pub sweep_enabled: bool,

    /// Cron expression (with seconds) for the expiry sweeper
    #[serde(default = "default_sweep_schedule")]
    pub sweep_schedule: String,
}

impl Default for EmbeddedCacheConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_directory(),
            temporary: false,
            batch_size: default_embedded_batch_size(),
            sweep_enabled: default_true(),
            sweep_schedule: default_sweep_schedule(),
        }
    }
}

/// Redis cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisCacheConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_redis_connection_timeout")]
    pub connection_timeout: u64,

    /// COUNT hint passed to SCAN
    #[serde(default = "default_redis_scan_count")]
    pub scan_count: usize,

    /// Maximum number of keys per DEL in `empty` / `empty_by_match`
    #[serde(default = "default_redis_batch_size")]
    pub batch_size: usize,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            connection_timeout: default_redis_connection_timeout(),
            scan_count: default_redis_scan_count(),
            batch_size: default_redis_batch_size(),
        }
    }
}

/// Storage backend selected by `cache.backend`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    /// Local sled database
    Embedded,
    /// Remote Redis server
    Redis,
}

impl CacheBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheBackend::Embedded => "embedded",
            CacheBackend::Redis => "redis",
        }
    }
}

impl std::fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheBackend {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "embedded" => Ok(CacheBackend::Embedded),
            "redis" => Ok(CacheBackend::Redis),
            other => Err(CacheError::Configuration(format!(
                "Unknown cache backend '{other}'. Valid backends are: embedded, redis"
            ))),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache backend: "embedded" or "redis"
    #[serde(default = "default_cache_backend")]
    pub backend: String,

    /// Namespace prefix for every key of this cache instance
    #[serde(default = "default_cache_prefix")]
    pub prefix: String,

    /// Embedded cache settings
    #[serde(default)]
    pub embedded: EmbeddedCacheConfig,

    /// Redis cache settings
    #[serde(default)]
    pub redis: RedisCacheConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            prefix: default_cache_prefix(),
            embedded: EmbeddedCacheConfig::default(),
            redis: RedisCacheConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Parse the configured backend name
    pub fn backend_kind(&self) -> Result<CacheBackend, CacheError> {
        self.backend.parse()
    }
}

// ============================================================================
// Main Settings Structure
// ============================================================================

/// Complete application settings
///
/// This structure represents the entire configuration that can be loaded
/// from TOML files and environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Logger configuration
    #[serde(default)]
    pub logger: LoggerSettings,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}
