//! Configuration validation logic
//!
//! This module provides validation methods for all configuration structures
//! to ensure configuration values are within acceptable ranges and formats.

use crate::config::error::ConfigError;
use crate::config::settings::{
    CacheBackend, CacheConfig, EmbeddedCacheConfig, FileSettings, LoggerSettings,
    RedisCacheConfig, Settings,
};

/// Valid log levels
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid log formats
const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

/// Accepted Redis URL schemes
const VALID_REDIS_SCHEMES: &[&str] = &["redis://", "rediss://", "unix://"];

/// Characters that would turn a prefix into a glob on the Redis backend
const PREFIX_FORBIDDEN_CHARS: &[char] = &['*', '?', '[', ']'];

impl EmbeddedCacheConfig {
    /// Validate embedded cache configuration
    ///
    /// # Validation Rules
    /// - Directory must not be empty unless the database is temporary
    /// - Batch size must be greater than 0
    /// - Sweep schedule must not be empty when the sweeper is enabled
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.temporary && self.directory.trim().is_empty() {
            return Err(ConfigError::validation(
                "cache.embedded.directory",
                "Directory is required unless the cache is temporary.",
            ));
        }

        if self.batch_size == 0 {
            return Err(ConfigError::validation(
                "cache.embedded.batch_size",
                "Batch size must be greater than 0.",
            ));
        }

        if self.sweep_enabled && self.sweep_schedule.trim().is_empty() {
            return Err(ConfigError::validation(
                "cache.embedded.sweep_schedule",
                "Sweep schedule is required when the sweeper is enabled.",
            ));
        }

        Ok(())
    }
}

impl RedisCacheConfig {
    /// Validate redis cache configuration
    ///
    /// # Validation Rules
    /// - URL must use one of the redis://, rediss:// or unix:// schemes
    /// - Pool size, scan count and batch size must be greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_REDIS_SCHEMES
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
        {
            return Err(ConfigError::ValidationError {
                field: "cache.redis.url".to_string(),
                message: format!(
                    "Invalid redis URL '{}'. Expected one of: {}",
                    self.url,
                    VALID_REDIS_SCHEMES.join(", ")
                ),
            });
        }

        if self.pool_size == 0 {
            return Err(ConfigError::validation(
                "cache.redis.pool_size",
                "Pool size must be greater than 0.",
            ));
        }

        if self.scan_count == 0 {
            return Err(ConfigError::validation(
                "cache.redis.scan_count",
                "Scan count must be greater than 0.",
            ));
        }

        if self.batch_size == 0 {
            return Err(ConfigError::validation(
                "cache.redis.batch_size",
                "Batch size must be greater than 0.",
            ));
        }

        Ok(())
    }
}

impl CacheConfig {
    /// Validate cache configuration
    ///
    /// Only the section of the selected backend is checked, so a default
    /// redis section never blocks an embedded deployment.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.is_empty() {
            return Err(ConfigError::validation(
                "cache.prefix",
                "Prefix must not be empty.",
            ));
        }

        if self.prefix.contains(PREFIX_FORBIDDEN_CHARS) {
            return Err(ConfigError::ValidationError {
                field: "cache.prefix".to_string(),
                message: format!(
                    "Prefix '{}' must not contain any of: * ? [ ]",
                    self.prefix
                ),
            });
        }

        let backend = self
            .backend_kind()
            .map_err(|e| ConfigError::validation("cache.backend".to_string(), e.to_string()))?;

        match backend {
            CacheBackend::Embedded => self.embedded.validate(),
            CacheBackend::Redis => self.redis.validate(),
        }
    }
}

impl FileSettings {
    /// Validate file settings
    fn validate(&self) -> Result<(), ConfigError> {
        // If file logging is enabled, path must not be empty
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        Ok(())
    }
}

impl LoggerSettings {
    /// Validate logger settings
    ///
    /// # Validation Rules
    /// - Log level must be one of: trace, debug, info, warn, error
    /// - If file logging is enabled, path must not be empty
    /// - Log format must be one of: full, compact, json
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        self.file.validate()?;

        Ok(())
    }
}

impl Settings {
    /// Validate all configuration settings
    ///
    /// This method validates all sub-configurations and returns the first
    /// validation error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logger.validate()?;
        self.cache.validate()?;
        Ok(())
    }
}
