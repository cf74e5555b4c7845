//! Configuration error types
//!
//! Every failure while locating, parsing or validating settings surfaces as a
//! [`ConfigError`] so the CLI can report it before any cache is opened.

use thiserror::Error;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Validation error with field and message
    #[error("Validation error: {field} - {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// The validation error message
        message: String,
    },

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVarError(String),

    /// Mutual exclusivity error
    #[error("Mutual exclusivity error: {0}")]
    MutualExclusivityError(String),

    /// Generic configuration error from config crate
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

impl ConfigError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        ConfigError::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new file not found error
    pub fn file_not_found<S: Into<String>>(path: S) -> Self {
        ConfigError::FileNotFound(path.into())
    }

    /// Create a new mutual exclusivity error
    pub fn mutual_exclusivity<S: Into<String>>(message: S) -> Self {
        ConfigError::MutualExclusivityError(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ConfigError::validation("cache.prefix", "Prefix must not be empty.");
        assert_eq!(
            err.to_string(),
            "Validation error: cache.prefix - Prefix must not be empty."
        );
    }

    #[test]
    fn test_helpers() {
        assert!(matches!(
            ConfigError::file_not_found("config/default.toml"),
            ConfigError::FileNotFound(path) if path == "config/default.toml"
        ));
        assert!(matches!(
            ConfigError::mutual_exclusivity("pick one"),
            ConfigError::MutualExclusivityError(_)
        ));
    }
}
