//! Cache error types.

use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The key is absent (or expired) where the operation requires it.
    #[error("Key not found: {key}")]
    NotFound { key: String },

    /// The stored envelope is malformed or from an incompatible format version.
    #[error("Codec error: {0}")]
    Codec(String),

    /// The decoded envelope belongs to a different key than the one requested.
    #[error("Integrity error: expected key {expected}, found {found}")]
    Integrity { expected: String, found: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Cache connection failed: {0}")]
    Connection(String),

    #[error("Cache configuration error: {0}")]
    Configuration(String),

    /// A stored value could not be converted into the type the caller asked for.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl CacheError {
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Wrap a backend failure with the operation that produced it.
    pub fn storage(operation: &str, err: impl std::fmt::Display) -> Self {
        Self::Storage(format!("{operation} failed: {err}"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
