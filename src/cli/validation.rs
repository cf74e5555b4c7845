//! CLI argument validation functions
//!
//! This module provides custom validation functions for CLI arguments
//! that go beyond what clap can validate automatically.

use std::fs;
use std::path::PathBuf;

/// Validate that a file path is accessible (exists and is readable)
pub fn validate_config_file_path(path_str: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(format!("Configuration file does not exist: '{}'", path_str));
    }

    if !path.is_file() {
        return Err(format!("Configuration path is not a file: '{}'", path_str));
    }

    match fs::File::open(&path) {
        Ok(_) => Ok(path),
        Err(e) => Err(format!(
            "Cannot read configuration file '{}': {}",
            path_str, e
        )),
    }
}

/// Validate a logical key: non-empty, no surrounding whitespace
pub fn validate_key(key: &str) -> Result<String, String> {
    if key.is_empty() {
        return Err("Key cannot be empty".to_string());
    }

    if key.trim() != key {
        return Err(format!(
            "Key cannot start or end with whitespace: '{}'",
            key
        ));
    }

    Ok(key.to_string())
}

/// Validate a time-to-live given in whole seconds
pub fn validate_seconds(secs_str: &str) -> Result<u64, String> {
    let secs: u64 = secs_str.parse().map_err(|_| {
        format!(
            "Seconds must be a positive whole number, got: '{}'",
            secs_str
        )
    })?;

    if secs == 0 {
        return Err("Seconds must be greater than 0".to_string());
    }

    Ok(secs)
}
