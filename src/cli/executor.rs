//! Command executor for dispatching CLI commands
//!
//! This module provides the main entry point for executing CLI commands
//! after parsing and configuration loading.

use std::io::Write;

use anyhow::Context;

use super::handlers::CacheCommandHandler;
use super::parser::Cli;
use crate::cache::CacheManager;
use crate::config::settings::Settings;

/// Execute a CLI command with the given settings
///
/// Opens the configured backend, runs the command and writes its output to
/// `out`. The backend is dropped (and an embedded database flushed) before
/// returning.
///
/// # Errors
/// Returns errors from opening the backend or from the command handler
pub async fn execute_command<W: Write>(
    cli: &Cli,
    settings: Settings,
    out: &mut W,
) -> anyhow::Result<()> {
    let manager = CacheManager::new(&settings.cache)
        .await
        .with_context(|| format!("Failed to open {} cache", settings.cache.backend))?;

    tracing::debug!(command = ?cli.command, "Executing command");
    CacheCommandHandler::new(manager.clone())
        .execute(&cli.command, out)
        .await?;

    if let Some(embedded) = manager.embedded() {
        embedded.flush().await.context("Failed to flush cache")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn settings_in(dir: &TempDir) -> Settings {
        let mut settings = Settings::default();
        settings.cache.prefix = "test-app".to_string();
        settings.cache.embedded.directory = dir.path().to_string_lossy().into_owned();
        settings
    }

    #[tokio::test]
    async fn test_values_persist_between_invocations() {
        let dir = TempDir::new().unwrap();

        let cli = Cli::try_parse_from(["keyspace", "set", "counter", "7", "--json"]).unwrap();
        let mut out = Vec::new();
        execute_command(&cli, settings_in(&dir), &mut out)
            .await
            .unwrap();
        assert_eq!(out, b"OK\n");

        let cli = Cli::try_parse_from(["keyspace", "get", "counter"]).unwrap();
        let mut out = Vec::new();
        execute_command(&cli, settings_in(&dir), &mut out)
            .await
            .unwrap();
        assert_eq!(out, b"7\n");
    }

    #[tokio::test]
    async fn test_unknown_backend_fails_before_running() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings_in(&dir);
        settings.cache.backend = "memcached".to_string();

        let cli = Cli::try_parse_from(["keyspace", "keys"]).unwrap();
        let mut out = Vec::new();
        let err = execute_command(&cli, settings, &mut out)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("memcached"));
        assert!(out.is_empty());
    }
}
