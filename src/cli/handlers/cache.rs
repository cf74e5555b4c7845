//! Cache command handler
//!
//! Runs one cache command against the configured backend and writes the
//! result to the given output.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, bail};

use crate::cache::{Cache, CacheManager, CacheValue};
use crate::cli::parser::Commands;

/// Handler for every cache subcommand
pub struct CacheCommandHandler {
    cache: CacheManager,
}

impl CacheCommandHandler {
    /// Create a new cache command handler
    pub fn new(cache: CacheManager) -> Self {
        Self { cache }
    }

    /// Execute `command`, writing human readable output to `out`
    ///
    /// # Errors
    /// - Cache errors (missing key, storage or connection failures)
    /// - Invalid `--json` values
    /// - `purge` on a backend other than embedded
    pub async fn execute<W: Write>(&self, command: &Commands, out: &mut W) -> anyhow::Result<()> {
        match command {
            Commands::Get { key } => {
                let value = self
                    .cache
                    .get(key)
                    .await
                    .with_context(|| format!("Failed to get '{key}'"))?;
                writeln!(out, "{value}")?;
            }
            Commands::Set {
                key,
                value,
                ttl,
                json,
            } => {
                let value = parse_value(value, *json)?;
                self.cache
                    .set(key, value, ttl.map(Duration::from_secs))
                    .await
                    .with_context(|| format!("Failed to set '{key}'"))?;
                writeln!(out, "OK")?;
            }
            Commands::Update { key, value, json } => {
                let value = parse_value(value, *json)?;
                self.cache
                    .update(key, value)
                    .await
                    .with_context(|| format!("Failed to update '{key}'"))?;
                writeln!(out, "OK")?;
            }
            Commands::Delete { key } => {
                self.cache
                    .delete(key)
                    .await
                    .with_context(|| format!("Failed to delete '{key}'"))?;
                writeln!(out, "OK")?;
            }
            Commands::Exists { key } => {
                let exists = self
                    .cache
                    .exists(key)
                    .await
                    .with_context(|| format!("Failed to check '{key}'"))?;
                writeln!(out, "{exists}")?;
            }
            Commands::Expire { key, seconds } => {
                self.cache
                    .expire(key, Duration::from_secs(*seconds))
                    .await
                    .with_context(|| format!("Failed to expire '{key}'"))?;
                writeln!(out, "OK")?;
            }
            Commands::Ttl { key } => {
                let ttl = self
                    .cache
                    .ttl(key)
                    .await
                    .with_context(|| format!("Failed to read ttl of '{key}'"))?;
                writeln!(out, "{}", format_ttl(ttl))?;
            }
            Commands::Keys { patterns } => {
                let patterns: Vec<&str> = patterns.iter().map(String::as_str).collect();
                let keys = self
                    .cache
                    .keys(&patterns)
                    .await
                    .context("Failed to list keys")?;
                for key in keys {
                    writeln!(out, "{key}")?;
                }
            }
            Commands::Empty { pattern } => {
                match pattern {
                    Some(pattern) => self
                        .cache
                        .empty_by_match(pattern)
                        .await
                        .with_context(|| format!("Failed to empty keys matching '{pattern}'"))?,
                    None => self.cache.empty().await.context("Failed to empty cache")?,
                }
                writeln!(out, "OK")?;
            }
            Commands::Purge => {
                let Some(embedded) = self.cache.embedded() else {
                    bail!(
                        "purge is only available for the embedded backend (configured: {})",
                        self.cache.backend_kind()
                    );
                };
                let purged = embedded
                    .purge_expired()
                    .await
                    .context("Failed to purge expired entries")?;
                embedded.flush().await.context("Failed to flush")?;
                writeln!(out, "Purged {purged} expired entries")?;
            }
        }

        Ok(())
    }
}

/// Interpret a command line value, as JSON when `--json` was given
fn parse_value(raw: &str, json: bool) -> anyhow::Result<CacheValue> {
    if !json {
        return Ok(CacheValue::from(raw));
    }

    let parsed: serde_json::Value =
        serde_json::from_str(raw).with_context(|| format!("Invalid JSON value: {raw}"))?;
    Ok(CacheValue::from_json(parsed))
}

fn format_ttl(ttl: Duration) -> String {
    if ttl.is_zero() {
        "no expiry".to_string()
    } else {
        format!("{:.3}s", ttl.as_secs_f64())
    }
}
