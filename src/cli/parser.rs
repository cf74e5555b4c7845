//! CLI argument parsing with clap
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, arguments, and their documentation.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Environment;

// Include shadow-rs generated build information
use shadow_rs::shadow;
shadow!(build);

/// Namespaced key-value cache over sled or Redis
#[derive(Parser, Debug)]
#[command(name = "keyspace")]
#[command(about = "Namespaced key-value cache over an embedded database or Redis")]
#[command(long_about = "
Keyspace stores typed values under a namespace prefix in either a local
embedded database or a Redis server. The backend is selected through
configuration, every command works the same way on both.

EXAMPLES:
    # Store a string for one minute
    keyspace set session:42 alice --ttl 60

    # Store structured data
    keyspace set user:42 '{\"name\": \"alice\", \"admin\": true}' --json

    # Read it back
    keyspace get user:42

    # List every key starting with 'user:'
    keyspace keys user:

    # Remove all of them
    keyspace empty --match user:

    # Use Redis configured for production
    keyspace --env production keys
")]
#[command(version = build::CLAP_LONG_VERSION)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    ///
    /// Load this single TOML file instead of the layered configuration
    /// directory. The file must exist and be readable.
    ///
    /// Example: --config /etc/keyspace/production.toml
    #[arg(short, long, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection
    ///
    /// Selects which `{environment}.toml` overlay is loaded, overriding
    /// KEYSPACE_APP_ENV.
    ///
    /// Available values: development (dev), test, staging (stage), production (prod)
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Enable verbose logging
    ///
    /// Increases log output to debug level. Cannot be used with --quiet.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-error output
    ///
    /// Reduces log output to error level only. Cannot be used with --verbose.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Print the value stored under KEY
    Get {
        #[arg(value_parser = super::validation::validate_key)]
        key: String,
    },
    /// Store VALUE under KEY, replacing any previous value
    ///
    /// Examples:
    ///   keyspace set greeting hello
    ///   keyspace set counter 3 --json
    ///   keyspace set token abc --ttl 300
    Set {
        #[arg(value_parser = super::validation::validate_key)]
        key: String,

        value: String,

        /// Expire the entry after this many seconds
        #[arg(long, value_name = "SECS", value_parser = super::validation::validate_seconds)]
        ttl: Option<u64>,

        /// Parse VALUE as JSON instead of storing it as a string
        #[arg(long)]
        json: bool,
    },
    /// Replace the value of an existing KEY
    ///
    /// Fails when KEY does not exist. Any expiration on the entry is removed.
    Update {
        #[arg(value_parser = super::validation::validate_key)]
        key: String,

        value: String,

        /// Parse VALUE as JSON instead of storing it as a string
        #[arg(long)]
        json: bool,
    },
    /// Remove KEY (succeeds when it is already absent)
    Delete {
        #[arg(value_parser = super::validation::validate_key)]
        key: String,
    },
    /// Print whether KEY exists
    Exists {
        #[arg(value_parser = super::validation::validate_key)]
        key: String,
    },
    /// Set a new time-to-live on an existing KEY
    Expire {
        #[arg(value_parser = super::validation::validate_key)]
        key: String,

        #[arg(value_name = "SECS", value_parser = super::validation::validate_seconds)]
        seconds: u64,
    },
    /// Print the remaining time-to-live of KEY
    Ttl {
        #[arg(value_parser = super::validation::validate_key)]
        key: String,
    },
    /// List keys
    ///
    /// Without arguments every key of this namespace is listed. A single
    /// PATTERN lists keys starting with it (no wildcards). Several arguments
    /// list those of the named keys that exist.
    Keys {
        #[arg(value_name = "PATTERN")]
        patterns: Vec<String>,
    },
    /// Delete every key of this namespace, or only those starting with --match
    Empty {
        #[arg(long = "match", value_name = "PATTERN")]
        pattern: Option<String>,
    },
    /// Remove expired entries now (embedded backend only)
    Purge,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_help_flag() {
        let err = Cli::try_parse_from(["keyspace", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_flag() {
        let err = Cli::try_parse_from(["keyspace", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_command_required() {
        assert!(Cli::try_parse_from(["keyspace"]).is_err());
    }

    #[test]
    fn test_set_with_options() {
        let cli =
            Cli::try_parse_from(["keyspace", "set", "user:1", "{\"a\":1}", "--ttl", "30", "--json"])
                .unwrap();
        assert_eq!(
            cli.command,
            Commands::Set {
                key: "user:1".to_string(),
                value: "{\"a\":1}".to_string(),
                ttl: Some(30),
                json: true,
            }
        );
    }

    #[test]
    fn test_set_rejects_zero_ttl() {
        assert!(Cli::try_parse_from(["keyspace", "set", "k", "v", "--ttl", "0"]).is_err());
    }

    #[test]
    fn test_keys_accepts_any_number_of_patterns() {
        let cli = Cli::try_parse_from(["keyspace", "keys"]).unwrap();
        assert_eq!(cli.command, Commands::Keys { patterns: vec![] });

        let cli = Cli::try_parse_from(["keyspace", "keys", "a", "b"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Keys {
                patterns: vec!["a".to_string(), "b".to_string()]
            }
        );
    }

    #[test]
    fn test_empty_match_flag() {
        let cli = Cli::try_parse_from(["keyspace", "empty", "--match", "user:"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Empty {
                pattern: Some("user:".to_string())
            }
        );
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["keyspace", "--env", "prod", "-v", "purge"]).unwrap();
        assert_eq!(cli.env, Some(Environment::Production));
        assert!(cli.verbose);
        assert_eq!(cli.command, Commands::Purge);
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        let result = Cli::try_parse_from(["keyspace", "-v", "-q", "keys"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ArgumentConflict
        );
    }

    #[test]
    fn test_missing_config_file_rejected() {
        let result = Cli::try_parse_from(["keyspace", "--config", "/no/such/file.toml", "keys"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_env_aliases() {
        let cli = Cli::try_parse_from(["keyspace", "--env", "stage", "keys"]).unwrap();
        assert_eq!(cli.env, Some(Environment::Staging));
        assert!(Cli::try_parse_from(["keyspace", "--env", "qa", "keys"]).is_err());
    }
}
