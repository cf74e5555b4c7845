//! Deployment environment, selecting the `{environment}.toml` overlay
//!
//! The same type backs `--env` on the command line and `KEYSPACE_APP_ENV`.

use std::env::VarError;

use clap::ValueEnum;

use crate::config::error::ConfigError;

/// Variable naming the environment when `--env` is not given
pub const APP_ENV_VAR: &str = "KEYSPACE_APP_ENV";

/// Which overlay file is read on top of `default.toml`
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "test")]
    Test,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
}

impl Environment {
    /// Environment named by `KEYSPACE_APP_ENV`, development when unset.
    ///
    /// Unlike an absent variable, an unrecognised value is an error: loading
    /// the development overlay in production by accident is worse than failing.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(APP_ENV_VAR) {
            Ok(value) if value.trim().is_empty() => Ok(Self::default()),
            Ok(value) => Self::parse(&value),
            Err(VarError::NotPresent) => Ok(Self::default()),
            Err(VarError::NotUnicode(_)) => Err(ConfigError::EnvVarError(format!(
                "{APP_ENV_VAR} is not valid unicode"
            ))),
        }
    }

    /// Parse a name or alias, ignoring case.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        <Self as ValueEnum>::from_str(name.trim(), true).map_err(|_| {
            ConfigError::EnvVarError(format!(
                "{APP_ENV_VAR}: unknown environment '{name}', expected development, test, staging or production"
            ))
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    /// Overlay file inside the configuration directory.
    pub fn overlay_file(self) -> String {
        format!("{}.toml", self.name())
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names_and_aliases() {
        for (input, expected) in [
            ("development", Environment::Development),
            ("dev", Environment::Development),
            ("test", Environment::Test),
            ("stage", Environment::Staging),
            (" PROD ", Environment::Production),
            ("Production", Environment::Production),
        ] {
            assert_eq!(Environment::parse(input).unwrap(), expected, "{input}");
        }
    }

    #[test]
    fn test_parse_unknown_names_the_variable() {
        match Environment::parse("qa") {
            Err(ConfigError::EnvVarError(msg)) => {
                assert!(msg.contains(APP_ENV_VAR));
                assert!(msg.contains("'qa'"));
            }
            other => panic!("expected EnvVarError, got {other:?}"),
        }
    }

    #[test]
    fn test_overlay_file() {
        assert_eq!(Environment::default().overlay_file(), "development.toml");
        assert_eq!(Environment::Staging.overlay_file(), "staging.toml");
    }

    #[test]
    fn test_value_enum_names_match_overlays() {
        for env in Environment::value_variants() {
            let value = env.to_possible_value().unwrap();
            assert_eq!(value.get_name(), env.name());
        }
    }
}
