//! Runtime logger configuration
//!
//! Built from the `[logger]` settings. An output that is switched off is
//! simply absent.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::level_filters::LevelFilter;

use crate::logger::error::LoggerError;

/// Line format of the log file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Json,
}

impl LogFormat {
    const ALL: [LogFormat; 3] = [LogFormat::Full, LogFormat::Compact, LogFormat::Json];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Full => "full",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        }
    }
}

impl FromStr for LogFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                LoggerError::format(format!(
                    "Invalid log format '{s}'. Valid formats are: full, compact, json"
                ))
            })
    }
}

/// stderr output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleOutput {
    /// Only honoured when stderr is a terminal
    pub colored: bool,
}

/// Log file output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutput {
    pub path: PathBuf,
    pub append: bool,
    pub format: LogFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    pub level: LevelFilter,
    pub console: Option<ConsoleOutput>,
    pub file: Option<FileOutput>,
}

impl LoggerConfig {
    /// # Errors
    /// - `level` is not a tracing level name
    /// - neither output is present
    /// - the file output has an empty path
    pub fn new(
        level: &str,
        console: Option<ConsoleOutput>,
        file: Option<FileOutput>,
    ) -> Result<Self, LoggerError> {
        let level = level.parse::<LevelFilter>().map_err(|_| {
            LoggerError::config(format!(
                "Invalid log level '{level}'. Valid levels are: trace, debug, info, warn, error"
            ))
        })?;

        if console.is_none() && file.is_none() {
            return Err(LoggerError::config(
                "At least one output (console or file) must be enabled",
            ));
        }

        if file
            .as_ref()
            .is_some_and(|file| file.path.as_os_str().is_empty())
        {
            return Err(LoggerError::config("Log file path cannot be empty"));
        }

        Ok(Self {
            level,
            console,
            file,
        })
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            console: Some(ConsoleOutput { colored: true }),
            file: None,
        }
    }
}
