//! Logger Module
//!
//! A logging system based on `tracing-subscriber` with support for:
//! - Console output on stderr with color control
//! - File output with multiple formats (Full, Compact, JSON)
//!
//! Console output goes to stderr so command results on stdout stay clean.

pub mod config;
pub mod error;

pub use config::*;
pub use error::LoggerError;

use std::fs::{self, File, OpenOptions};
use std::io::IsTerminal;
use std::sync::Mutex;

use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize the global subscriber with the given configuration
///
/// Fails if a global subscriber is already installed.
pub fn init_logger(config: LoggerConfig) -> Result<(), LoggerError> {
    let filter = EnvFilter::default().add_directive(config.level.into());

    // The file layer must sit below the console layer, otherwise span fields
    // formatted with ANSI codes by the console layer leak into the file.
    // See: https://github.com/tokio-rs/tracing/issues/1817
    let file = config.file.as_ref().map(file_layer).transpose()?;

    let console_layer = config.console.map(|console| {
        let use_ansi = console.colored && std::io::stderr().is_terminal();
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(use_ansi)
            .with_target(true)
            .with_level(true)
    });

    tracing_subscriber::registry()
        .with(file)
        .with(console_layer)
        .with(filter)
        .try_init()
        .map_err(|e| LoggerError::init(e.to_string()))
}

fn file_layer(output: &FileOutput) -> Result<BoxedLayer, LoggerError> {
    let writer = Mutex::new(open_log_file(output)?);

    let layer = match output.format {
        LogFormat::Full => fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .compact()
            .with_writer(writer)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .with_ansi(false)
            .json()
            .with_writer(writer)
            .boxed(),
    };

    Ok(layer)
}

fn open_log_file(output: &FileOutput) -> Result<File, LoggerError> {
    if let Some(parent) = output.path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(output.append)
        .truncate(!output.append)
        .open(&output.path)?;

    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_log_file_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let output = FileOutput {
            path: dir.path().join("nested/deeper/keyspace.log"),
            append: true,
            format: LogFormat::Json,
        };

        open_log_file(&output).unwrap();
        assert!(output.path.exists());
    }

    #[test]
    fn test_open_log_file_truncates_without_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keyspace.log");
        fs::write(&path, "previous run\n").unwrap();

        let output = FileOutput {
            path: path.clone(),
            append: false,
            format: LogFormat::Compact,
        };
        open_log_file(&output).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_second_init_fails() {
        let config = LoggerConfig {
            level: tracing::level_filters::LevelFilter::OFF,
            ..Default::default()
        };
        // another test may have installed the global subscriber first
        let _ = init_logger(config.clone());
        assert!(matches!(init_logger(config), Err(LoggerError::Init { .. })));
    }
}
