//! Structured logging setup via tracing-subscriber.
//!
//! `RUST_LOG` overrides the configured level when set.

use crate::config::LoggingConfig;
use crate::error::{ProtocolError, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber described by `config`.
///
/// # Errors
/// `ConfigError` when the log file cannot be opened or a subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string().to_lowercase()));

    let writer = make_writer(config)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(writer);

    let installed = if config.json_format {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| ProtocolError::ConfigError(format!("Failed to install logger: {e}")))
}

fn make_writer(config: &LoggingConfig) -> Result<BoxMakeWriter> {
    let file = match config.log_file_path {
        Some(ref path) => Some(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| ProtocolError::ConfigError(format!("Failed to open log file: {e}")))?,
        ),
        None => None,
    };

    Ok(match (config.log_to_console, file) {
        (true, Some(file)) => BoxMakeWriter::new(std::io::stderr.and(Mutex::new(file))),
        (false, Some(file)) => BoxMakeWriter::new(Mutex::new(file)),
        (_, None) => BoxMakeWriter::new(std::io::stderr),
    })
}
