//! Tracing subscriber setup
//!
//! Two layers: the console at the configured level (raised by `-v`), and a
//! per-run log file at debug level for this crate.

use crate::config::{LogFormat, LoggingConfig};
use chrono::{DateTime, Local};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Directive used for the log file
const FILE_FILTER: &str = "zimdown=debug";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to install subscriber: {0}")]
    Init(String),
}

/// `zimdown_<YYYYmmdd_HHMMSS>.log`
pub fn log_file_name(now: DateTime<Local>) -> String {
    format!("zimdown_{}.log", now.format("%Y%m%d_%H%M%S"))
}

/// Install the global subscriber. Returns the log file path when file
/// logging is enabled.
///
/// `RUST_LOG` overrides the console level when set.
pub fn init(config: &LoggingConfig, verbose: u8) -> Result<Option<PathBuf>, LoggingError> {
    let console_level = config.level.raised(verbose);
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_level.as_str()));

    let console: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Text => fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed(),
    };

    let mut layers = vec![console];

    let log_path = if config.file {
        let path = create_log_file_path(&config.log_dir)?;
        let file = File::create(&path)?;
        layers.push(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(EnvFilter::new(FILE_FILTER))
                .boxed(),
        );
        Some(path)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(log_path)
}

fn create_log_file_path(log_dir: &Path) -> Result<PathBuf, LoggingError> {
    fs::create_dir_all(log_dir)?;
    Ok(log_dir.join(log_file_name(Local::now())))
}
