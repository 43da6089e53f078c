//! Rotating log system
//!
//! Logs to both console and rotating files in the log directory.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when RUST_LOG is unset
pub const DEFAULT_FILTER: &str = "info,visit_map=debug";

/// Log file prefix; rotation appends `.YYYY-MM-DD`
pub const LOG_FILE: &str = "visit_map.log";

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to create log directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Log directory {0:?} is not a directory")]
    NotADirectory(PathBuf),

    #[error("A global subscriber is already installed: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Make sure `log_dir` exists and is a directory
fn prepare_log_dir(log_dir: &Path) -> Result<(), LoggingError> {
    if log_dir.exists() {
        if !log_dir.is_dir() {
            return Err(LoggingError::NotADirectory(log_dir.to_path_buf()));
        }
        return Ok(());
    }
    std::fs::create_dir_all(log_dir).map_err(|source| LoggingError::CreateDir {
        path: log_dir.to_path_buf(),
        source,
    })
}

/// Initialize the logging system with rotating file logs.
///
/// Keep the returned guard alive for the life of the program; dropping it
/// flushes and stops the file writer.
pub fn init_logging(log_dir: &Path) -> Result<WorkerGuard, LoggingError> {
    prepare_log_dir(log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!("Logging initialized. Log directory: {:?}", log_dir);
    Ok(guard)
}
