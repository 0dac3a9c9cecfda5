//! Logging system initialization
//!
//! Sets up tracing-based logging with file output to `<config dir>/app.log`
//! and rotation on every application startup keeping 9 historical files.

use crate::error::{RelayPanelError, Result, StringError};
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt};

/// Maximum number of historical log files to keep (app.log.1 through app.log.9)
const MAX_LOG_FILES: u8 = 9;

/// Initialize the logging system, writing to `log_dir/app.log`
///
/// Log level defaults to INFO but can be configured via `RUST_LOG` environment variable.
pub fn init_logging(log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)?;

    // Shift the previous sessions' logs before opening a fresh app.log
    let log_path = log_dir.join("app.log");
    rotate_logs_on_startup(&log_path)?;

    // Rotation is done on startup above, never by the appender
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix("app")
        .filename_suffix("log")
        .build(log_dir)
        .map_err(|e| RelayPanelError::ConfigError(Box::new(e)))?;

    // File output only; the release build has no console
    let subscriber = fmt()
        .with_writer(file_appender)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false) // Plain text in the log file
        .with_target(true) // Include target module
        .with_thread_ids(true) // Pulse workers log from their own threads
        .with_file(true) // Include file names
        .with_line_number(true) // Include line numbers
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| RelayPanelError::ConfigError(Box::new(e)))?;

    tracing::info!("RelayPanel v{} started", env!("CARGO_PKG_VERSION"));

    Ok(())
}

/// Shift `app.log` to `app.log.1`, `app.log.1` to `app.log.2` and so on,
/// deleting the oldest once `MAX_LOG_FILES` are kept
fn rotate_logs_on_startup(log_path: &Path) -> Result<()> {
    if !log_path.exists() {
        return Ok(());
    }

    let log_dir = log_path
        .parent()
        .ok_or_else(|| RelayPanelError::ConfigError(StringError::new("Invalid log path")))?;
    let log_name = log_path
        .file_name()
        .ok_or_else(|| RelayPanelError::ConfigError(StringError::new("Invalid log filename")))?
        .to_string_lossy();

    // Drop the oldest to make room
    let oldest_log = log_dir.join(format!("{log_name}.{MAX_LOG_FILES}"));
    if oldest_log.exists() {
        std::fs::remove_file(&oldest_log)?;
    }

    // Shift from the top down so nothing is overwritten
    for i in (1..MAX_LOG_FILES).rev() {
        let current_log = log_dir.join(format!("{log_name}.{i}"));
        if current_log.exists() {
            std::fs::rename(&current_log, log_dir.join(format!("{log_name}.{}", i + 1)))?;
        }
    }

    std::fs::rename(log_path, log_dir.join(format!("{log_name}.1")))?;
    Ok(())
}
