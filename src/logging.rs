//! Tracing subscriber setup: stderr plus a daily log file.

use crate::config_utils::get_logs_dir;
use crate::error::RelayError;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "info";
const LOG_FILE_PREFIX: &str = "drivetube.log";

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop, so the caller has to
/// keep it alive until shutdown.
pub fn init_logging(json: bool) -> Result<WorkerGuard, RelayError> {
    let logs_dir = get_logs_dir()?;
    fs::create_dir_all(&logs_dir)?;

    let file_appender = tracing_appender::rolling::daily(&logs_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let file_layer = if json {
        fmt::layer().json().with_writer(file_writer).with_ansi(false).boxed()
    } else {
        fmt::layer().with_writer(file_writer).with_ansi(false).boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| RelayError::Unknown(format!("Failed to install log subscriber: {}", e)))?;

    tracing::debug!(dir = %logs_dir.display(), "file logging enabled");
    Ok(guard)
}

/// Shorten a bearer token for debug output.
pub fn token_preview(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    format!("{}...", prefix)
}
