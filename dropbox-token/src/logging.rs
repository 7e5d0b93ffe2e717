use anyhow::Result;
use chrono::Local;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing with file-based logging
/// Logs are written to ~/.config/dropbox-token/logs/dropbox-token-YYYY-MM-DD-HH-MM-SS.log
///
/// The console is reserved for prompts, so nothing is logged to stdout.
/// Drop the returned guard only after the last event has been recorded.
pub fn init_logging() -> Result<(PathBuf, WorkerGuard)> {
    // Get config directory
    let config_dir = dirs::config_dir()
        .ok_or(anyhow::anyhow!("Could not find config directory"))?
        .join("dropbox-token");

    // Create logs directory
    let logs_dir = config_dir.join("logs");
    std::fs::create_dir_all(&logs_dir)?;

    // Create timestamped log file name
    let timestamp = Local::now().format("%Y-%m-%d-%H-%M-%S");
    let log_filename = format!("dropbox-token-{}.log", timestamp);
    let log_path = logs_dir.join(&log_filename);

    // Create file appender (non-blocking so prompts never wait on disk)
    let file_appender = tracing_appender::rolling::never(&logs_dir, &log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Set up formatting layer for file output
    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false) // No ANSI codes in log file
        .with_target(true)
        .with_line_number(true);

    // Default to INFO, overridable with RUST_LOG
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Initialize subscriber; fails if one is already installed
    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()?;

    // The caller keeps the guard alive so buffered lines are flushed on exit
    Ok((log_path, guard))
}
