//! Logging manager with file rotation
//!
//! Provides dual-output logging:
//! - Console (stderr): INFO level with concise format
//! - File: configured level, rotated daily; old files are pruned by count
//!   with [`cleanup_old_logs`]

use crate::config::{expand_tilde, LoggingSettings};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "dirbackup";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory for log files
    pub log_directory: PathBuf,
    /// Log level for file output (console always uses INFO)
    pub log_level: Level,
    /// Maximum number of log files to keep
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::from_settings(&LoggingSettings::default())
    }
}

impl LoggingConfig {
    /// Create from the `[logging]` table of the configuration file
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        Self {
            log_directory: settings.directory.clone(),
            log_level: parse_level(&settings.level),
            max_files: settings.max_files as usize,
        }
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize logging with console and file outputs
///
/// Returns a guard that must be kept alive for the duration of the program.
/// When the guard is dropped, any remaining logs are flushed to disk.
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuard> {
    // Ensure log directory exists
    let log_dir = expand_tilde(&config.log_directory);
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

    // Create rolling file appender (daily rotation)
    let file_appender = RollingFileAppender::new(
        Rotation::DAILY,
        &log_dir,
        format!("{}.log", LOG_FILE_PREFIX),
    );

    // Create non-blocking writer for file output
    let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

    // File layer: DEBUG level, detailed format
    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false) // No colors in file
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .with_filter(level_filter(config.log_level));

    // Console layer: INFO level, concise format
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true) // Colors on console
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .with_filter(level_filter(Level::INFO));

    // Combine layers with base subscriber
    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .init();

    // Cleanup old log files
    cleanup_old_logs(&log_dir, config.max_files)?;

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}

/// Initialize simple console-only logging (for when config isn't available)
pub fn init_console_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();
}

/// Create a level filter for tracing layers
fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            EnvFilter::new(format!("dirbackup={}", level)).add_directive(LevelFilter::from_level(level).into())
        })
}

/// Cleanup old log files, keeping only the most recent N files
fn cleanup_old_logs(log_dir: &Path, max_files: usize) -> Result<()> {
    let mut log_files: Vec<_> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_name()
                .to_string_lossy()
                .starts_with(LOG_FILE_PREFIX)
                && entry.file_name()
                    .to_string_lossy()
                    .ends_with(".log")
        })
        .collect();

    // Sort by modification time (newest first)
    log_files.sort_by(|a, b| {
        let a_time = a.metadata().and_then(|m| m.modified()).ok();
        let b_time = b.metadata().and_then(|m| m.modified()).ok();
        b_time.cmp(&a_time)
    });

    // Remove files beyond the limit
    for file in log_files.into_iter().skip(max_files) {
        if let Err(e) = fs::remove_file(file.path()) {
            tracing::warn!("Failed to remove old log file {:?}: {}", file.path(), e);
        } else {
            tracing::debug!("Removed old log file: {:?}", file.path());
        }
    }

    Ok(())
}

/// Guard that keeps the logging system alive
///
/// When dropped, flushes any remaining logs to disk.
pub struct LogGuard {
    _file_guard: WorkerGuard,
}
