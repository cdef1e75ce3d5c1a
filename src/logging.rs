use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ConsoleConfig;

/// Configuration for the logging system
pub struct LogConfig {
    /// Directory where log files will be stored
    pub log_dir: PathBuf,
    /// Prefix for log file names
    pub file_prefix: String,
    /// Maximum number of rotated log files to keep
    pub max_files: usize,
    pub log_to_file: bool,
    /// Filter used when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: ConsoleConfig::log_dir(),
            file_prefix: "iland-console".to_string(),
            max_files: 5,
            log_to_file: false,
            log_level: "info".to_string(),
        }
    }
}

impl LogConfig {
    pub fn from_console_config(config: &ConsoleConfig) -> Self {
        Self {
            max_files: config.log_max_files,
            log_to_file: config.log_to_file,
            log_level: config.log_level.as_str().to_string(),
            ..Self::default()
        }
    }
}

/// Initialize logging to stderr, and to a daily-rotated file when enabled.
///
/// # Log Targets
/// - `api::auth` - token acquisition and renewal
/// - `api::request` - REST calls
/// - `api::events` - event socket lifecycle
/// - `api::task` - task tracking
/// - `console` - config loading and event relaying
/// - `main` - application lifecycle
///
/// # Example
/// ```bash
/// RUST_LOG=api=debug,console=info iland-console events
/// ```
pub fn init_logging(config: LogConfig) -> Result<LogGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // stdout carries command output, so human-readable logs go to stderr
    fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_line_number(true)
    }

    let worker_guard = if config.log_to_file {
        std::fs::create_dir_all(&config.log_dir).context("Failed to create log directory")?;

        let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
            .rotation(tracing_appender::rolling::Rotation::DAILY)
            .filename_prefix(&config.file_prefix)
            .filename_suffix("log")
            .max_log_files(config.max_files)
            .build(&config.log_dir)
            .context("Failed to create file appender")?;
        let (non_blocking_file, worker_guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = fmt::layer()
            .compact()
            .with_writer(non_blocking_file)
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(stderr_layer())
            .try_init()
            .context("Failed to install tracing subscriber")?;

        Some(worker_guard)
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer())
            .try_init()
            .context("Failed to install tracing subscriber")?;

        None
    };

    tracing::debug!(
        target: "main",
        log_dir = %config.log_dir.display(),
        log_to_file = config.log_to_file,
        log_level = %config.log_level,
        "Logging system initialized"
    );

    Ok(LogGuard {
        _worker_guard: worker_guard,
    })
}

/// Keeps the file writer alive; buffered lines are flushed when dropped
pub struct LogGuard {
    _worker_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        tracing::debug!(target: "main", "Flushing logs before shutdown");
    }
}
