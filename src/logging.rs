//! Logging setup for hosts embedding the monitor.
//!
//! Configures tracing with JSON output to stderr and, optionally, to a
//! daily rotating log file.

use crate::error::LoggingError;
use std::path::PathBuf;
use time::format_description::well_known::Rfc3339;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Default log directory relative to user's home
const LOG_DIR: &str = ".local/share/adaptive-perf-monitor";
/// Log file prefix
const LOG_FILE_PREFIX: &str = "monitor";
/// Maximum number of log files to retain
const MAX_LOG_FILES: usize = 3;

/// Where log output goes.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Also write rotating JSON logs into this directory.
    pub log_dir: Option<PathBuf>,
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: Option<String>,
}

impl LogOptions {
    pub fn with_file_output(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Write rotating logs under `~/.local/share/adaptive-perf-monitor`.
    pub fn with_default_file_output(self) -> Result<Self, LoggingError> {
        Ok(self.with_file_output(default_log_directory()?))
    }

    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = Some(filter.into());
        self
    }
}

/// Guard that keeps the non-blocking writers alive.
/// Must be held for the lifetime of the application.
pub struct LogGuard {
    _stderr_guard: WorkerGuard,
    _file_guard: Option<WorkerGuard>,
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `options.default_filter`, which
/// falls back to `info`.
pub fn init_logging(options: LogOptions) -> Result<LogGuard, LoggingError> {
    let (file_layer, file_guard) = match &options.log_dir {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir).map_err(|e| {
                LoggingError::DirectoryCreationFailed {
                    path: log_dir.display().to_string(),
                    source: e,
                }
            })?;

            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(MAX_LOG_FILES)
                .filename_prefix(LOG_FILE_PREFIX)
                .filename_suffix("log")
                .build(log_dir)
                .map_err(|e| LoggingError::AppenderCreationFailed(e.to_string()))?;

            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

            let layer = fmt::layer()
                .json()
                .with_timer(log_timer())
                .with_span_events(FmtSpan::CLOSE)
                .with_current_span(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(non_blocking_file);

            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let (non_blocking_stderr, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());

    let default_filter = options.default_filter.as_deref().unwrap_or("info");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let stderr_layer = fmt::layer()
        .json()
        .with_timer(log_timer())
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true)
        .with_writer(non_blocking_stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)?;

    Ok(LogGuard {
        _stderr_guard: stderr_guard,
        _file_guard: file_guard,
    })
}

/// RFC 3339 UTC timestamps for every log line.
fn log_timer() -> UtcTime<Rfc3339> {
    UtcTime::new(Rfc3339)
}

/// Default log directory under the user's home.
pub fn default_log_directory() -> Result<PathBuf, LoggingError> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| LoggingError::HomeDirectoryNotFound)?;

    Ok(PathBuf::from(home).join(LOG_DIR))
}
