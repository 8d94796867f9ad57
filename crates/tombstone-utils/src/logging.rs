//! # Logging Utilities
//!
//! Diagnostics for the tombstone tools, using `tracing`.
//!
//! These logs describe what the tool is doing (attaching, fetching register
//! sets, reading memory). They are not the report: report lines go through
//! `tombstone_core::LogSink`. Console output goes to stderr so it never mixes
//! with a report written to stdout.
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: filter (e.g. `RUST_LOG=debug`, `RUST_LOG=tombstone_core=trace`)
//! - `TOMBSTONE_LOG_FORMAT`: `pretty` (default) or `json`
//! - `TOMBSTONE_LOG_FILE`: optional file to also log to (rotated daily). If it
//!   names a directory, a `<date>-tombstone.log` file is created inside it.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tombstone_utils::{LogFormat, LogLevel, init_logging_with_level};
//!
//! let _guard = init_logging_with_level(LogLevel::Debug, LogFormat::Pretty)
//!     .expect("Failed to initialize logging");
//! tracing::debug!("ready");
//! ```

use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Environment variable selecting the output format
pub const LOG_FORMAT_ENV: &str = "TOMBSTONE_LOG_FORMAT";

/// Environment variable naming an extra log file
pub const LOG_FILE_ENV: &str = "TOMBSTONE_LOG_FILE";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format (default)
    Pretty,
    /// JSON format, one object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {s}. Use 'pretty' or 'json'")),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level (default)
    Warn,
    /// Info level
    Info,
    /// Debug level
    Debug,
    /// Trace level (most verbose)
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!(
                "Unknown log level: {s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            )),
        }
    }
}

/// Keeps the file writer alive; drop it last so buffered lines are flushed.
#[derive(Debug)]
pub struct LoggingGuard
{
    _file: Option<WorkerGuard>,
}

/// Initialize logging from the environment
///
/// Format from `TOMBSTONE_LOG_FORMAT` (default pretty), filter from `RUST_LOG`
/// (default `warn`), optional file from `TOMBSTONE_LOG_FILE`.
///
/// ## Errors
///
/// Returns an error if the format variable is invalid or a global subscriber
/// is already installed.
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    let format = match env::var(LOG_FORMAT_ENV) {
        Ok(value) => LogFormat::from_str(&value).map_err(LoggingError::InvalidFormat)?,
        Err(_) => LogFormat::Pretty,
    };
    init_logging_with_level(LogLevel::Warn, format)
}

/// Initialize logging with an explicit default level and format
///
/// `RUST_LOG` still overrides `level` when it is set.
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    let default_level: Level = level.into();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
    let log_file = env::var(LOG_FILE_ENV).ok().map(PathBuf::from);

    let mut layers: Vec<BoxedLayer> = vec![console_layer(format).with_filter(env_filter.clone()).boxed()];

    let mut guard = None;
    if let Some(path) = log_file {
        let appender = if path.is_dir() {
            tracing_appender::rolling::never(&path, dated_log_file_name())
        } else {
            tracing_appender::rolling::daily(
                path.parent().unwrap_or_else(|| Path::new(".")),
                path.file_name().unwrap_or_default(),
            )
        };
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        layers.push(file_layer(writer, format).with_filter(env_filter).boxed());
        guard = Some(file_guard);
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;

    Ok(LoggingGuard { _file: guard })
}

/// Log file name used when `TOMBSTONE_LOG_FILE` is a directory
pub fn dated_log_file_name() -> String
{
    format!("{}-tombstone.log", Utc::now().format("%Y-%m-%d"))
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn console_layer(format: LogFormat) -> BoxedLayer
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(true)
            .with_writer(io::stderr)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(io::stderr)
            .boxed(),
    }
}

fn file_layer(writer: NonBlocking, format: LogFormat) -> BoxedLayer
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false) // No ANSI in files
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .boxed(),
    }
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),
}
