//! Logging configuration using tracing
//!
//! Logs always go to stderr so that reports written to stdout (JSON, CSV)
//! stay machine-readable.

use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

/// Environment variable selecting the log format
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
/// Environment variable selecting the default log level
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Logging format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,
    /// JSON format for log aggregation
    Json,
    /// Compact format
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

impl LogFormat {
    /// Read `LOG_FORMAT`, falling back to pretty output
    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }
}

/// Read `LOG_LEVEL`, falling back to `default`
pub fn level_from_env(default: Level) -> Level {
    std::env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// Initialize logging with the specified format.
///
/// `RUST_LOG` directives, when set, override `default_level`. Fails if a
/// global subscriber is already installed.
pub fn init_logging(format: LogFormat, default_level: Level) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(false),
            )
            .try_init(),
    }
}

/// Initialize logging from `LOG_FORMAT` / `LOG_LEVEL`
pub fn init_logging_from_env() -> Result<(), TryInitError> {
    init_logging(LogFormat::from_env(), level_from_env(Level::INFO))
}
