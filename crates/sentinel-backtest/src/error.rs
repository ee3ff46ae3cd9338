//! Backtest error types

use sentinel_core::{ConfigError, ValidationError};
use thiserror::Error;

/// Backtest result type alias
pub type Result<T> = std::result::Result<T, BacktestError>;

/// Backtest errors
#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Invalid observation: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("No observations to replay")]
    NoData,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for BacktestError {
    fn from(err: serde_json::Error) -> Self {
        BacktestError::SerializationError(err.to_string())
    }
}
