use thiserror::Error;

/// Observation validation errors, raised at the data boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Empty symbol")]
    EmptySymbol,

    #[error("Non-positive {field} for {symbol}: {value}")]
    NonPositivePrice {
        symbol: String,
        field: &'static str,
        value: String,
    },

    #[error("Non-finite value in {field} for {symbol}")]
    NonFinite { symbol: String, field: &'static str },

    #[error("Duplicate observation for {symbol} at {timestamp}")]
    DuplicateObservation { symbol: String, timestamp: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Data-quality conditions the core resolves without failing.
///
/// These never surface as `Err`; they are named so log lines and reports can
/// say which fallback was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskCondition {
    /// Window shorter than required, value left undefined
    InsufficientData,
    /// Zero variance or zero VaR, resolved by a neutral default
    DegenerateInput,
    /// Drawdown beyond the configured limit, trading halted
    RiskBreach,
}

impl RiskCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCondition::InsufficientData => "insufficient_data",
            RiskCondition::DegenerateInput => "degenerate_input",
            RiskCondition::RiskBreach => "risk_breach",
        }
    }
}

impl std::fmt::Display for RiskCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
