//! Backtest configuration

use rust_decimal::Decimal;
use sentinel_core::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a backtest run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Starting capital in USD
    #[serde(default = "default_initial_capital")]
    pub initial_capital: Decimal,
    /// JSON observation file; synthetic data is generated when unset
    #[serde(default)]
    pub data_path: Option<PathBuf>,
    /// Optional filter for specific symbols
    #[serde(default)]
    pub symbol_filter: Option<Vec<String>>,
}

fn default_initial_capital() -> Decimal {
    Decimal::new(1_000_000, 0)
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: default_initial_capital(),
            data_path: None,
            symbol_filter: None,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_capital <= Decimal::ZERO {
            return Err(ConfigError::invalid("initial_capital", "must be positive"));
        }
        if self
            .symbol_filter
            .as_ref()
            .is_some_and(|symbols| symbols.is_empty())
        {
            return Err(ConfigError::invalid(
                "symbol_filter",
                "must name at least one symbol when set",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_is_valid() {
        let config = BacktestConfig::default();
        assert_eq!(config.initial_capital, dec!(1000000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_capital() {
        let config = BacktestConfig {
            initial_capital: Decimal::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "initial_capital"
        ));
    }

    #[test]
    fn test_rejects_empty_symbol_filter() {
        let config = BacktestConfig {
            symbol_filter: Some(vec![]),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
