//! Configuration types shared across crates

use crate::error::ConfigError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Allowed band for hedge ratios, `min <= 1 <= max`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HedgeRatioBounds {
    pub min: f64,
    pub max: f64,
}

impl HedgeRatioBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, ratio: f64) -> f64 {
        ratio.max(self.min).min(self.max)
    }

    pub fn contains(&self, ratio: f64) -> bool {
        ratio >= self.min && ratio <= self.max
    }
}

impl Default for HedgeRatioBounds {
    fn default() -> Self {
        Self { min: 0.5, max: 1.5 }
    }
}

/// Risk limits for a run. Immutable once the engine is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskParameters {
    /// Number of returns the volatility model is fit on
    #[serde(default = "default_lookback_window")]
    pub lookback_window: usize,
    /// VaR confidence level, e.g. 0.95
    #[serde(default = "default_var_confidence")]
    pub var_confidence: f64,
    /// Peak-to-trough drawdown that halts trading
    #[serde(default = "default_max_drawdown_fraction")]
    pub max_drawdown_fraction: Decimal,
    /// Fraction of capital risked per trade
    #[serde(default = "default_risk_per_trade_fraction")]
    pub risk_per_trade_fraction: Decimal,
    #[serde(default)]
    pub hedge_ratio_bounds: HedgeRatioBounds,
    /// Hard cap on position size as a fraction of capital
    #[serde(default = "default_max_position_fraction")]
    pub max_position_fraction: Decimal,
}

fn default_lookback_window() -> usize {
    30
}

fn default_var_confidence() -> f64 {
    0.95
}

fn default_max_drawdown_fraction() -> Decimal {
    dec!(0.20)
}

fn default_risk_per_trade_fraction() -> Decimal {
    dec!(0.01)
}

fn default_max_position_fraction() -> Decimal {
    dec!(0.10)
}

impl Default for RiskParameters {
    fn default() -> Self {
        Self {
            lookback_window: default_lookback_window(),
            var_confidence: default_var_confidence(),
            max_drawdown_fraction: default_max_drawdown_fraction(),
            risk_per_trade_fraction: default_risk_per_trade_fraction(),
            hedge_ratio_bounds: HedgeRatioBounds::default(),
            max_position_fraction: default_max_position_fraction(),
        }
    }
}

impl RiskParameters {
    /// Check every field against its allowed range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lookback_window < 2 {
            return Err(ConfigError::invalid("lookback_window", "must be at least 2"));
        }
        if !(self.var_confidence > 0.0 && self.var_confidence < 1.0) {
            return Err(ConfigError::invalid(
                "var_confidence",
                format!("must be in (0, 1), got {}", self.var_confidence),
            ));
        }
        for (field, value) in [
            ("max_drawdown_fraction", self.max_drawdown_fraction),
            ("risk_per_trade_fraction", self.risk_per_trade_fraction),
        ] {
            if value <= Decimal::ZERO || value >= Decimal::ONE {
                return Err(ConfigError::invalid(
                    field,
                    format!("must be in (0, 1), got {}", value),
                ));
            }
        }
        if self.max_position_fraction <= Decimal::ZERO || self.max_position_fraction > Decimal::ONE {
            return Err(ConfigError::invalid(
                "max_position_fraction",
                format!("must be in (0, 1], got {}", self.max_position_fraction),
            ));
        }
        let bounds = self.hedge_ratio_bounds;
        if !(bounds.min.is_finite() && bounds.max.is_finite())
            || bounds.min > 1.0
            || bounds.max < 1.0
        {
            return Err(ConfigError::invalid(
                "hedge_ratio_bounds",
                format!("need min <= 1 <= max, got ({}, {})", bounds.min, bounds.max),
            ));
        }
        Ok(())
    }
}

/// Entry thresholds for the basis/funding strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Absolute basis that triggers an entry
    #[serde(default = "default_basis_threshold")]
    pub basis_threshold: Decimal,
    /// Absolute funding rate that triggers an entry
    #[serde(default = "default_funding_threshold")]
    pub funding_threshold: Decimal,
    /// Hedge drift tolerated before an existing position is re-hedged
    #[serde(default = "default_hedge_rebalance_tolerance")]
    pub hedge_rebalance_tolerance: f64,
}

fn default_basis_threshold() -> Decimal {
    dec!(0.005)
}

fn default_funding_threshold() -> Decimal {
    dec!(0.0005)
}

fn default_hedge_rebalance_tolerance() -> f64 {
    0.05
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            basis_threshold: default_basis_threshold(),
            funding_threshold: default_funding_threshold(),
            hedge_rebalance_tolerance: default_hedge_rebalance_tolerance(),
        }
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.basis_threshold < Decimal::ZERO {
            return Err(ConfigError::invalid("basis_threshold", "must be non-negative"));
        }
        if self.funding_threshold < Decimal::ZERO {
            return Err(ConfigError::invalid("funding_threshold", "must be non-negative"));
        }
        if !(self.hedge_rebalance_tolerance >= 0.0) {
            return Err(ConfigError::invalid(
                "hedge_rebalance_tolerance",
                "must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Statistical backend used for volatility forecasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityModelKind {
    /// GARCH(1,1) quasi-maximum likelihood fit
    Garch,
    /// RiskMetrics exponentially weighted variance
    Ewma,
}

/// Volatility model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityConfig {
    #[serde(default = "default_model")]
    pub model: VolatilityModelKind,
    /// EWMA decay factor
    #[serde(default = "default_ewma_lambda")]
    pub ewma_lambda: f64,
    /// Search iterations allowed before a GARCH fit counts as non-converged
    #[serde(default = "default_garch_max_iterations")]
    pub garch_max_iterations: usize,
}

fn default_model() -> VolatilityModelKind {
    VolatilityModelKind::Garch
}

fn default_ewma_lambda() -> f64 {
    0.94
}

fn default_garch_max_iterations() -> usize {
    500
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            ewma_lambda: default_ewma_lambda(),
            garch_max_iterations: default_garch_max_iterations(),
        }
    }
}

impl VolatilityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.ewma_lambda > 0.0 && self.ewma_lambda < 1.0) {
            return Err(ConfigError::invalid("ewma_lambda", "must be in (0, 1)"));
        }
        if self.garch_max_iterations == 0 {
            return Err(ConfigError::invalid("garch_max_iterations", "must be positive"));
        }
        Ok(())
    }
}
