//! VaR-based position sizing
//!
//! size = floor(risk_per_trade_fraction * capital / |VaR|), capped so the
//! spot-leg notional stays within max_position_fraction * capital:
//! size <= floor(max_position_fraction * capital / spot_price).

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sentinel_core::{RiskCondition, RiskParameters};
use tracing::debug;

/// Converts a VaR estimate and available capital into a contract count
#[derive(Debug, Clone)]
pub struct PositionSizer {
    risk_per_trade_fraction: Decimal,
    max_position_fraction: Decimal,
}

impl PositionSizer {
    pub fn new(risk_per_trade_fraction: Decimal, max_position_fraction: Decimal) -> Self {
        Self {
            risk_per_trade_fraction,
            max_position_fraction,
        }
    }

    pub fn from_params(params: &RiskParameters) -> Self {
        Self::new(params.risk_per_trade_fraction, params.max_position_fraction)
    }

    /// Unsigned position size in spot units; 0 means "no trade".
    ///
    /// Undefined or zero VaR never sizes up to an unbounded position.
    pub fn size(&self, capital: Decimal, spot_price: Decimal, value_at_risk: Option<f64>) -> i64 {
        let Some(var) = value_at_risk else {
            return 0;
        };
        if capital <= Decimal::ZERO {
            return 0;
        }

        let cap = self.position_cap(capital, spot_price);
        if cap == 0 {
            debug!(
                capital = %capital,
                spot_price = %spot_price,
                "Position limit below one unit, not sizing"
            );
            return 0;
        }

        // Decimal can't hold NaN/inf, and very small magnitudes round to zero
        let risk = match Decimal::from_f64(var.abs()) {
            Some(risk) if !risk.is_zero() => risk,
            _ => {
                debug!(
                    condition = %RiskCondition::DegenerateInput,
                    var,
                    "Zero or unrepresentable VaR, not sizing"
                );
                return 0;
            }
        };

        let budget = self.risk_per_trade_fraction * capital;
        let raw = match budget.checked_div(risk) {
            Some(raw) => raw.floor().to_i64().unwrap_or(i64::MAX),
            None => i64::MAX,
        };

        raw.min(cap)
    }

    /// Hard position limit in spot units: the largest size whose notional
    /// at `spot_price` stays within `max_position_fraction` of capital
    pub fn position_cap(&self, capital: Decimal, spot_price: Decimal) -> i64 {
        if spot_price <= Decimal::ZERO {
            return 0;
        }
        (self.max_position_fraction * capital)
            .checked_div(spot_price)
            .map(|units| units.floor().to_i64().unwrap_or(i64::MAX))
            .unwrap_or(i64::MAX)
            .max(0)
    }
}
