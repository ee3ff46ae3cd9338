use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Instrument symbol (e.g. "BTC")
pub type Symbol = String;

/// Immutable market snapshot for one symbol at one instant.
///
/// Only constructible through [`MarketObservation::new`] (or deserialization,
/// which goes through the same checks), so downstream code can rely on
/// positive prices and finite return series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawObservation")]
pub struct MarketObservation {
    symbol: Symbol,
    timestamp: DateTime<Utc>,
    spot_price: Decimal,
    futures_price: Decimal,
    funding_rate: Decimal,
    spot_return_series: Vec<f64>,
    futures_return_series: Vec<f64>,
}

impl MarketObservation {
    /// Build a validated observation
    pub fn new(
        symbol: impl Into<Symbol>,
        timestamp: DateTime<Utc>,
        spot_price: Decimal,
        futures_price: Decimal,
        funding_rate: Decimal,
        spot_return_series: Vec<f64>,
        futures_return_series: Vec<f64>,
    ) -> Result<Self, ValidationError> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        for (field, value) in [("spot_price", spot_price), ("futures_price", futures_price)] {
            if value <= Decimal::ZERO {
                return Err(ValidationError::NonPositivePrice {
                    symbol,
                    field,
                    value: value.to_string(),
                });
            }
        }

        for (field, series) in [
            ("spot_return_series", &spot_return_series),
            ("futures_return_series", &futures_return_series),
        ] {
            if series.iter().any(|r| !r.is_finite()) {
                return Err(ValidationError::NonFinite { symbol, field });
            }
        }

        Ok(Self {
            symbol,
            timestamp,
            spot_price,
            futures_price,
            funding_rate,
            spot_return_series,
            futures_return_series,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn spot_price(&self) -> Decimal {
        self.spot_price
    }

    pub fn futures_price(&self) -> Decimal {
        self.futures_price
    }

    pub fn funding_rate(&self) -> Decimal {
        self.funding_rate
    }

    /// Spot returns, chronological, most recent last
    pub fn spot_returns(&self) -> &[f64] {
        &self.spot_return_series
    }

    /// Futures returns, chronological, most recent last
    pub fn futures_returns(&self) -> &[f64] {
        &self.futures_return_series
    }

    /// Relative futures premium over spot: (futures - spot) / spot
    pub fn basis(&self) -> Decimal {
        (self.futures_price - self.spot_price) / self.spot_price
    }
}

/// Wire shape of an observation before validation
#[derive(Debug, Deserialize)]
struct RawObservation {
    symbol: Symbol,
    timestamp: DateTime<Utc>,
    spot_price: Decimal,
    futures_price: Decimal,
    #[serde(default)]
    funding_rate: Decimal,
    #[serde(default)]
    spot_return_series: Vec<f64>,
    #[serde(default)]
    futures_return_series: Vec<f64>,
}

impl TryFrom<RawObservation> for MarketObservation {
    type Error = ValidationError;

    fn try_from(raw: RawObservation) -> Result<Self, Self::Error> {
        MarketObservation::new(
            raw.symbol,
            raw.timestamp,
            raw.spot_price,
            raw.futures_price,
            raw.funding_rate,
            raw.spot_return_series,
            raw.futures_return_series,
        )
    }
}

/// Per-symbol, per-timestep risk estimate.
///
/// `None` means "insufficient data" and is never collapsed into zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub symbol: Symbol,
    pub forecast_volatility: Option<f64>,
    pub value_at_risk: Option<f64>,
    pub hedge_ratio: f64,
}

impl RiskAssessment {
    /// Assessment with no volatility or VaR and a neutral hedge
    pub fn undefined(symbol: impl Into<Symbol>) -> Self {
        Self {
            symbol: symbol.into(),
            forecast_volatility: None,
            value_at_risk: None,
            hedge_ratio: 1.0,
        }
    }
}

/// Open hedged position for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    /// Signed spot-leg size; positive is long spot / short futures
    pub size: i64,
    /// Futures units held per spot unit
    pub hedge_ratio: f64,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    pub fn is_open(&self) -> bool {
        self.size != 0
    }
}

/// Decision produced for one symbol at one timestep
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// No new risk this step; any existing position stands
    Hold,
    /// Enter (or add to) a hedged spot/futures position
    OpenHedgedPosition { size: i64, hedge_ratio: f64 },
    /// Re-weight the futures leg of an existing position
    AdjustHedge { new_ratio: f64 },
}

impl Action {
    pub fn is_hold(&self) -> bool {
        matches!(self, Action::Hold)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::Hold => "hold",
            Action::OpenHedgedPosition { .. } => "open_hedged_position",
            Action::AdjustHedge { .. } => "adjust_hedge",
        }
    }
}

/// An executed trade, one per `pnl_history` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: Symbol,
    pub timestamp: DateTime<Utc>,
    pub size: i64,
    pub hedge_ratio: f64,
    pub spot_price: Decimal,
    pub futures_price: Decimal,
    pub basis: Decimal,
    pub funding_rate: Decimal,
    pub pnl: Decimal,
    pub capital_after: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ts() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_basis() {
        let obs = MarketObservation::new("BTC", ts(), dec!(500), dec!(505), dec!(0), vec![], vec![])
            .unwrap();
        assert_eq!(obs.basis(), dec!(0.01));
    }

    #[test]
    fn test_rejects_non_positive_price() {
        let err = MarketObservation::new("BTC", ts(), dec!(0), dec!(505), dec!(0), vec![], vec![])
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::NonPositivePrice { field: "spot_price", .. }
        ));

        let err = MarketObservation::new("BTC", ts(), dec!(500), dec!(-1), dec!(0), vec![], vec![])
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::NonPositivePrice { field: "futures_price", .. }
        ));
    }

    #[test]
    fn test_rejects_non_finite_returns() {
        let err = MarketObservation::new(
            "ETH",
            ts(),
            dec!(100),
            dec!(101),
            dec!(0),
            vec![0.01, f64::NAN],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::NonFinite { .. }));
    }

    #[test]
    fn test_rejects_empty_symbol() {
        let err = MarketObservation::new("  ", ts(), dec!(1), dec!(1), dec!(0), vec![], vec![])
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptySymbol);
    }

    #[test]
    fn test_deserialize_validates() {
        let ok = r#"{"symbol":"BTC","timestamp":"2024-01-01T00:00:00Z","spot_price":"500","futures_price":"505","funding_rate":"0.0001","spot_return_series":[0.01,-0.02],"futures_return_series":[0.011,-0.019]}"#;
        let obs: MarketObservation = serde_json::from_str(ok).unwrap();
        assert_eq!(obs.symbol(), "BTC");
        assert_eq!(obs.spot_returns().len(), 2);

        let bad = r#"{"symbol":"BTC","timestamp":"2024-01-01T00:00:00Z","spot_price":"-5","futures_price":"505"}"#;
        assert!(serde_json::from_str::<MarketObservation>(bad).is_err());
    }
}
