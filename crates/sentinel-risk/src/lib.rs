//! Basis Sentinel Risk Management
//!
//! Volatility forecasting, VaR, hedge ratios, drawdown halts, and position
//! sizing.

pub mod assessor;
pub mod drawdown;
pub mod hedge;
pub mod sizing;
pub mod var;
pub mod volatility;

pub use assessor::{FixedRiskModel, RiskAssessor, RiskModel};
pub use drawdown::{DrawdownMonitor, DrawdownStatus};
pub use hedge::{HedgeRatioEstimator, NEUTRAL_HEDGE_RATIO};
pub use sizing::PositionSizer;
pub use var::ValueAtRiskCalculator;
pub use volatility::{Ewma, Garch11, VolatilityEstimator, VolatilityModel};
