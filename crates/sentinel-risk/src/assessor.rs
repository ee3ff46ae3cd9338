//! Per-observation risk assessment

use crate::hedge::HedgeRatioEstimator;
use crate::var::ValueAtRiskCalculator;
use crate::volatility::VolatilityEstimator;
use sentinel_core::{
    MarketObservation, RiskAssessment, RiskCondition, RiskParameters, VolatilityConfig,
};
use tracing::trace;

/// Source of risk assessments for the decision engine.
///
/// Implementations must be pure functions of the observation so that replay
/// stays deterministic.
pub trait RiskModel: Send + Sync {
    fn assess(&self, observation: &MarketObservation) -> RiskAssessment;
}

/// Volatility forecast, VaR and hedge ratio from the observation's return
/// history
#[derive(Debug)]
pub struct RiskAssessor {
    volatility: VolatilityEstimator,
    var: ValueAtRiskCalculator,
    hedge: HedgeRatioEstimator,
}

impl RiskAssessor {
    pub fn new(
        volatility: VolatilityEstimator,
        var: ValueAtRiskCalculator,
        hedge: HedgeRatioEstimator,
    ) -> Self {
        Self {
            volatility,
            var,
            hedge,
        }
    }

    pub fn from_config(params: &RiskParameters, volatility: &VolatilityConfig) -> Self {
        Self::new(
            VolatilityEstimator::from_config(params, volatility),
            ValueAtRiskCalculator::from_params(params),
            HedgeRatioEstimator::from_params(params),
        )
    }
}

impl RiskModel for RiskAssessor {
    fn assess(&self, observation: &MarketObservation) -> RiskAssessment {
        let spot = observation.spot_returns();
        let lookback = self.volatility.lookback_window();

        let forecast_volatility = self.volatility.forecast(spot);
        let window = &spot[spot.len().saturating_sub(lookback)..];
        let value_at_risk = self.var.value_at_risk(window, forecast_volatility);
        let hedge_ratio = self
            .hedge
            .hedge_ratio(spot, observation.futures_returns());

        if forecast_volatility.is_none() {
            trace!(
                symbol = %observation.symbol(),
                condition = %RiskCondition::InsufficientData,
                samples = spot.len(),
                lookback,
                "Volatility undefined"
            );
        }

        RiskAssessment {
            symbol: observation.symbol().to_string(),
            forecast_volatility,
            value_at_risk,
            hedge_ratio,
        }
    }
}

/// Fixed assessment for every observation (tests, what-if runs)
#[derive(Debug, Clone)]
pub struct FixedRiskModel {
    pub forecast_volatility: Option<f64>,
    pub value_at_risk: Option<f64>,
    pub hedge_ratio: f64,
}

impl RiskModel for FixedRiskModel {
    fn assess(&self, observation: &MarketObservation) -> RiskAssessment {
        RiskAssessment {
            symbol: observation.symbol().to_string(),
            forecast_volatility: self.forecast_volatility,
            value_at_risk: self.value_at_risk,
            hedge_ratio: self.hedge_ratio,
        }
    }
}
