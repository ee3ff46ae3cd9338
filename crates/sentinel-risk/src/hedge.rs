//! Minimum-variance hedge ratio between spot and futures returns

use sentinel_core::{HedgeRatioBounds, RiskParameters};
use tracing::debug;

/// Ratio used whenever the data cannot support an estimate
pub const NEUTRAL_HEDGE_RATIO: f64 = 1.0;

/// Futures variance at or below this is treated as constant
const MIN_VARIANCE: f64 = 1e-18;

/// Estimates cov(spot, fut) / var(fut), clipped to a safety band
#[derive(Debug, Clone)]
pub struct HedgeRatioEstimator {
    bounds: HedgeRatioBounds,
}

impl HedgeRatioEstimator {
    pub fn new(bounds: HedgeRatioBounds) -> Self {
        Self { bounds }
    }

    pub fn from_params(params: &RiskParameters) -> Self {
        Self::new(params.hedge_ratio_bounds)
    }

    pub fn bounds(&self) -> HedgeRatioBounds {
        self.bounds
    }

    /// Hedge ratio over the most recent common window of both series.
    ///
    /// Always within `bounds`. Falls back to 1.0 for fewer than two samples
    /// or a (numerically) constant futures series.
    pub fn hedge_ratio(&self, spot_returns: &[f64], futures_returns: &[f64]) -> f64 {
        let n = spot_returns.len().min(futures_returns.len());
        if n < 2 {
            return self.bounds.clamp(NEUTRAL_HEDGE_RATIO);
        }

        let spot = &spot_returns[spot_returns.len() - n..];
        let fut = &futures_returns[futures_returns.len() - n..];

        let Some(raw) = Self::covariance_ratio(spot, fut) else {
            debug!(samples = n, "Degenerate futures variance, using neutral hedge");
            return self.bounds.clamp(NEUTRAL_HEDGE_RATIO);
        };

        let clipped = self.bounds.clamp(raw);
        if clipped != raw {
            debug!(raw, clipped, "Hedge ratio clipped to bounds");
        }
        clipped
    }

    /// Sample covariance over sample variance; `None` if degenerate
    fn covariance_ratio(spot: &[f64], fut: &[f64]) -> Option<f64> {
        let n = spot.len() as f64;
        let mean_spot = spot.iter().sum::<f64>() / n;
        let mean_fut = fut.iter().sum::<f64>() / n;

        let mut cov = 0.0;
        let mut var_fut = 0.0;
        for (s, f) in spot.iter().zip(fut) {
            let ds = s - mean_spot;
            let df = f - mean_fut;
            cov += ds * df;
            var_fut += df * df;
        }
        cov /= n - 1.0;
        var_fut /= n - 1.0;

        if !var_fut.is_finite() || var_fut <= MIN_VARIANCE {
            return None;
        }

        let ratio = cov / var_fut;
        ratio.is_finite().then_some(ratio)
    }
}

impl Default for HedgeRatioEstimator {
    fn default() -> Self {
        Self::new(HedgeRatioBounds::default())
    }
}
