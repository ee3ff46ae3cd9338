//! Value at Risk (VaR) Calculator
//!
//! Scales the empirical left-tail quantile of the return distribution by the
//! forecast volatility. For 95% confidence the 5th percentile of returns is
//! used, interpolating linearly between order statistics.
//!
//! The result keeps its sign (usually negative, the loss direction); sizing
//! works on the absolute value.

use sentinel_core::RiskParameters;

/// VaR calculator for a single instrument
#[derive(Debug, Clone)]
pub struct ValueAtRiskCalculator {
    confidence: f64,
}

impl ValueAtRiskCalculator {
    /// Create a calculator at the given confidence level, e.g. 0.95
    pub fn new(confidence: f64) -> Self {
        Self { confidence }
    }

    pub fn from_params(params: &RiskParameters) -> Self {
        Self::new(params.var_confidence)
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// VaR = quantile(returns, 1 - confidence) * forecast_volatility
    ///
    /// `None` if the volatility is undefined or there are fewer than two
    /// returns.
    pub fn value_at_risk(&self, returns: &[f64], forecast_volatility: Option<f64>) -> Option<f64> {
        let volatility = forecast_volatility?;
        if returns.len() < 2 {
            return None;
        }

        let quantile = Self::empirical_quantile(returns, 1.0 - self.confidence)?;
        let var = quantile * volatility;
        var.is_finite().then_some(var)
    }

    /// Linear-interpolated quantile, `p` in [0, 1]
    fn empirical_quantile(values: &[f64], p: f64) -> Option<f64> {
        if values.is_empty() || !(0.0..=1.0).contains(&p) {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let position = p * (sorted.len() - 1) as f64;
        let lower = position.floor() as usize;
        let upper = position.ceil() as usize;
        let weight = position - lower as f64;

        Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_volatility_propagates() {
        let calc = ValueAtRiskCalculator::new(0.95);
        assert_eq!(calc.value_at_risk(&[-0.01, 0.02, 0.03], None), None);
    }

    #[test]
    fn test_too_few_returns() {
        let calc = ValueAtRiskCalculator::new(0.95);
        assert_eq!(calc.value_at_risk(&[], Some(0.02)), None);
        assert_eq!(calc.value_at_risk(&[-0.05], Some(0.02)), None);
    }

    #[test]
    fn test_known_quantile() {
        let calc = ValueAtRiskCalculator::new(0.95);
        // 101 returns from -0.50 to +0.50; the 5th percentile is exactly -0.45
        let returns: Vec<f64> = (0..=100).map(|i| (i as f64 - 50.0) / 100.0).collect();

        let var = calc.value_at_risk(&returns, Some(2.0)).unwrap();
        assert!((var - (-0.90)).abs() < 1e-12, "got {}", var);
    }

    #[test]
    fn test_interpolates_between_order_statistics() {
        // p = 0.5 over [1, 2, 3, 4] sits halfway between 2 and 3
        assert_eq!(
            ValueAtRiskCalculator::empirical_quantile(&[4.0, 1.0, 3.0, 2.0], 0.5),
            Some(2.5)
        );
        assert_eq!(
            ValueAtRiskCalculator::empirical_quantile(&[4.0, 1.0, 3.0, 2.0], 0.0),
            Some(1.0)
        );
        assert_eq!(
            ValueAtRiskCalculator::empirical_quantile(&[4.0, 1.0, 3.0, 2.0], 1.0),
            Some(4.0)
        );
    }

    #[test]
    fn test_sign_is_kept() {
        let calc = ValueAtRiskCalculator::new(0.95);
        let losses = [-0.05, -0.04, -0.03, -0.02, -0.01];
        assert!(calc.value_at_risk(&losses, Some(0.1)).unwrap() < 0.0);

        let gains = [0.01, 0.02, 0.03, 0.04, 0.05];
        assert!(calc.value_at_risk(&gains, Some(0.1)).unwrap() > 0.0);
    }

    #[test]
    fn test_zero_volatility_gives_zero_var() {
        let calc = ValueAtRiskCalculator::new(0.99);
        assert_eq!(calc.value_at_risk(&[-0.02, 0.01, 0.03], Some(0.0)), Some(0.0));
    }

    #[test]
    fn test_is_idempotent() {
        let calc = ValueAtRiskCalculator::new(0.9);
        let returns = [0.01, -0.03, 0.02, -0.01, 0.005, -0.02];
        let first = calc.value_at_risk(&returns, Some(0.015));
        assert_eq!(first, calc.value_at_risk(&returns, Some(0.015)));
    }
}
