//! One-step-ahead volatility forecasting
//!
//! [`VolatilityEstimator`] owns the window policy (how many returns are needed,
//! which ones are used) and delegates the statistics to a [`VolatilityModel`]
//! backend. Two backends are provided:
//!
//! - [`Garch11`]: GARCH(1,1) with variance targeting, fit by Gaussian
//!   quasi-maximum likelihood using a bounded pattern search over (alpha, beta)
//! - [`Ewma`]: RiskMetrics exponentially weighted variance
//!
//! Any backend failure (degenerate window, non-converged fit, non-finite
//! output) surfaces as `None`, never as NaN or a library panic.

use sentinel_core::{RiskParameters, VolatilityConfig, VolatilityModelKind};
use tracing::debug;

/// Statistical backend producing a one-step-ahead standard deviation
pub trait VolatilityModel: std::fmt::Debug + Send + Sync {
    /// Short identifier for logs
    fn name(&self) -> &'static str;

    /// Fit on `returns` (chronological) and forecast the next-step std dev
    fn fit_forecast(&self, returns: &[f64]) -> Option<f64>;
}

/// GARCH(1,1) volatility model
///
/// sigma²(t) = omega + alpha * e²(t-1) + beta * sigma²(t-1), with
/// omega = s² * (1 - alpha - beta) so the long-run variance matches the
/// sample variance s² of the window.
#[derive(Debug, Clone)]
pub struct Garch11 {
    max_iterations: usize,
}

/// Upper bound on alpha + beta; keeps the process covariance-stationary
const MAX_PERSISTENCE: f64 = 0.999;
const INITIAL_ALPHA: f64 = 0.05;
const INITIAL_BETA: f64 = 0.90;
const INITIAL_STEP: f64 = 0.05;
const STEP_TOLERANCE: f64 = 1e-4;

impl Garch11 {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }

    /// Negative Gaussian quasi log-likelihood, constants dropped
    fn objective(residuals: &[f64], sample_var: f64, alpha: f64, beta: f64) -> f64 {
        let omega = sample_var * (1.0 - alpha - beta);
        let mut sigma2 = sample_var;
        let mut nll = 0.0;

        for (t, e) in residuals.iter().enumerate() {
            if t > 0 {
                let prev = residuals[t - 1];
                sigma2 = omega + alpha * prev * prev + beta * sigma2;
            }
            nll += sigma2.ln() + e * e / sigma2;
        }

        nll
    }

    fn feasible(alpha: f64, beta: f64) -> bool {
        alpha >= 0.0 && beta >= 0.0 && alpha + beta <= MAX_PERSISTENCE
    }

    /// Pattern search over (alpha, beta). `None` if not converged in budget.
    fn fit(&self, residuals: &[f64], sample_var: f64) -> Option<(f64, f64)> {
        let mut alpha = INITIAL_ALPHA;
        let mut beta = INITIAL_BETA;
        let mut best = Self::objective(residuals, sample_var, alpha, beta);
        if !best.is_finite() {
            return None;
        }

        let mut step = INITIAL_STEP;
        for _ in 0..self.max_iterations {
            if step < STEP_TOLERANCE {
                return Some((alpha, beta));
            }

            let candidates = [
                (alpha + step, beta),
                (alpha - step, beta),
                (alpha, beta + step),
                (alpha, beta - step),
                // persistence ridge
                (alpha + step, beta - step),
                (alpha - step, beta + step),
            ];

            let mut improved = None;
            for (a, b) in candidates {
                if !Self::feasible(a, b) {
                    continue;
                }
                let value = Self::objective(residuals, sample_var, a, b);
                if value.is_finite() && value < best {
                    best = value;
                    improved = Some((a, b));
                }
            }

            match improved {
                Some((a, b)) => {
                    alpha = a;
                    beta = b;
                }
                None => step /= 2.0,
            }
        }

        None
    }
}

impl Default for Garch11 {
    fn default() -> Self {
        Self::new(500)
    }
}

impl VolatilityModel for Garch11 {
    fn name(&self) -> &'static str {
        "garch11"
    }

    fn fit_forecast(&self, returns: &[f64]) -> Option<f64> {
        if returns.len() < 2 {
            return None;
        }

        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let residuals: Vec<f64> = returns.iter().map(|r| r - mean).collect();
        let sample_var = residuals.iter().map(|e| e * e).sum::<f64>() / n;

        if !sample_var.is_finite() || sample_var <= f64::MIN_POSITIVE {
            return None;
        }

        let Some((alpha, beta)) = self.fit(&residuals, sample_var) else {
            debug!(window = returns.len(), "GARCH fit did not converge");
            return None;
        };

        let omega = sample_var * (1.0 - alpha - beta);
        let mut sigma2 = sample_var;
        for pair in residuals.windows(2) {
            sigma2 = omega + alpha * pair[0] * pair[0] + beta * sigma2;
        }
        let last = residuals[residuals.len() - 1];
        let next = omega + alpha * last * last + beta * sigma2;

        debug!(alpha, beta, omega, next_variance = next, "GARCH(1,1) fit");

        Some(next.sqrt())
    }
}

/// RiskMetrics EWMA volatility model
#[derive(Debug, Clone)]
pub struct Ewma {
    lambda: f64,
}

impl Ewma {
    pub fn new(lambda: f64) -> Self {
        Self { lambda }
    }
}

impl Default for Ewma {
    fn default() -> Self {
        Self::new(0.94)
    }
}

impl VolatilityModel for Ewma {
    fn name(&self) -> &'static str {
        "ewma"
    }

    fn fit_forecast(&self, returns: &[f64]) -> Option<f64> {
        let (first, rest) = returns.split_first()?;
        let variance = rest
            .iter()
            .fold(first * first, |var, r| self.lambda * var + (1.0 - self.lambda) * r * r);
        Some(variance.sqrt())
    }
}

/// Windowed volatility forecaster
#[derive(Debug)]
pub struct VolatilityEstimator {
    lookback_window: usize,
    model: Box<dyn VolatilityModel>,
}

impl VolatilityEstimator {
    pub fn new(lookback_window: usize, model: Box<dyn VolatilityModel>) -> Self {
        Self {
            lookback_window,
            model,
        }
    }

    /// Build the estimator with the backend named in the config
    pub fn from_config(params: &RiskParameters, config: &VolatilityConfig) -> Self {
        let model: Box<dyn VolatilityModel> = match config.model {
            VolatilityModelKind::Garch => Box::new(Garch11::new(config.garch_max_iterations)),
            VolatilityModelKind::Ewma => Box::new(Ewma::new(config.ewma_lambda)),
        };
        Self::new(params.lookback_window, model)
    }

    pub fn lookback_window(&self) -> usize {
        self.lookback_window
    }

    pub fn model_name(&self) -> &'static str {
        self.model.name()
    }

    /// Forecast next-step volatility from the most recent `lookback_window`
    /// returns. `None` while warming up or if the backend fails.
    pub fn forecast(&self, returns: &[f64]) -> Option<f64> {
        if returns.len() < self.lookback_window {
            return None;
        }

        let window = &returns[returns.len() - self.lookback_window..];
        self.model
            .fit_forecast(window)
            .filter(|vol| vol.is_finite() && *vol >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic, irregular return path with clustered amplitude
    fn returns(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let t = i as f64;
                let amplitude = if (i / 10) % 2 == 0 { 0.01 } else { 0.03 };
                amplitude * ((t * 1.7).sin() + 0.5 * (t * 0.37).cos())
            })
            .collect()
    }

    fn sample_std(xs: &[f64]) -> f64 {
        let n = xs.len() as f64;
        let mean = xs.iter().sum::<f64>() / n;
        (xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt()
    }

    #[test]
    fn test_short_window_is_undefined() {
        let estimator = VolatilityEstimator::new(30, Box::new(Garch11::default()));
        for n in 0..30 {
            assert!(estimator.forecast(&returns(n)).is_none(), "n = {}", n);
        }
    }

    #[test]
    fn test_garch_forecast_is_plausible() {
        let estimator = VolatilityEstimator::new(60, Box::new(Garch11::default()));
        let data = returns(80);
        let vol = estimator.forecast(&data).expect("forecast should be defined");

        let window_std = sample_std(&data[20..]);
        assert!(vol.is_finite() && vol > 0.0);
        assert!(
            vol > window_std * 0.1 && vol < window_std * 10.0,
            "forecast {} far from window std {}",
            vol,
            window_std
        );
    }

    #[test]
    fn test_uses_most_recent_window_only() {
        let estimator = VolatilityEstimator::new(40, Box::new(Garch11::default()));
        let data = returns(40);
        let mut prefixed = vec![0.5, -0.5, 0.4, -0.4];
        prefixed.extend_from_slice(&data);

        assert_eq!(estimator.forecast(&data), estimator.forecast(&prefixed));
    }

    #[test]
    fn test_constant_returns_are_undefined_for_garch() {
        let estimator = VolatilityEstimator::new(10, Box::new(Garch11::default()));
        assert!(estimator.forecast(&[0.01; 10]).is_none());
    }

    #[test]
    fn test_garch_without_iteration_budget_is_undefined() {
        let estimator = VolatilityEstimator::new(40, Box::new(Garch11::new(1)));
        assert!(estimator.forecast(&returns(40)).is_none());
    }

    #[test]
    fn test_forecast_is_idempotent() {
        let estimator = VolatilityEstimator::new(50, Box::new(Garch11::default()));
        let data = returns(50);
        let first = estimator.forecast(&data);
        let second = estimator.forecast(&data);
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_ewma_known_values() {
        let model = Ewma::new(0.5);
        // var0 = 0.04, var1 = 0.5*0.04 + 0.5*0.0 = 0.02, var2 = 0.5*0.02 + 0.5*0.04 = 0.03
        let vol = model.fit_forecast(&[0.2, 0.0, 0.2]).unwrap();
        assert!((vol - 0.03_f64.sqrt()).abs() < 1e-12);

        assert!(model.fit_forecast(&[]).is_none());
        assert_eq!(model.fit_forecast(&[0.0, 0.0]), Some(0.0));
    }

    #[test]
    fn test_from_config_selects_backend() {
        let params = RiskParameters::default();
        let mut config = VolatilityConfig::default();
        assert_eq!(
            VolatilityEstimator::from_config(&params, &config).model_name(),
            "garch11"
        );

        config.model = VolatilityModelKind::Ewma;
        let estimator = VolatilityEstimator::from_config(&params, &config);
        assert_eq!(estimator.model_name(), "ewma");
        assert_eq!(estimator.lookback_window(), params.lookback_window);
    }
}
