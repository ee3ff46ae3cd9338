//! Seeded synthetic market generator
//!
//! Produces spot/futures/funding paths with GARCH-style volatility
//! clustering, a mean-reverting basis and an autocorrelated funding rate.
//! The same seed always yields the same series.

use crate::data_loader::ObservationSeries;
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sentinel_core::{ConfigError, MarketObservation};
use serde::{Deserialize, Serialize};
use tracing::info;

/// 2024-01-01T00:00:00Z
const DEFAULT_START_TIMESTAMP: i64 = 1_704_067_200;

/// Shock persistence of the simulated variance process
const VOL_ALPHA: f64 = 0.08;
const VOL_BETA: f64 = 0.90;

/// Synthetic data parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub symbols: Vec<String>,
    /// Timesteps to generate (one observation per symbol per step)
    pub steps: usize,
    pub seed: u64,
    pub start_time: DateTime<Utc>,
    pub interval_minutes: i64,
    pub start_price: Decimal,
    /// Long-run per-step volatility of spot log returns
    pub step_volatility: f64,
    /// Long-run mean of the relative basis
    pub basis_mean: f64,
    /// Per-step pull of the basis back to its mean, in (0, 1]
    pub basis_reversion: f64,
    pub basis_volatility: f64,
    /// AR(1) coefficient of the funding rate
    pub funding_persistence: f64,
    pub funding_volatility: f64,
    /// Length of the trailing return windows attached to each observation
    pub return_window: usize,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["BTC".to_string(), "ETH".to_string()],
            steps: 500,
            seed: 42,
            start_time: DateTime::from_timestamp(DEFAULT_START_TIMESTAMP, 0).unwrap_or_default(),
            interval_minutes: 60,
            start_price: dec!(30000),
            step_volatility: 0.01,
            basis_mean: 0.002,
            basis_reversion: 0.1,
            basis_volatility: 0.002,
            funding_persistence: 0.8,
            funding_volatility: 0.0003,
            return_window: 60,
        }
    }
}

impl SyntheticConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::invalid("symbols", "must not be empty"));
        }
        if self.interval_minutes <= 0 {
            return Err(ConfigError::invalid("interval_minutes", "must be positive"));
        }
        if self.start_price <= Decimal::ZERO {
            return Err(ConfigError::invalid("start_price", "must be positive"));
        }
        for (field, value) in [
            ("step_volatility", self.step_volatility),
            ("basis_volatility", self.basis_volatility),
            ("funding_volatility", self.funding_volatility),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::invalid(field, "must be a non-negative number"));
            }
        }
        if !(self.basis_reversion > 0.0 && self.basis_reversion <= 1.0) {
            return Err(ConfigError::invalid("basis_reversion", "must be in (0, 1]"));
        }
        if !(self.funding_persistence >= 0.0 && self.funding_persistence < 1.0) {
            return Err(ConfigError::invalid("funding_persistence", "must be in [0, 1)"));
        }
        if self.return_window == 0 {
            return Err(ConfigError::invalid("return_window", "must be positive"));
        }
        Ok(())
    }
}

/// Per-symbol simulation state
#[derive(Debug, Clone)]
struct SymbolPath {
    symbol: String,
    spot: f64,
    futures: f64,
    basis: f64,
    funding: f64,
    variance: f64,
    spot_returns: Vec<f64>,
    futures_returns: Vec<f64>,
}

/// Deterministic generator for backtest and paper-mode input
#[derive(Debug)]
pub struct SyntheticMarket {
    config: SyntheticConfig,
    rng: StdRng,
    paths: Vec<SymbolPath>,
    step: usize,
}

impl SyntheticMarket {
    pub fn new(config: SyntheticConfig) -> Result<Self> {
        config.validate()?;

        let start = config.start_price.to_f64().unwrap_or(1.0);
        let variance = config.step_volatility.powi(2);
        let paths = config
            .symbols
            .iter()
            .enumerate()
            .map(|(i, symbol)| {
                // Spread the starting prices so symbols are distinguishable
                let spot = start / (1.0 + i as f64 * 9.0);
                SymbolPath {
                    symbol: symbol.clone(),
                    spot,
                    futures: spot * (1.0 + config.basis_mean),
                    basis: config.basis_mean,
                    funding: 0.0,
                    variance,
                    spot_returns: Vec::new(),
                    futures_returns: Vec::new(),
                }
            })
            .collect();

        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            paths,
            step: 0,
        })
    }

    pub fn config(&self) -> &SyntheticConfig {
        &self.config
    }

    /// Timesteps generated so far
    pub fn steps_generated(&self) -> usize {
        self.step
    }

    /// Advance one timestep and return one observation per symbol
    pub fn next_step(&mut self) -> Result<Vec<MarketObservation>> {
        let timestamp =
            self.config.start_time + Duration::minutes(self.config.interval_minutes * self.step as i64);
        let omega = self.config.step_volatility.powi(2) * (1.0 - VOL_ALPHA - VOL_BETA);
        let window = self.config.return_window;

        let mut observations = Vec::with_capacity(self.paths.len());
        for path in &mut self.paths {
            let z = standard_normal(&mut self.rng);
            let spot_return = path.variance.sqrt() * z;
            path.variance = omega + VOL_ALPHA * spot_return.powi(2) + VOL_BETA * path.variance;

            let basis_shock = scaled_normal(&mut self.rng, self.config.basis_volatility);
            path.basis += self.config.basis_reversion * (self.config.basis_mean - path.basis)
                + basis_shock;
            let funding_shock = scaled_normal(&mut self.rng, self.config.funding_volatility);
            path.funding = self.config.funding_persistence * path.funding + funding_shock;

            let previous_futures = path.futures;
            path.spot *= spot_return.exp();
            // Keep futures strictly positive even under extreme basis draws
            path.futures = path.spot * (1.0 + path.basis).max(0.01);
            let futures_return = (path.futures / previous_futures).ln();

            push_window(&mut path.spot_returns, spot_return, window);
            push_window(&mut path.futures_returns, futures_return, window);

            observations.push(MarketObservation::new(
                path.symbol.clone(),
                timestamp,
                to_price(path.spot),
                to_price(path.futures),
                Decimal::from_f64(path.funding)
                    .unwrap_or(Decimal::ZERO)
                    .round_dp(8),
                path.spot_returns.clone(),
                path.futures_returns.clone(),
            )?);
        }

        self.step += 1;
        Ok(observations)
    }

    /// Generate the configured number of steps as a replayable series
    pub fn generate(&mut self) -> Result<ObservationSeries> {
        let mut observations = Vec::with_capacity(self.config.steps * self.paths.len());
        for _ in 0..self.config.steps {
            observations.extend(self.next_step()?);
        }

        info!(
            seed = self.config.seed,
            steps = self.config.steps,
            symbols = self.paths.len(),
            observations = observations.len(),
            "Generated synthetic market"
        );
        ObservationSeries::new(observations)
    }
}

fn standard_normal(rng: &mut StdRng) -> f64 {
    scaled_normal(rng, 1.0)
}

fn scaled_normal(rng: &mut StdRng, std_dev: f64) -> f64 {
    match Normal::new(0.0, std_dev) {
        Ok(dist) => dist.sample(rng),
        Err(_) => 0.0,
    }
}

fn push_window(window: &mut Vec<f64>, value: f64, capacity: usize) {
    window.push(value);
    if window.len() > capacity {
        let excess = window.len() - capacity;
        window.drain(..excess);
    }
}

/// Cents precision, floored at one cent
fn to_price(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .unwrap_or(Decimal::ZERO)
        .round_dp(2)
        .max(dec!(0.01))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(steps: usize, seed: u64) -> SyntheticConfig {
        SyntheticConfig {
            steps,
            seed,
            ..Default::default()
        }
    }

    #[test]
    fn test_same_seed_same_series() {
        let a = SyntheticMarket::new(config(50, 7)).unwrap().generate().unwrap();
        let b = SyntheticMarket::new(config(50, 7)).unwrap().generate().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seed_different_series() {
        let a = SyntheticMarket::new(config(20, 1)).unwrap().generate().unwrap();
        let b = SyntheticMarket::new(config(20, 2)).unwrap().generate().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_shape() {
        let series = SyntheticMarket::new(config(100, 3)).unwrap().generate().unwrap();
        assert_eq!(series.len(), 200);
        assert_eq!(series.timesteps().count(), 100);

        let last = series.as_slice().last().unwrap();
        assert_eq!(last.spot_returns().len(), 60);
        assert_eq!(last.futures_returns().len(), 60);
        assert!(series.iter().all(|o| o.spot_price() > Decimal::ZERO));
    }

    #[test]
    fn test_windows_grow_until_full() {
        let mut market = SyntheticMarket::new(config(0, 3)).unwrap();
        let first = market.next_step().unwrap();
        assert_eq!(first[0].spot_returns().len(), 1);
        let second = market.next_step().unwrap();
        assert_eq!(second[0].spot_returns().len(), 2);
        assert_eq!(market.steps_generated(), 2);
        assert_eq!(
            second[0].timestamp() - first[0].timestamp(),
            Duration::minutes(60)
        );
    }

    #[test]
    fn test_rejects_invalid_config() {
        let bad = SyntheticConfig {
            symbols: vec![],
            ..Default::default()
        };
        assert!(SyntheticMarket::new(bad).is_err());

        let bad = SyntheticConfig {
            basis_reversion: 0.0,
            ..Default::default()
        };
        assert!(SyntheticMarket::new(bad).is_err());
    }
}
