//! Basis Sentinel Backtest
//!
//! Deterministic replay of market observations through the decision engine.

pub mod config;
pub mod data_loader;
pub mod engine;
pub mod error;
pub mod results;
pub mod synthetic;

pub use config::BacktestConfig;
pub use data_loader::{load_observations, save_observations, ObservationSeries};
pub use engine::BacktestReplayEngine;
pub use error::{BacktestError, Result};
pub use results::{BacktestResults, HaltEvent, PerformanceMetrics, SymbolPerformance};
pub use synthetic::{SyntheticConfig, SyntheticMarket};
