//! Paper trading session
//!
//! Pulls timesteps from a [`MarketDataSource`], feeds them through the same
//! replay step the backtest uses, and never places orders. The session loop
//! owns retry and backoff for the source; the decision logic stays the
//! deterministic core.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sentinel_backtest::{BacktestReplayEngine, BacktestResults, ObservationSeries, SyntheticMarket};
use sentinel_core::{ConfigError, MarketObservation};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Market data source errors
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid market data: {0}")]
    InvalidData(String),
}

impl SourceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::Unavailable(_))
    }
}

/// Feed of market observations for a live-style session
#[async_trait]
pub trait MarketDataSource: Send {
    /// Name of this source, for logging
    fn name(&self) -> &str;

    /// Observations for the next timestep, or `None` once the feed is done
    async fn next_batch(&mut self) -> Result<Option<Vec<MarketObservation>>, SourceError>;
}

/// Replays a recorded series one timestep per batch
#[derive(Debug, Clone)]
pub struct ReplaySource {
    batches: VecDeque<Vec<MarketObservation>>,
}

impl ReplaySource {
    pub fn new(series: &ObservationSeries) -> Self {
        Self {
            batches: series.timesteps().map(<[_]>::to_vec).collect(),
        }
    }
}

#[async_trait]
impl MarketDataSource for ReplaySource {
    fn name(&self) -> &str {
        "replay"
    }

    async fn next_batch(&mut self) -> Result<Option<Vec<MarketObservation>>, SourceError> {
        Ok(self.batches.pop_front())
    }
}

/// Draws timesteps from a seeded synthetic market
#[derive(Debug)]
pub struct SyntheticSource {
    market: SyntheticMarket,
    remaining: usize,
}

impl SyntheticSource {
    pub fn new(market: SyntheticMarket, steps: usize) -> Self {
        Self {
            market,
            remaining: steps,
        }
    }
}

#[async_trait]
impl MarketDataSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn next_batch(&mut self) -> Result<Option<Vec<MarketObservation>>, SourceError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        self.market
            .next_step()
            .map(Some)
            .map_err(|e| SourceError::InvalidData(e.to_string()))
    }
}

/// Exponential backoff for retryable source errors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per fetch, including the first
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let delay = self.initial_backoff_ms as f64 * self.multiplier.powi(exponent);
        Duration::from_millis(delay.min(self.max_backoff_ms as f64) as u64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("retry.max_attempts", "must be at least 1"));
        }
        if !(self.multiplier >= 1.0 && self.multiplier.is_finite()) {
            return Err(ConfigError::invalid("retry.multiplier", "must be >= 1"));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::invalid(
                "retry.initial_backoff_ms",
                "must not exceed max_backoff_ms",
            ));
        }
        Ok(())
    }
}

/// Paper session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperConfig {
    /// Pause between timesteps
    pub poll_interval_ms: u64,
    pub retry: RetryPolicy,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            retry: RetryPolicy::default(),
        }
    }
}

impl PaperConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry.validate()
    }
}

/// Lifecycle of a paper session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    /// Drawdown limit breached; no further decisions are taken
    Halted,
    /// The source has no more data
    Exhausted,
    /// The source failed beyond the retry policy
    Failed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Running => "running",
            SessionState::Halted => "halted",
            SessionState::Exhausted => "exhausted",
            SessionState::Failed => "failed",
        }
    }
}

/// Supervises a data source and drives the replay engine step by step
pub struct PaperSession<S: MarketDataSource> {
    source: S,
    engine: BacktestReplayEngine,
    retry: RetryPolicy,
    poll_interval: Duration,
    state: SessionState,
    first_timestamp: Option<DateTime<Utc>>,
    last_timestamp: Option<DateTime<Utc>>,
    observations: usize,
    rejected_batches: usize,
}

impl<S: MarketDataSource> PaperSession<S> {
    pub fn new(source: S, mut engine: BacktestReplayEngine, config: &PaperConfig) -> Self {
        engine.reset();
        Self {
            source,
            engine,
            retry: config.retry.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            state: SessionState::Running,
            first_timestamp: None,
            last_timestamp: None,
            observations: 0,
            rejected_batches: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn engine(&self) -> &BacktestReplayEngine {
        &self.engine
    }

    pub fn observations(&self) -> usize {
        self.observations
    }

    pub fn rejected_batches(&self) -> usize {
        self.rejected_batches
    }

    /// Summary of everything processed so far
    pub fn results(&self) -> BacktestResults {
        let range = self.first_timestamp.zip(self.last_timestamp);
        self.engine.results(range, self.observations)
    }

    /// Run until the session leaves `Running` or `max_steps` batches have
    /// been processed
    pub async fn run(&mut self, max_steps: Option<usize>) -> SessionState {
        info!(source = self.source.name(), max_steps = ?max_steps, "Starting paper session");

        let mut steps = 0;
        while self.state == SessionState::Running {
            if max_steps.is_some_and(|max| steps >= max) {
                break;
            }

            match self.fetch_with_retry().await {
                Ok(Some(batch)) => {
                    self.process_batch(batch);
                    steps += 1;
                }
                Ok(None) => {
                    info!(source = self.source.name(), "Market data exhausted");
                    self.state = SessionState::Exhausted;
                }
                Err(e) => {
                    error!(source = self.source.name(), error = %e, "Market data source failed");
                    self.state = SessionState::Failed;
                }
            }

            if self.state == SessionState::Running && self.engine.portfolio().trading_halted() {
                warn!(
                    capital = %self.engine.portfolio().capital(),
                    "Drawdown halt, stopping paper session"
                );
                self.state = SessionState::Halted;
            }

            if self.state == SessionState::Running && !self.poll_interval.is_zero() {
                sleep(self.poll_interval).await;
            }
        }

        info!(
            state = self.state.as_str(),
            steps,
            observations = self.observations,
            capital = %self.engine.portfolio().capital(),
            "Paper session stopped"
        );
        self.state
    }

    async fn fetch_with_retry(&mut self) -> Result<Option<Vec<MarketObservation>>, SourceError> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.source.next_batch().await {
                Ok(batch) => return Ok(batch),
                Err(e) => {
                    if !e.is_retryable() || attempt >= self.retry.max_attempts {
                        return Err(e);
                    }

                    let delay = self.retry.backoff(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Market data fetch failed, retrying..."
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    /// Validate a batch and step the engine through its timesteps.
    ///
    /// Invalid batches and timesteps that do not move time forward are
    /// dropped, never partially applied.
    fn process_batch(&mut self, batch: Vec<MarketObservation>) {
        let series = match ObservationSeries::new(batch) {
            Ok(series) => series,
            Err(e) => {
                warn!(error = %e, "Rejected market data batch");
                self.rejected_batches += 1;
                return;
            }
        };

        for timestep in series.timesteps() {
            let Some(timestamp) = timestep.first().map(MarketObservation::timestamp) else {
                continue;
            };
            if self.last_timestamp.is_some_and(|last| timestamp <= last) {
                warn!(
                    timestamp = %timestamp,
                    last = ?self.last_timestamp,
                    "Stale timestep, skipping"
                );
                self.rejected_batches += 1;
                continue;
            }

            self.engine.step(timestep);
            self.first_timestamp.get_or_insert(timestamp);
            self.last_timestamp = Some(timestamp);
            self.observations += timestep.len();
            debug!(
                timestamp = %timestamp,
                observations = timestep.len(),
                capital = %self.engine.portfolio().capital(),
                "Processed timestep"
            );
        }
    }
}
