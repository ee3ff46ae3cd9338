//! Historical observation loading and ordering

use crate::error::{BacktestError, Result};
use chrono::{DateTime, Utc};
use sentinel_core::{MarketObservation, ValidationError};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Validated, timestamp-ordered observations ready for replay.
///
/// Sorting is stable, so observations sharing a timestamp keep their input
/// order. A (symbol, timestamp) pair appears at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationSeries {
    observations: Vec<MarketObservation>,
}

impl ObservationSeries {
    pub fn new(mut observations: Vec<MarketObservation>) -> Result<Self> {
        observations.sort_by_key(|o| o.timestamp());

        let mut seen = HashSet::with_capacity(observations.len());
        for obs in &observations {
            if !seen.insert((obs.symbol(), obs.timestamp())) {
                return Err(ValidationError::DuplicateObservation {
                    symbol: obs.symbol().to_string(),
                    timestamp: obs.timestamp().to_rfc3339(),
                }
                .into());
            }
        }

        Ok(Self { observations })
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarketObservation> {
        self.observations.iter()
    }

    pub fn as_slice(&self) -> &[MarketObservation] {
        &self.observations
    }

    /// Observations grouped by timestamp, in order
    pub fn timesteps(&self) -> impl Iterator<Item = &[MarketObservation]> {
        self.observations
            .chunk_by(|a, b| a.timestamp() == b.timestamp())
    }

    /// Distinct symbols, sorted
    pub fn symbols(&self) -> BTreeSet<&str> {
        self.observations.iter().map(|o| o.symbol()).collect()
    }

    /// First and last timestamp
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.observations.first()?;
        let last = self.observations.last()?;
        Some((first.timestamp(), last.timestamp()))
    }

    /// Keep only the given symbols
    pub fn retain_symbols(mut self, symbols: &[String]) -> Self {
        let before = self.observations.len();
        self.observations
            .retain(|o| symbols.iter().any(|s| s == o.symbol()));
        debug!(
            before,
            after = self.observations.len(),
            "Applied symbol filter"
        );
        self
    }

    pub fn into_inner(self) -> Vec<MarketObservation> {
        self.observations
    }
}

/// Load a JSON array of observations.
///
/// Every record goes through the same validation as
/// [`MarketObservation::new`]; the first invalid record fails the load.
pub fn load_observations(path: impl AsRef<Path>) -> Result<ObservationSeries> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let observations: Vec<MarketObservation> = serde_json::from_str(&content)?;

    if observations.is_empty() {
        return Err(BacktestError::NoData);
    }

    let series = ObservationSeries::new(observations)?;
    info!(
        path = %path.display(),
        count = series.len(),
        symbols = series.symbols().len(),
        "Loaded observations"
    );
    Ok(series)
}

/// Write observations as a pretty-printed JSON array
pub fn save_observations(path: impl AsRef<Path>, series: &ObservationSeries) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(series.as_slice())?;
    fs::write(path, json)?;
    info!(path = %path.display(), count = series.len(), "Saved observations");
    Ok(())
}
