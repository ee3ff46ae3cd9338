//! Application configuration
//!
//! One TOML file holds every section; any missing section or field takes its
//! default.

use crate::paper::PaperConfig;
use anyhow::{Context, Result};
use sentinel_backtest::{BacktestConfig, SyntheticConfig};
use sentinel_core::{ConfigError, RiskParameters, StrategyConfig, VolatilityConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Configuration file paths
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const CONFIG_PATH_ENV: &str = "SENTINEL_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub risk: RiskParameters,
    pub strategy: StrategyConfig,
    pub volatility: VolatilityConfig,
    pub backtest: BacktestConfig,
    pub synthetic: SyntheticConfig,
    pub paper: PaperConfig,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// An explicit path (CLI flag, then `SENTINEL_CONFIG`) must exist. The
    /// default path is optional and falls back to built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound(path.display().to_string()).into());
                }
                Self::from_file(&path)?
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    info!("Config file not found, using defaults");
                    Self::default()
                }
            }
        };

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.risk.validate()?;
        self.strategy.validate()?;
        self.volatility.validate()?;
        self.backtest.validate()?;
        self.synthetic.validate()?;
        self.paper.validate()?;
        Ok(())
    }
}
