//! Basis Sentinel - risk-managed basis and funding strategy
//!
//! Replays market observations through the volatility, VaR, hedge-ratio and
//! drawdown models, or runs the same engine live against a paper data source.

mod commands;
mod config;
mod paper;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{BacktestArgs, GenerateArgs, PaperArgs};
use config::AppConfig;
use sentinel_observability::init_logging_from_env;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "sentinel", version, about = "Risk-managed basis/funding strategy")]
struct Cli {
    /// Configuration file (defaults to SENTINEL_CONFIG, then config/default.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay observations and report performance
    Backtest(BacktestArgs),
    /// Write a synthetic observation file
    Generate(GenerateArgs),
    /// Run a paper session against the synthetic feed
    Paper(PaperArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging_from_env().context("Failed to initialize logging")?;

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    match &cli.command {
        Command::Backtest(args) => commands::run_backtest(&config, args),
        Command::Generate(args) => commands::run_generate(&config, args),
        Command::Paper(args) => commands::run_paper(&config, args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_backtest_overrides() {
        let cli = Cli::try_parse_from([
            "sentinel",
            "backtest",
            "--capital",
            "250000",
            "--output",
            "json",
            "--config",
            "custom.toml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        match cli.command {
            Command::Backtest(args) => {
                assert_eq!(args.capital, Some(rust_decimal::Decimal::from(250_000)));
                assert_eq!(args.output, commands::backtest::OutputFormat::Json);
                assert!(args.data.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_generate_requires_output_path() {
        assert!(Cli::try_parse_from(["sentinel", "generate"]).is_err());
        assert!(Cli::try_parse_from(["sentinel", "generate", "--out", "obs.json"]).is_ok());
    }
}
