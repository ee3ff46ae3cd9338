//! Paper trading command

use crate::commands::backtest::print_results_text;
use crate::config::AppConfig;
use crate::paper::{PaperSession, SyntheticSource};
use anyhow::{Context, Result};
use clap::Args;
use sentinel_backtest::{BacktestReplayEngine, SyntheticMarket};
use tracing::info;

#[derive(Debug, Args)]
pub struct PaperArgs {
    /// Stop after this many timesteps (defaults to [synthetic].steps)
    #[arg(long)]
    pub steps: Option<usize>,

    /// Milliseconds between timesteps (defaults to [paper].poll_interval_ms)
    #[arg(long)]
    pub interval_ms: Option<u64>,
}

pub async fn run_paper(config: &AppConfig, args: &PaperArgs) -> Result<()> {
    let mut paper = config.paper.clone();
    if let Some(interval) = args.interval_ms {
        paper.poll_interval_ms = interval;
    }
    let steps = args.steps.unwrap_or(config.synthetic.steps);

    let market = SyntheticMarket::new(config.synthetic.clone())
        .context("Invalid synthetic market configuration")?;
    let engine = BacktestReplayEngine::from_config(
        &config.risk,
        &config.strategy,
        &config.volatility,
        &config.backtest,
    )
    .context("Failed to create replay engine")?;

    let mut session = PaperSession::new(SyntheticSource::new(market, steps), engine, &paper);

    let interrupted = tokio::select! {
        _ = session.run(None) => false,
        _ = tokio::signal::ctrl_c() => true,
    };
    if interrupted {
        info!("Shutdown signal received");
    }

    println!("Session state: {}", session.state().as_str());
    if session.rejected_batches() > 0 {
        println!("Rejected batches: {}", session.rejected_batches());
    }
    print_results_text(&session.results());
    Ok(())
}
