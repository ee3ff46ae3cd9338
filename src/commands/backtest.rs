//! Backtest CLI command implementation

use crate::config::AppConfig;
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use sentinel_backtest::{
    load_observations, BacktestReplayEngine, BacktestResults, ObservationSeries, SyntheticMarket,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Args)]
pub struct BacktestArgs {
    /// JSON observation file (defaults to [backtest].data_path, then synthetic data)
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Initial capital in USD
    #[arg(long)]
    pub capital: Option<Decimal>,

    /// Output format
    #[arg(long, short, default_value = "text")]
    pub output: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// Run a backtest with the specified parameters
pub fn run_backtest(config: &AppConfig, args: &BacktestArgs) -> Result<()> {
    let mut backtest = config.backtest.clone();
    if let Some(capital) = args.capital {
        backtest.initial_capital = capital;
    }
    if let Some(path) = &args.data {
        backtest.data_path = Some(path.clone());
    }

    let series = load_series(config, &backtest.data_path)?;
    let series = match &backtest.symbol_filter {
        Some(symbols) => series.retain_symbols(symbols),
        None => series,
    };

    let mut engine = BacktestReplayEngine::from_config(
        &config.risk,
        &config.strategy,
        &config.volatility,
        &backtest,
    )
    .context("Failed to create backtest engine")?;

    let results = engine
        .run_with_results(&series)
        .context("Backtest failed")?;

    match args.output {
        OutputFormat::Json => println!("{}", results.to_json()?),
        OutputFormat::Csv => print!("{}", results.trades_to_csv()),
        OutputFormat::Text => print_results_text(&results),
    }

    Ok(())
}

fn load_series(config: &AppConfig, data_path: &Option<PathBuf>) -> Result<ObservationSeries> {
    match data_path {
        Some(path) => load_observations(path)
            .with_context(|| format!("Failed to load observations: {}", path.display())),
        None => {
            info!(
                seed = config.synthetic.seed,
                steps = config.synthetic.steps,
                "No data file given, generating synthetic market"
            );
            let mut market = SyntheticMarket::new(config.synthetic.clone())
                .context("Invalid synthetic market configuration")?;
            Ok(market.generate()?)
        }
    }
}

pub fn print_results_text(results: &BacktestResults) {
    let metrics = &results.metrics;

    println!("\n╔════════════════════════════════════════════════════════════════╗");
    println!("║                    BACKTEST RESULTS                            ║");
    println!("╠════════════════════════════════════════════════════════════════╣");
    if let (Some(start), Some(end)) = (results.start_time, results.end_time) {
        println!(
            "║ Period:          {:<20} to {:<20}  ║",
            start.format("%Y-%m-%d %H:%M"),
            end.format("%Y-%m-%d %H:%M")
        );
    }
    println!("║ Observations:    {:<46}║", results.observation_count);
    println!("╠════════════════════════════════════════════════════════════════╣");
    println!("║                    PERFORMANCE METRICS                         ║");
    println!("╠════════════════════════════════════════════════════════════════╣");
    println!("║ Initial Capital:  ${:<43.2} ║", results.initial_capital);
    println!("║ Final Capital:    ${:<43.2} ║", results.final_capital);
    println!("║ Total P&L:        ${:<43.2} ║", metrics.total_pnl);
    println!("║ Return:           {:<43.4}% ║", metrics.return_pct);
    println!("╠════════════════════════════════════════════════════════════════╣");
    println!("║ Trade Count:      {:<44} ║", metrics.trade_count);
    println!("║ Winning Trades:   {:<44} ║", metrics.winning_trades);
    println!("║ Losing Trades:    {:<44} ║", metrics.losing_trades);
    println!("║ Win Rate:         {:<43.2}% ║", metrics.win_rate);
    println!("║ Avg Trade P&L:    ${:<43.2} ║", metrics.avg_trade_pnl);
    println!("║ Profit Factor:    {:<44.2} ║", metrics.profit_factor);
    println!("╠════════════════════════════════════════════════════════════════╣");
    println!("║ Max Drawdown:     {:<43.2}% ║", metrics.max_drawdown_pct);
    println!("║ Max Drawdown $:   ${:<43.2} ║", metrics.max_drawdown_usd);
    println!("║ Sharpe (step):    {:<44.4} ║", metrics.sharpe_ratio);
    println!("╠════════════════════════════════════════════════════════════════╣");
    match &results.halted {
        Some(halt) => println!(
            "║ Trading Halted:   step {:<6} drawdown {:<24.2}% ║",
            halt.step,
            halt.drawdown * Decimal::ONE_HUNDRED
        ),
        None => println!("║ Trading Halted:   {:<44} ║", "no"),
    }
    println!("╚════════════════════════════════════════════════════════════════╝\n");

    if !results.symbol_breakdown.is_empty() {
        println!("Symbol Breakdown:");
        println!("─────────────────────────────────────────────────────────────────");
        for (symbol, perf) in &results.symbol_breakdown {
            println!(
                "  {}: {} trades, P&L: ${:.2}, Win Rate: {:.1}%",
                symbol,
                perf.trade_count,
                perf.total_pnl,
                perf.win_rate * Decimal::ONE_HUNDRED
            );
        }
        println!();
    }

    if !results.final_positions.is_empty() {
        println!("Open Positions:");
        println!("─────────────────────────────────────────────────────────────────");
        for position in &results.final_positions {
            println!(
                "  {}: size {}, hedge ratio {:.4}, opened {}",
                position.symbol,
                position.size,
                position.hedge_ratio,
                position.opened_at.format("%Y-%m-%d %H:%M")
            );
        }
        println!();
    }
}
