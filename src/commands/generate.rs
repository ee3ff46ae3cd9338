//! Synthetic data generation command

use crate::config::AppConfig;
use anyhow::{Context, Result};
use clap::Args;
use sentinel_backtest::{save_observations, SyntheticMarket};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Output JSON file
    #[arg(long)]
    pub out: PathBuf,

    /// Timesteps to generate (defaults to [synthetic].steps)
    #[arg(long)]
    pub steps: Option<usize>,

    /// RNG seed (defaults to [synthetic].seed)
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run_generate(config: &AppConfig, args: &GenerateArgs) -> Result<()> {
    let mut synthetic = config.synthetic.clone();
    if let Some(steps) = args.steps {
        synthetic.steps = steps;
    }
    if let Some(seed) = args.seed {
        synthetic.seed = seed;
    }

    let series = SyntheticMarket::new(synthetic)
        .context("Invalid synthetic market configuration")?
        .generate()?;

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    save_observations(&args.out, &series)
        .with_context(|| format!("Failed to write observations: {}", args.out.display()))?;

    println!(
        "Wrote {} observations ({} symbols) to {}",
        series.len(),
        series.symbols().len(),
        args.out.display()
    );
    Ok(())
}
