pub mod backtest;
pub mod generate;
pub mod paper;

pub use backtest::{run_backtest, BacktestArgs};
pub use generate::{run_generate, GenerateArgs};
pub use paper::{run_paper, PaperArgs};
