//! Backtest engine for replaying historical observations through the strategy
//!
//! The replay is single-threaded and deterministic: no wall clock and no
//! randomness inside the loop. Observations sharing a timestamp form one
//! timestep. The drawdown monitor sees the capital once at the start of the
//! timestep, every decision of the timestep is taken against that same
//! portfolio snapshot, and the actions are then applied in input order with
//! one equity sample per observation.

use crate::config::BacktestConfig;
use crate::data_loader::ObservationSeries;
use crate::error::{BacktestError, Result};
use crate::results::{BacktestResults, HaltEvent};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sentinel_core::{
    Action, MarketObservation, Portfolio, RiskParameters, StrategyConfig, TradeRecord,
    VolatilityConfig,
};
use sentinel_risk::{DrawdownMonitor, RiskAssessor, RiskModel};
use sentinel_strategy::StrategyDecisionEngine;
use tracing::{debug, info, instrument, warn};

/// Replays an [`ObservationSeries`] and produces an equity curve
pub struct BacktestReplayEngine {
    initial_capital: Decimal,
    risk_model: Box<dyn RiskModel>,
    strategy: StrategyDecisionEngine,
    drawdown: DrawdownMonitor,
    portfolio: Portfolio,
    trades: Vec<TradeRecord>,
    halted: Option<HaltEvent>,
}

impl BacktestReplayEngine {
    pub fn new(
        params: &RiskParameters,
        strategy: StrategyConfig,
        risk_model: Box<dyn RiskModel>,
        initial_capital: Decimal,
    ) -> Self {
        Self {
            initial_capital,
            risk_model,
            strategy: StrategyDecisionEngine::from_config(strategy, params),
            drawdown: DrawdownMonitor::from_params(params),
            portfolio: Portfolio::new(initial_capital),
            trades: Vec::new(),
            halted: None,
        }
    }

    /// Validate all configuration and build an engine with the standard
    /// [`RiskAssessor`]
    pub fn from_config(
        params: &RiskParameters,
        strategy: &StrategyConfig,
        volatility: &VolatilityConfig,
        backtest: &BacktestConfig,
    ) -> Result<Self> {
        params.validate()?;
        strategy.validate()?;
        volatility.validate()?;
        backtest.validate()?;

        let risk_model = Box::new(RiskAssessor::from_config(params, volatility));
        Ok(Self::new(
            params,
            strategy.clone(),
            risk_model,
            backtest.initial_capital,
        ))
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn drawdown(&self) -> &DrawdownMonitor {
        &self.drawdown
    }

    pub fn halted(&self) -> Option<&HaltEvent> {
        self.halted.as_ref()
    }

    /// Restore the initial portfolio and lift any halt
    pub fn reset(&mut self) {
        self.portfolio.reset(self.initial_capital);
        self.drawdown.reset();
        self.trades.clear();
        self.halted = None;
    }

    /// Replay the series from a clean state and return the equity curve,
    /// one entry per observation
    #[instrument(skip_all, fields(observations = series.len()))]
    pub fn run(&mut self, series: &ObservationSeries) -> Vec<Decimal> {
        self.reset();

        info!(
            observations = series.len(),
            symbols = series.symbols().len(),
            initial_capital = %self.initial_capital,
            "Starting backtest replay"
        );

        for timestep in series.timesteps() {
            self.step(timestep);
        }

        info!(
            final_capital = %self.portfolio.capital(),
            trades = self.trades.len(),
            halted = self.portfolio.trading_halted(),
            "Backtest replay complete"
        );

        self.portfolio.equity_curve().to_vec()
    }

    /// Replay the series and summarize the run
    pub fn run_with_results(&mut self, series: &ObservationSeries) -> Result<BacktestResults> {
        if series.is_empty() {
            return Err(BacktestError::NoData);
        }

        self.run(series);
        let results = self.results(series.time_range(), series.len());

        info!(
            total_pnl = %results.metrics.total_pnl,
            trade_count = results.metrics.trade_count,
            win_rate = %results.metrics.win_rate,
            max_drawdown_pct = %results.metrics.max_drawdown_pct,
            sharpe = %results.metrics.sharpe_ratio,
            "Backtest complete"
        );

        Ok(results)
    }

    /// Summarize the current state of the run
    pub fn results(
        &self,
        time_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
        observation_count: usize,
    ) -> BacktestResults {
        BacktestResults::new(
            time_range,
            observation_count,
            self.initial_capital,
            self.portfolio.capital(),
            self.trades.clone(),
            self.portfolio.equity_curve().to_vec(),
            self.portfolio.pnl_history().to_vec(),
            self.portfolio
                .positions()
                .values()
                .filter(|p| p.is_open())
                .cloned()
                .collect(),
            self.halted,
        )
    }

    /// Process one group of observations sharing a timestamp.
    ///
    /// The caller supplies timesteps in increasing timestamp order with each
    /// symbol at most once, as [`ObservationSeries::timesteps`] does.
    pub fn step(&mut self, timestep: &[MarketObservation]) {
        let Some(first) = timestep.first() else {
            return;
        };

        let halted = self.drawdown.update(self.portfolio.capital());
        if halted && self.halted.is_none() {
            let event = HaltEvent {
                step: self.portfolio.equity_curve().len(),
                timestamp: first.timestamp(),
                drawdown: self.drawdown.current_drawdown(),
            };
            warn!(
                step = event.step,
                timestamp = %event.timestamp,
                status = %self.drawdown.status(),
                "Trading halted for the rest of the run"
            );
            self.halted = Some(event);
        }
        self.portfolio.set_trading_halted(halted);

        let actions: Vec<Action> = timestep
            .iter()
            .map(|observation| {
                let assessment = self.risk_model.assess(observation);
                let action = self.strategy.decide(observation, &assessment, &self.portfolio);
                if !action.is_hold() {
                    debug!(
                        symbol = %observation.symbol(),
                        action = action.kind(),
                        volatility = ?assessment.forecast_volatility,
                        var = ?assessment.value_at_risk,
                        hedge_ratio = assessment.hedge_ratio,
                        "Decision"
                    );
                }
                action
            })
            .collect();

        for (observation, action) in timestep.iter().zip(actions) {
            if let Some(trade) = self.strategy.apply(action, observation, &mut self.portfolio) {
                self.trades.push(trade);
            }
            self.portfolio.mark_equity();
        }
    }
}
