//! Basis/Funding Decision Engine
//!
//! Turns one observation plus its risk assessment into an [`Action`]. An
//! entry is triggered when the futures basis or the funding rate leaves its
//! deadband; the size comes from the VaR-based [`PositionSizer`] and the hedge
//! from the assessment. Existing positions are only re-hedged, never added to.
//!
//! `decide` reads the portfolio and never mutates it, so a batch of decisions
//! can be evaluated against one snapshot before any of them is applied.

use rust_decimal::Decimal;
use sentinel_core::{
    Action, MarketObservation, Portfolio, RiskAssessment, RiskParameters, StrategyConfig,
    TradeRecord,
};
use sentinel_risk::PositionSizer;
use tracing::{debug, info, warn};

/// Per-symbol state, derived from the portfolio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    NoPosition,
    Positioned,
}

/// Which signal left its deadband
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySignal {
    Basis,
    Funding,
}

impl EntrySignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntrySignal::Basis => "basis",
            EntrySignal::Funding => "funding",
        }
    }
}

/// A triggered entry: the signal and the trade direction (+1 long spot /
/// short futures, -1 the reverse)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub signal: EntrySignal,
    pub direction: i64,
}

/// Stateless decision logic; all state lives in the [`Portfolio`]
#[derive(Debug, Clone)]
pub struct StrategyDecisionEngine {
    config: StrategyConfig,
    sizer: PositionSizer,
}

impl StrategyDecisionEngine {
    pub fn new(config: StrategyConfig, sizer: PositionSizer) -> Self {
        Self { config, sizer }
    }

    pub fn from_config(config: StrategyConfig, params: &RiskParameters) -> Self {
        Self::new(config, PositionSizer::from_params(params))
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn position_state(&self, symbol: &str, portfolio: &Portfolio) -> PositionState {
        if portfolio.has_open_position(symbol) {
            PositionState::Positioned
        } else {
            PositionState::NoPosition
        }
    }

    /// Check the basis and funding deadbands.
    ///
    /// Both bounds are strict: a value exactly at its threshold does not
    /// trigger. When both fire, the basis sets the direction.
    pub fn trigger(&self, observation: &MarketObservation) -> Option<Trigger> {
        let basis = observation.basis();
        if basis.abs() > self.config.basis_threshold {
            return Some(Trigger {
                signal: EntrySignal::Basis,
                direction: signum(basis),
            });
        }

        let funding = observation.funding_rate();
        if funding.abs() > self.config.funding_threshold {
            return Some(Trigger {
                signal: EntrySignal::Funding,
                direction: signum(funding),
            });
        }

        None
    }

    /// Decide what to do for one symbol at one timestep
    pub fn decide(
        &self,
        observation: &MarketObservation,
        assessment: &RiskAssessment,
        portfolio: &Portfolio,
    ) -> Action {
        if portfolio.trading_halted() {
            return Action::Hold;
        }

        let Some(trigger) = self.trigger(observation) else {
            return Action::Hold;
        };

        let symbol = observation.symbol();
        match self.position_state(symbol, portfolio) {
            PositionState::NoPosition => {
                let size = self.sizer.size(
                    portfolio.capital(),
                    observation.spot_price(),
                    assessment.value_at_risk,
                );
                if size == 0 {
                    debug!(
                        symbol = %symbol,
                        signal = trigger.signal.as_str(),
                        var = ?assessment.value_at_risk,
                        "Entry triggered but sized to zero"
                    );
                    return Action::Hold;
                }

                Action::OpenHedgedPosition {
                    size: size.saturating_mul(trigger.direction),
                    hedge_ratio: assessment.hedge_ratio,
                }
            }
            PositionState::Positioned => {
                let current = portfolio
                    .position(symbol)
                    .map(|p| p.hedge_ratio)
                    .unwrap_or(assessment.hedge_ratio);
                let drift = (assessment.hedge_ratio - current).abs();

                if drift > self.config.hedge_rebalance_tolerance {
                    Action::AdjustHedge {
                        new_ratio: assessment.hedge_ratio,
                    }
                } else {
                    Action::Hold
                }
            }
        }
    }

    /// Execute an action against the portfolio.
    ///
    /// Returns the trade record when the action was a trade. Re-hedging
    /// changes the futures leg only and books no P&L.
    pub fn apply(
        &self,
        action: Action,
        observation: &MarketObservation,
        portfolio: &mut Portfolio,
    ) -> Option<TradeRecord> {
        match action {
            Action::Hold => None,
            Action::OpenHedgedPosition { size: 0, .. } => None,
            Action::OpenHedgedPosition { size, hedge_ratio } => {
                let spread = observation.futures_price() - observation.spot_price();
                let pnl = Decimal::from(size) * spread;

                let trade = TradeRecord {
                    symbol: observation.symbol().to_string(),
                    timestamp: observation.timestamp(),
                    size,
                    hedge_ratio,
                    spot_price: observation.spot_price(),
                    futures_price: observation.futures_price(),
                    basis: observation.basis(),
                    funding_rate: observation.funding_rate(),
                    pnl,
                    capital_after: portfolio.capital() + pnl,
                };
                portfolio.record_trade(&trade);

                info!(
                    symbol = %trade.symbol,
                    size,
                    hedge_ratio,
                    basis = %trade.basis,
                    pnl = %pnl,
                    capital = %portfolio.capital(),
                    "Opened hedged position"
                );
                Some(trade)
            }
            Action::AdjustHedge { new_ratio } => {
                let symbol = observation.symbol();
                if portfolio.set_hedge_ratio(symbol, new_ratio, observation.timestamp()) {
                    debug!(symbol = %symbol, new_ratio, "Adjusted hedge ratio");
                } else {
                    warn!(symbol = %symbol, new_ratio, "No open position to re-hedge");
                }
                None
            }
        }
    }
}

fn signum(value: Decimal) -> i64 {
    if value.is_sign_negative() {
        -1
    } else {
        1
    }
}
