//! Capital and position ledger for a single run

use crate::types::{Position, Symbol, TradeRecord};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// The one mutable aggregate of a run.
///
/// `pnl_history` grows once per executed trade and `equity_curve` once per
/// replay step. `trading_halted` only ever goes from false to true; the only
/// way back is [`Portfolio::reset`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    initial_capital: Decimal,
    capital: Decimal,
    positions: BTreeMap<Symbol, Position>,
    pnl_history: Vec<Decimal>,
    equity_curve: Vec<Decimal>,
    trading_halted: bool,
}

impl Portfolio {
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            capital: initial_capital,
            positions: BTreeMap::new(),
            pnl_history: Vec::new(),
            equity_curve: Vec::new(),
            trading_halted: false,
        }
    }

    /// Clear all state and start again from `initial_capital`
    pub fn reset(&mut self, initial_capital: Decimal) {
        *self = Self::new(initial_capital);
    }

    pub fn initial_capital(&self) -> Decimal {
        self.initial_capital
    }

    pub fn capital(&self) -> Decimal {
        self.capital
    }

    pub fn positions(&self) -> &BTreeMap<Symbol, Position> {
        &self.positions
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn has_open_position(&self, symbol: &str) -> bool {
        self.positions.get(symbol).is_some_and(Position::is_open)
    }

    pub fn pnl_history(&self) -> &[Decimal] {
        &self.pnl_history
    }

    pub fn equity_curve(&self) -> &[Decimal] {
        &self.equity_curve
    }

    pub fn trading_halted(&self) -> bool {
        self.trading_halted
    }

    /// Latch the halt flag. A `false` argument never clears it.
    pub fn set_trading_halted(&mut self, halted: bool) {
        self.trading_halted |= halted;
    }

    /// Add `size` to the symbol's position and book the realized P&L
    pub fn record_trade(&mut self, trade: &TradeRecord) {
        let position = self
            .positions
            .entry(trade.symbol.clone())
            .or_insert_with(|| Position {
                symbol: trade.symbol.clone(),
                size: 0,
                hedge_ratio: trade.hedge_ratio,
                opened_at: trade.timestamp,
                updated_at: trade.timestamp,
            });

        if position.size == 0 {
            position.opened_at = trade.timestamp;
        }
        position.size += trade.size;
        position.hedge_ratio = trade.hedge_ratio;
        position.updated_at = trade.timestamp;

        self.pnl_history.push(trade.pnl);
        self.capital += trade.pnl;

        debug!(
            symbol = %trade.symbol,
            size = trade.size,
            position_size = position.size,
            pnl = %trade.pnl,
            capital = %self.capital,
            "Recorded trade"
        );
    }

    /// Re-weight the futures leg of an existing position.
    ///
    /// Returns false when there is no position to adjust.
    pub fn set_hedge_ratio(&mut self, symbol: &str, ratio: f64, at: DateTime<Utc>) -> bool {
        match self.positions.get_mut(symbol) {
            Some(position) if position.is_open() => {
                position.hedge_ratio = ratio;
                position.updated_at = at;
                true
            }
            _ => false,
        }
    }

    /// Append the current capital as the next equity sample
    pub fn mark_equity(&mut self) {
        self.equity_curve.push(self.capital);
    }

    /// Realized P&L since the start of the run
    pub fn total_pnl(&self) -> Decimal {
        self.capital - self.initial_capital
    }
}
