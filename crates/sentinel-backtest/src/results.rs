//! Backtest results and performance metrics

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sentinel_core::{Position, TradeRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// When the drawdown halt first latched
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HaltEvent {
    /// Index into the equity curve of the first step evaluated while halted
    pub step: usize,
    pub timestamp: DateTime<Utc>,
    pub drawdown: Decimal,
}

/// Results of a backtest run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResults {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub observation_count: usize,
    pub initial_capital: Decimal,
    pub final_capital: Decimal,
    /// Executed trades, one per `pnl_history` entry
    pub trades: Vec<TradeRecord>,
    /// Capital after each replay step
    pub equity_curve: Vec<Decimal>,
    pub pnl_history: Vec<Decimal>,
    pub final_positions: Vec<Position>,
    pub halted: Option<HaltEvent>,
    pub metrics: PerformanceMetrics,
    /// Per-symbol breakdown
    pub symbol_breakdown: BTreeMap<String, SymbolPerformance>,
}

impl BacktestResults {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        time_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
        observation_count: usize,
        initial_capital: Decimal,
        final_capital: Decimal,
        trades: Vec<TradeRecord>,
        equity_curve: Vec<Decimal>,
        pnl_history: Vec<Decimal>,
        final_positions: Vec<Position>,
        halted: Option<HaltEvent>,
    ) -> Self {
        let metrics =
            PerformanceMetrics::calculate(&trades, &equity_curve, initial_capital, final_capital);
        let symbol_breakdown = Self::calculate_symbol_breakdown(&trades);

        Self {
            start_time: time_range.map(|(start, _)| start),
            end_time: time_range.map(|(_, end)| end),
            observation_count,
            initial_capital,
            final_capital,
            trades,
            equity_curve,
            pnl_history,
            final_positions,
            halted,
            metrics,
            symbol_breakdown,
        }
    }

    fn calculate_symbol_breakdown(trades: &[TradeRecord]) -> BTreeMap<String, SymbolPerformance> {
        let mut breakdown: BTreeMap<String, Vec<&TradeRecord>> = BTreeMap::new();

        for trade in trades {
            breakdown
                .entry(trade.symbol.clone())
                .or_default()
                .push(trade);
        }

        breakdown
            .into_iter()
            .map(|(symbol, symbol_trades)| {
                let trade_count = symbol_trades.len();
                let total_pnl: Decimal = symbol_trades.iter().map(|t| t.pnl).sum();
                let wins = symbol_trades.iter().filter(|t| t.pnl > Decimal::ZERO).count();

                (
                    symbol,
                    SymbolPerformance {
                        trade_count,
                        total_pnl,
                        win_rate: if trade_count > 0 {
                            Decimal::from(wins) / Decimal::from(trade_count)
                        } else {
                            Decimal::ZERO
                        },
                    },
                )
            })
            .collect()
    }

    /// Export results to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export trades to CSV string
    pub fn trades_to_csv(&self) -> String {
        let mut csv = String::from(
            "timestamp,symbol,size,hedge_ratio,spot_price,futures_price,basis,funding_rate,pnl,capital_after\n",
        );
        for trade in &self.trades {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{}\n",
                trade.timestamp.to_rfc3339(),
                trade.symbol,
                trade.size,
                trade.hedge_ratio,
                trade.spot_price,
                trade.futures_price,
                trade.basis,
                trade.funding_rate,
                trade.pnl,
                trade.capital_after,
            ));
        }
        csv
    }
}

/// Performance metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Total profit/loss
    pub total_pnl: Decimal,
    /// Return on capital percentage
    pub return_pct: Decimal,
    /// Win rate (percentage of profitable trades)
    pub win_rate: Decimal,
    /// Total number of trades
    pub trade_count: usize,
    /// Number of winning trades
    pub winning_trades: usize,
    /// Number of losing trades
    pub losing_trades: usize,
    /// Average trade P&L
    pub avg_trade_pnl: Decimal,
    /// Profit factor (gross profit / gross loss)
    pub profit_factor: Decimal,
    /// Maximum peak-to-trough drawdown of the equity curve, percent
    pub max_drawdown_pct: Decimal,
    /// Maximum drawdown in USD
    pub max_drawdown_usd: Decimal,
    /// Mean over standard deviation of per-step equity returns, not annualized
    pub sharpe_ratio: Decimal,
}

impl PerformanceMetrics {
    pub fn calculate(
        trades: &[TradeRecord],
        equity_curve: &[Decimal],
        initial_capital: Decimal,
        final_capital: Decimal,
    ) -> Self {
        let trade_count = trades.len();
        let total_pnl = final_capital - initial_capital;
        let return_pct = if initial_capital.is_zero() {
            Decimal::ZERO
        } else {
            (total_pnl / initial_capital) * dec!(100)
        };

        let winning: Vec<Decimal> = trades
            .iter()
            .map(|t| t.pnl)
            .filter(|pnl| *pnl > Decimal::ZERO)
            .collect();
        let losing: Vec<Decimal> = trades
            .iter()
            .map(|t| t.pnl)
            .filter(|pnl| *pnl < Decimal::ZERO)
            .collect();

        let win_rate = if trade_count > 0 {
            Decimal::from(winning.len()) / Decimal::from(trade_count) * dec!(100)
        } else {
            Decimal::ZERO
        };

        let avg_trade_pnl = if trade_count > 0 {
            trades.iter().map(|t| t.pnl).sum::<Decimal>() / Decimal::from(trade_count)
        } else {
            Decimal::ZERO
        };

        let gross_profit: Decimal = winning.iter().sum();
        let gross_loss: Decimal = losing.iter().map(|pnl| pnl.abs()).sum();

        let profit_factor = if gross_loss.is_zero() {
            if gross_profit.is_zero() {
                Decimal::ZERO
            } else {
                dec!(999.99) // Effectively infinite
            }
        } else {
            gross_profit / gross_loss
        };

        let (max_drawdown_pct, max_drawdown_usd) =
            Self::calculate_max_drawdown(equity_curve, initial_capital);
        let sharpe_ratio = Self::calculate_sharpe_ratio(equity_curve, initial_capital);

        Self {
            total_pnl,
            return_pct,
            win_rate,
            trade_count,
            winning_trades: winning.len(),
            losing_trades: losing.len(),
            avg_trade_pnl,
            profit_factor,
            max_drawdown_pct,
            max_drawdown_usd,
            sharpe_ratio,
        }
    }

    /// Largest peak-to-trough decline, with the initial capital as the first
    /// peak
    fn calculate_max_drawdown(equity_curve: &[Decimal], initial_capital: Decimal) -> (Decimal, Decimal) {
        let mut peak = initial_capital;
        let mut max_drawdown_usd = Decimal::ZERO;
        let mut max_drawdown_pct = Decimal::ZERO;

        for &equity in equity_curve {
            if equity > peak {
                peak = equity;
            }

            let drawdown_usd = peak - equity;
            let drawdown_pct = if peak.is_zero() {
                Decimal::ZERO
            } else {
                (drawdown_usd / peak) * dec!(100)
            };

            if drawdown_usd > max_drawdown_usd {
                max_drawdown_usd = drawdown_usd;
                max_drawdown_pct = drawdown_pct;
            }
        }

        (max_drawdown_pct, max_drawdown_usd)
    }

    fn calculate_sharpe_ratio(equity_curve: &[Decimal], initial_capital: Decimal) -> Decimal {
        if equity_curve.len() < 2 {
            return Decimal::ZERO;
        }

        let mut previous = initial_capital;
        let mut returns = Vec::with_capacity(equity_curve.len());
        for &equity in equity_curve {
            returns.push(if previous.is_zero() {
                Decimal::ZERO
            } else {
                (equity - previous) / previous
            });
            previous = equity;
        }

        let n = Decimal::from(returns.len());
        let mean_return = returns.iter().sum::<Decimal>() / n;

        let variance = returns
            .iter()
            .map(|r| {
                let diff = *r - mean_return;
                diff * diff
            })
            .sum::<Decimal>()
            / n;

        let std_dev = Self::decimal_sqrt(variance);
        if std_dev.is_zero() {
            return Decimal::ZERO;
        }

        (mean_return / std_dev).round_dp(6)
    }

    /// Newton-Raphson square root
    fn decimal_sqrt(n: Decimal) -> Decimal {
        if n.is_zero() || n.is_sign_negative() {
            return Decimal::ZERO;
        }

        let mut x = if n > Decimal::ONE { n / dec!(2) } else { Decimal::ONE };
        for _ in 0..50 {
            let next_x = (x + n / x) / dec!(2);
            if (next_x - x).abs() < dec!(0.0000000001) {
                return next_x;
            }
            x = next_x;
        }
        x
    }
}

/// Per-symbol performance breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolPerformance {
    pub trade_count: usize,
    pub total_pnl: Decimal,
    /// Fraction of profitable trades, 0 to 1
    pub win_rate: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_trade(symbol: &str, pnl: Decimal) -> TradeRecord {
        TradeRecord {
            symbol: symbol.to_string(),
            timestamp: Utc::now(),
            size: 10,
            hedge_ratio: 1.0,
            spot_price: dec!(500),
            futures_price: dec!(505),
            basis: dec!(0.01),
            funding_rate: dec!(0),
            pnl,
            capital_after: dec!(0),
        }
    }

    #[test]
    fn test_metrics_calculation() {
        let trades = vec![
            make_trade("BTC", dec!(10)),
            make_trade("BTC", dec!(-5)),
            make_trade("ETH", dec!(15)),
            make_trade("ETH", dec!(-3)),
        ];
        let curve = vec![dec!(1010), dec!(1005), dec!(1020), dec!(1017)];

        let metrics = PerformanceMetrics::calculate(&trades, &curve, dec!(1000), dec!(1017));

        assert_eq!(metrics.trade_count, 4);
        assert_eq!(metrics.winning_trades, 2);
        assert_eq!(metrics.losing_trades, 2);
        assert_eq!(metrics.total_pnl, dec!(17));
        assert_eq!(metrics.return_pct, dec!(1.7));
        assert_eq!(metrics.win_rate, dec!(50));
        assert_eq!(metrics.profit_factor, dec!(25) / dec!(8));
    }

    #[test]
    fn test_max_drawdown_from_equity_curve() {
        let curve = vec![dec!(110), dec!(90), dec!(95)];
        let (dd_pct, dd_usd) = PerformanceMetrics::calculate_max_drawdown(&curve, dec!(100));

        // Peak 110, trough 90
        assert_eq!(dd_usd, dec!(20));
        assert_eq!(dd_pct, dec!(20) / dec!(110) * dec!(100));
    }

    #[test]
    fn test_drawdown_below_initial_capital() {
        let curve = vec![dec!(80), dec!(85)];
        let (dd_pct, dd_usd) = PerformanceMetrics::calculate_max_drawdown(&curve, dec!(100));
        assert_eq!(dd_usd, dec!(20));
        assert_eq!(dd_pct, dec!(20));
    }

    #[test]
    fn test_flat_curve_has_zero_sharpe() {
        let curve = vec![dec!(100); 5];
        assert_eq!(
            PerformanceMetrics::calculate_sharpe_ratio(&curve, dec!(100)),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_positive_drift_has_positive_sharpe() {
        let curve = vec![dec!(101), dec!(101), dec!(103), dec!(103)];
        assert!(PerformanceMetrics::calculate_sharpe_ratio(&curve, dec!(100)) > Decimal::ZERO);
    }

    #[test]
    fn test_decimal_sqrt() {
        let result = PerformanceMetrics::decimal_sqrt(dec!(16));
        assert!((result - dec!(4)).abs() < dec!(0.0001));

        let result = PerformanceMetrics::decimal_sqrt(dec!(0.0004));
        assert!((result - dec!(0.02)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_symbol_breakdown_and_csv() {
        let trades = vec![make_trade("BTC", dec!(50)), make_trade("ETH", dec!(-20))];
        let results = BacktestResults::new(
            None,
            2,
            dec!(1000),
            dec!(1030),
            trades,
            vec![dec!(1050), dec!(1030)],
            vec![dec!(50), dec!(-20)],
            vec![],
            None,
        );

        assert_eq!(results.symbol_breakdown["BTC"].win_rate, dec!(1));
        assert_eq!(results.symbol_breakdown["ETH"].total_pnl, dec!(-20));

        let csv = results.trades_to_csv();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.lines().nth(1).unwrap().contains(",BTC,10,1,500,505,0.01,0,50,"));

        let json = results.to_json().unwrap();
        assert!(json.contains("\"equity_curve\""));
    }
}
