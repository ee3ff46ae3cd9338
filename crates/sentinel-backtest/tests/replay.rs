use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sentinel_backtest::{
    BacktestConfig, BacktestReplayEngine, ObservationSeries, SyntheticConfig, SyntheticMarket,
};
use sentinel_core::{
    MarketObservation, RiskAssessment, RiskParameters, StrategyConfig, VolatilityConfig,
    VolatilityModelKind,
};
use sentinel_risk::{FixedRiskModel, RiskModel};

fn ts(hours: i64) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
        + Duration::hours(hours)
}

fn obs(
    symbol: &str,
    hours: i64,
    spot: Decimal,
    futures: Decimal,
    funding: Decimal,
) -> MarketObservation {
    MarketObservation::new(symbol, ts(hours), spot, futures, funding, vec![], vec![]).unwrap()
}

/// Default risk parameters with the notional limit at 100% of capital
fn full_position_limit() -> RiskParameters {
    RiskParameters {
        max_position_fraction: dec!(1),
        ..Default::default()
    }
}

fn fixed(var: f64) -> Box<dyn RiskModel> {
    Box::new(FixedRiskModel {
        forecast_volatility: Some(0.02),
        value_at_risk: Some(var),
        hedge_ratio: 1.0,
    })
}

/// Hedge ratio that moves after the first hour
struct DriftingHedge;

impl RiskModel for DriftingHedge {
    fn assess(&self, observation: &MarketObservation) -> RiskAssessment {
        RiskAssessment {
            symbol: observation.symbol().to_string(),
            forecast_volatility: Some(0.02),
            value_at_risk: Some(1000.0),
            hedge_ratio: if observation.timestamp() > ts(0) { 1.3 } else { 1.0 },
        }
    }
}

#[test]
fn test_end_to_end_single_trade() {
    let mut engine = BacktestReplayEngine::new(
        &RiskParameters::default(),
        StrategyConfig::default(),
        fixed(1000.0),
        dec!(1000000),
    );
    let series = ObservationSeries::new(
        (0..10)
            .map(|h| obs("BTC", h, dec!(500), dec!(505), dec!(0)))
            .collect(),
    )
    .unwrap();

    let results = engine.run_with_results(&series).unwrap();

    // One equity sample per step, but only the entry books P&L
    assert_eq!(results.equity_curve.len(), 10);
    assert_eq!(results.pnl_history.len(), 1);
    assert!(results.equity_curve.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(results.equity_curve, vec![dec!(1000050); 10]);
    assert_eq!(results.pnl_history, vec![dec!(50)]);
    assert_eq!(results.final_capital, dec!(1000050));
    assert_eq!(results.trades.len(), 1);

    assert_eq!(results.final_positions.len(), 1);
    assert_eq!(results.final_positions[0].size, 10);
    assert_eq!(results.final_positions[0].hedge_ratio, 1.0);
    assert_eq!(results.final_positions[0].opened_at, ts(0));
    assert!(results.halted.is_none());
}

#[test]
fn test_same_timestep_decisions_share_one_snapshot() {
    let mut engine = BacktestReplayEngine::new(
        &full_position_limit(),
        StrategyConfig::default(),
        fixed(1.0),
        dec!(1000),
    );
    // BTC books +1000 first; ETH must still be sized on the 1000 starting capital
    let series = ObservationSeries::new(vec![
        obs("BTC", 0, dec!(100), dec!(200), dec!(0)),
        obs("ETH", 0, dec!(100), dec!(101), dec!(0)),
        obs("SOL", 1, dec!(100), dec!(101), dec!(0)),
    ])
    .unwrap();

    let curve = engine.run(&series);

    let sizes: Vec<(&str, i64)> = engine
        .trades()
        .iter()
        .map(|t| (t.symbol.as_str(), t.size))
        .collect();
    // floor(0.01 * 1000 / 1) = 10 for both, then SOL sees 2010 capital.
    // The notional limit of capital / 100 units is never below these sizes.
    assert_eq!(sizes, vec![("BTC", 10), ("ETH", 10), ("SOL", 20)]);
    assert_eq!(curve, vec![dec!(2000), dec!(2010), dec!(2030)]);
}

#[test]
fn test_halt_is_sticky_for_the_rest_of_the_run() {
    let strategy = StrategyConfig {
        basis_threshold: dec!(0.5),
        ..Default::default()
    };
    let mut engine =
        BacktestReplayEngine::new(&full_position_limit(), strategy, fixed(1e-6), dec!(10000));
    // Funding-triggered long inside a wide basis deadband: 10 units (the full
    // notional limit at 1000) lose 400 each
    let series = ObservationSeries::new(vec![
        obs("BTC", 0, dec!(1000), dec!(600), dec!(0.01)),
        obs("ETH", 1, dec!(100), dec!(200), dec!(0)),
        obs("SOL", 2, dec!(100), dec!(200), dec!(0)),
    ])
    .unwrap();

    let results = engine.run_with_results(&series).unwrap();

    assert_eq!(results.pnl_history, vec![dec!(-4000)]);
    assert_eq!(results.equity_curve, vec![dec!(6000), dec!(6000), dec!(6000)]);

    let halt = results.halted.unwrap();
    assert_eq!(halt.step, 1);
    assert_eq!(halt.timestamp, ts(1));
    assert_eq!(halt.drawdown, dec!(0.4));

    assert!(engine.portfolio().trading_halted());
    assert!(!engine.portfolio().has_open_position("ETH"));
    assert!(!engine.portfolio().has_open_position("SOL"));
    assert_eq!(results.metrics.max_drawdown_pct, dec!(40));
}

#[test]
fn test_rehedge_books_no_pnl() {
    let mut engine = BacktestReplayEngine::new(
        &RiskParameters::default(),
        StrategyConfig::default(),
        Box::new(DriftingHedge),
        dec!(1000000),
    );
    let series = ObservationSeries::new(vec![
        obs("BTC", 0, dec!(500), dec!(505), dec!(0)),
        obs("BTC", 1, dec!(500), dec!(510), dec!(0)),
    ])
    .unwrap();

    let curve = engine.run(&series);

    assert_eq!(curve, vec![dec!(1000050), dec!(1000050)]);
    assert_eq!(engine.portfolio().pnl_history().len(), 1);
    let position = engine.portfolio().position("BTC").unwrap();
    assert_eq!(position.hedge_ratio, 1.3);
    assert_eq!(position.size, 10);
}

#[test]
fn test_deadband_series_stays_flat() {
    let mut engine = BacktestReplayEngine::new(
        &RiskParameters::default(),
        StrategyConfig::default(),
        fixed(1000.0),
        dec!(5000),
    );
    let series = ObservationSeries::new(
        (0..10)
            .map(|h| obs("BTC", h, dec!(1000), dec!(1004), dec!(0.0002)))
            .collect(),
    )
    .unwrap();

    assert_eq!(engine.run(&series), vec![dec!(5000); 10]);
    assert!(engine.trades().is_empty());
}

#[test]
fn test_synthetic_replay_is_deterministic() {
    let synthetic = SyntheticConfig {
        steps: 300,
        ..Default::default()
    };
    let series = SyntheticMarket::new(synthetic).unwrap().generate().unwrap();

    for model in [VolatilityModelKind::Garch, VolatilityModelKind::Ewma] {
        let volatility = VolatilityConfig {
            model,
            ..Default::default()
        };
        let build = || {
            BacktestReplayEngine::from_config(
                &RiskParameters::default(),
                &StrategyConfig::default(),
                &volatility,
                &BacktestConfig::default(),
            )
            .unwrap()
        };

        let first = build().run_with_results(&series).unwrap();
        let second = build().run_with_results(&series).unwrap();

        assert_eq!(first.equity_curve, second.equity_curve);
        assert_eq!(first.trades, second.trades);
        assert_eq!(first.equity_curve.len(), series.len());
        assert_eq!(first.pnl_history.len(), first.trades.len());
        assert!(!first.trades.is_empty(), "{model:?} replay never traded");
        for trade in &first.trades {
            let capital_before = trade.capital_after - trade.pnl;
            let notional = Decimal::from(trade.size.abs()) * trade.spot_price;
            assert!(notional <= dec!(0.10) * capital_before);
        }
    }
}

/// Collects formatted log output in memory
#[derive(Clone, Default)]
struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_replay_runs_inside_a_timed_span() {
    use tracing_subscriber::fmt::format::FmtSpan;

    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .with_span_events(FmtSpan::CLOSE)
        .finish();

    let series =
        ObservationSeries::new(vec![obs("BTC", 0, dec!(500), dec!(505), dec!(0))]).unwrap();
    tracing::subscriber::with_default(subscriber, || {
        BacktestReplayEngine::new(
            &RiskParameters::default(),
            StrategyConfig::default(),
            fixed(1000.0),
            dec!(1000000),
        )
        .run(&series);
    });

    let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("run{observations=1}"), "{output}");
    assert!(output.contains("close"), "{output}");
}
