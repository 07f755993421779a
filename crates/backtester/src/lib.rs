// In crates/backtester/src/lib.rs

pub mod error;
pub mod optimizer;
pub mod walk_forward;

pub use error::{Error, Result};
pub use optimizer::{ParamGrid, SweepOutcome, SweepRun, sweep};
pub use walk_forward::{WalkForwardOptions, WalkForwardReport, walk_forward};

use analytics::{Metrics, compute_metrics};
use core_types::{Bar, EquityPoint, StrategyConfig, TradeRecord};
use rust_decimal::Decimal;
use serde::Serialize;
use strategies::StrategyKind;
use tracing::info;

/// Fewest bars a backtest will run on.
pub const MIN_BARS: usize = 5;

/// Rejects bar series too short to backtest.
pub fn validate_bars(bars: &[Bar]) -> Result<()> {
    if bars.len() < MIN_BARS {
        return Err(Error::InsufficientData {
            found: bars.len(),
            required: MIN_BARS,
        });
    }
    Ok(())
}

/// Everything a single backtest produces.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub strategy: &'static str,
    pub initial_capital: Decimal,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: Metrics,
}

/// The main engine for running historical backtests.
#[derive(Debug, Clone)]
pub struct Backtester {
    strategy: StrategyKind,
    initial_capital: Decimal,
}

impl Backtester {
    /// Resolves the strategy named in `config`.
    pub fn new(config: &StrategyConfig, initial_capital: Decimal) -> Result<Self> {
        Ok(Self::with_strategy(StrategyKind::from_config(config)?, initial_capital))
    }

    pub fn with_strategy(strategy: StrategyKind, initial_capital: Decimal) -> Self {
        Self {
            strategy,
            initial_capital,
        }
    }

    pub fn strategy(&self) -> &StrategyKind {
        &self.strategy
    }

    /// Replays `bars` through the strategy and scores the result.
    pub fn run(&self, bars: &[Bar]) -> Result<BacktestReport> {
        validate_bars(bars)?;
        let report = self.evaluate(bars);
        info!(
            strategy = report.strategy,
            bars = bars.len(),
            trades = report.metrics.total_trades,
            cagr = report.metrics.cagr,
            sharpe = report.metrics.sharpe_ratio,
            max_drawdown = report.metrics.max_drawdown,
            "Backtest complete."
        );
        Ok(report)
    }

    /// Simulation and metrics without the bar-count check. Used for the
    /// short windows of a walk-forward fold.
    pub(crate) fn evaluate(&self, bars: &[Bar]) -> BacktestReport {
        let result = self.strategy.simulate(bars, self.initial_capital);
        let metrics = compute_metrics(&result.trades, self.initial_capital, &result.equity_curve);
        BacktestReport {
            strategy: self.strategy.id(),
            initial_capital: self.initial_capital,
            trades: result.trades,
            equity_curve: result.equity_curve,
            metrics,
        }
    }
}

/// Validates `bars`, resolves the strategy in `config` and runs one backtest.
pub fn run_backtest(config: &StrategyConfig, bars: &[Bar], initial_capital: Decimal) -> Result<BacktestReport> {
    validate_bars(bars)?;
    Backtester::new(config, initial_capital)?.run(bars)
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use core_types::Bar;
    use rust_decimal::Decimal;
    use rust_decimal::prelude::FromPrimitive;

    pub fn day(i: usize) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap() + Duration::days(i as i64)
    }

    /// Bars whose open/high/low/close all equal the given close.
    pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let price = Decimal::from_f64(*c).unwrap().round_dp(2);
                Bar {
                    timestamp: day(i),
                    open: price,
                    high: price,
                    low: price,
                    close: price,
                    volume: Decimal::from(10_000),
                }
            })
            .collect()
    }

    /// A drifting oscillation with enough swings to trigger every strategy.
    pub fn wavy_bars(n: usize) -> Vec<Bar> {
        let closes: Vec<f64> = (0..n)
            .map(|i| {
                let x = i as f64;
                100.0 + 8.0 * (x * 0.35).sin() + 3.0 * (x * 1.7).cos() + 0.05 * x
            })
            .collect();
        bars_from_closes(&closes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bars_from_closes, day};
    use core_types::Side;
    use rust_decimal_macros::dec;

    fn crossover_config() -> StrategyConfig {
        let mut config = StrategyConfig::with_defaults("ma_crossover");
        config.set("shortPeriod", toml::Value::Integer(2));
        config.set("longPeriod", toml::Value::Integer(3));
        config
    }

    #[test]
    fn too_few_bars_are_rejected() {
        let bars = bars_from_closes(&[1.0, 2.0, 3.0, 4.0]);
        assert!(matches!(
            validate_bars(&bars),
            Err(Error::InsufficientData { found: 4, required: MIN_BARS })
        ));
        assert!(run_backtest(&crossover_config(), &bars, dec!(10_000)).is_err());
        assert!(validate_bars(&bars_from_closes(&[1.0; 5])).is_ok());
    }

    #[test]
    fn engineered_crossover_produces_one_long_trade() {
        let closes = [100.0, 100.0, 100.0, 100.0, 100.0, 110.0, 110.0, 110.0, 110.0, 90.0, 90.0, 90.0];
        let bars = bars_from_closes(&closes);
        let report = run_backtest(&crossover_config(), &bars, dec!(10_000)).unwrap();

        assert_eq!(report.strategy, "ma_crossover");
        assert_eq!(report.trades.len(), 1);
        let trade = &report.trades[0];
        assert_eq!(trade.side, Side::Long);
        assert_eq!((trade.entry_date, trade.entry_price), (day(5), dec!(110)));
        assert_eq!((trade.exit_date, trade.exit_price), (day(9), dec!(90)));
        assert_eq!(report.metrics.total_trades, 1);
        assert_eq!(report.metrics.win_rate, 0.0);
        assert_eq!(report.metrics.avg_loss, dec!(180));
        assert_eq!(report.equity_curve.len(), closes.len());
    }

    #[test]
    fn no_trades_means_zero_metrics() {
        let bars = bars_from_closes(&[100.0; 30]);
        let report = run_backtest(&StrategyConfig::with_defaults("mean_reversion"), &bars, dec!(5_000)).unwrap();
        assert!(report.trades.is_empty());
        assert_eq!(report.metrics, Metrics::default());
        assert!(report.equity_curve.iter().all(|p| p.value == dec!(5_000)));
    }

    #[test]
    fn unknown_strategy_runs_the_breakout() {
        let bars = bars_from_closes(&[100.0; 10]);
        let report = run_backtest(&StrategyConfig::with_defaults("nope"), &bars, dec!(1_000)).unwrap();
        assert_eq!(report.strategy, "opening_range_breakout");
    }
}
