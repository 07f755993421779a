// In crates/strategies/src/ma_crossover.rs

use crate::indicators::{closes, sma_series};
use crate::types::MaCrossoverSettings;
use crate::{SimulationState, Simulator};
use core_types::{Bar, Side};

/// Short/long simple moving average pair, one value per bar.
#[derive(Debug, Default)]
pub struct CrossoverSeries {
    short: Vec<Option<f64>>,
    long: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Cross {
    Above,
    Below,
}

/// Long-only simple moving average crossover.
#[derive(Debug, Clone)]
pub struct MaCrossover {
    settings: MaCrossoverSettings,
}

impl MaCrossover {
    pub fn new(settings: MaCrossoverSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &MaCrossoverSettings {
        &self.settings
    }
}

impl Simulator for MaCrossover {
    type Series = CrossoverSeries;

    fn name(&self) -> &'static str {
        "MovingAverageCrossover"
    }

    fn prepare(&self, bars: &[Bar]) -> CrossoverSeries {
        let closes = closes(bars);
        CrossoverSeries {
            short: sma_series(&closes, self.settings.short_period),
            long: sma_series(&closes, self.settings.long_period),
        }
    }

    fn step(
        &self,
        state: SimulationState,
        series: &CrossoverSeries,
        bars: &[Bar],
        i: usize,
    ) -> SimulationState {
        let bar = &bars[i];
        let is_last = i + 1 == bars.len();

        let cross = match (series.short[i - 1], series.long[i - 1], series.short[i], series.long[i]) {
            (Some(prev_short), Some(prev_long), Some(short), Some(long)) => {
                if prev_short <= prev_long && short > long {
                    Some(Cross::Above)
                } else if prev_short >= prev_long && short < long {
                    Some(Cross::Below)
                } else {
                    None
                }
            }
            _ => None,
        };

        let state = match cross {
            Some(Cross::Above) if state.is_flat() => state.open(
                Side::Long,
                i,
                bar.timestamp,
                bar.close,
                self.settings.position_fraction,
            ),
            Some(Cross::Below) if !state.is_flat() => state.close(bar.timestamp, bar.close),
            _ => state,
        };

        if is_last {
            // Force-close whatever is still open at the end of the data.
            state.close(bar.timestamp, bar.close)
        } else {
            state
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{day, flat_bars};
    use rust_decimal_macros::dec;

    fn crossover(short: usize, long: usize) -> MaCrossover {
        MaCrossover::new(MaCrossoverSettings {
            short_period: short,
            long_period: long,
            position_fraction: 0.10,
        })
    }

    #[test]
    fn single_round_trip_between_engineered_crosses() {
        // short=2, long=3. Flat at 100, a jump at index 5 makes short > long,
        // a drop at index 9 brings short back below long.
        let closes = [100.0, 100.0, 100.0, 100.0, 100.0, 110.0, 110.0, 110.0, 110.0, 90.0, 90.0, 90.0];
        let bars = flat_bars(&closes);
        let result = crossover(2, 3).simulate(&bars, dec!(10_000));

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.side, Side::Long);
        assert_eq!(trade.entry_date, day(5));
        assert_eq!(trade.entry_price, dec!(110));
        assert_eq!(trade.exit_date, day(9));
        assert_eq!(trade.exit_price, dec!(90));
        // floor(1000 / 110) = 9 units, 9 * -20
        assert_eq!(trade.qty, 9);
        assert_eq!(trade.pnl, dec!(-180));
        assert_eq!(result.equity_curve.len(), closes.len());
        assert_eq!(result.equity_curve.last().unwrap().value, dec!(9_820));
    }

    #[test]
    fn open_long_is_force_closed_on_the_last_bar() {
        let closes = [100.0, 100.0, 100.0, 100.0, 120.0, 125.0, 130.0];
        let bars = flat_bars(&closes);
        let result = crossover(2, 3).simulate(&bars, dec!(10_000));

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.entry_date, day(4));
        assert_eq!(trade.exit_date, day(6));
        assert_eq!(trade.exit_price, dec!(130));
        // floor(1000 / 120) = 8 units
        assert_eq!(trade.pnl, dec!(80));
        assert_eq!(result.equity_curve.last().unwrap().value, dec!(10_080));
    }

    #[test]
    fn cross_on_the_last_bar_books_a_flat_trade() {
        let closes = [100.0, 100.0, 100.0, 100.0, 120.0];
        let bars = flat_bars(&closes);
        let result = crossover(2, 3).simulate(&bars, dec!(10_000));

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.entry_date, day(4));
        assert_eq!(trade.exit_date, day(4));
        assert_eq!(trade.entry_price, trade.exit_price);
        assert_eq!(trade.qty, 8);
        assert_eq!(trade.pnl, dec!(0));
        assert_eq!(result.equity_curve.last().unwrap().value, dec!(10_000));
    }

    #[test]
    fn no_trades_before_long_average_is_ready() {
        let bars = flat_bars(&[100.0, 120.0, 90.0, 130.0]);
        let result = crossover(2, 10).simulate(&bars, dec!(10_000));
        assert!(result.trades.is_empty());
        assert_eq!(result.equity_curve.len(), 4);
        assert!(result.equity_curve.iter().all(|p| p.value == dec!(10_000)));
    }
}
