// In crates/strategies/src/breakout.rs

use crate::types::BreakoutSettings;
use crate::{SimulationState, Simulator};
use core_types::{Bar, Side};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

/// Opening-range breakout on bar data: the previous bar is the range, and a
/// break of either side is traded to target, stop or close within the bar.
#[derive(Debug, Clone)]
pub struct OpeningRangeBreakout {
    settings: BreakoutSettings,
}

impl OpeningRangeBreakout {
    pub fn new(settings: BreakoutSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &BreakoutSettings {
        &self.settings
    }
}

fn percent(v: f64) -> Decimal {
    Decimal::from_f64(v).unwrap_or_default() / Decimal::ONE_HUNDRED
}

impl Simulator for OpeningRangeBreakout {
    type Series = ();

    fn name(&self) -> &'static str {
        "OpeningRangeBreakout"
    }

    fn prepare(&self, _bars: &[Bar]) -> Self::Series {}

    fn step(&self, state: SimulationState, _series: &(), bars: &[Bar], i: usize) -> SimulationState {
        let prev = &bars[i - 1];
        let bar = &bars[i];

        // Volatility filter: skip days following an unusually wide range.
        let range = prev.high - prev.low;
        if range > prev.close * percent(self.settings.max_range_percent) {
            return state;
        }

        let target_pct = percent(self.settings.target_percent);
        let stop_pct = percent(self.settings.stop_loss);

        let (side, entry, exit) = if bar.high > prev.high {
            let entry = prev.high;
            let target = entry * (Decimal::ONE + target_pct);
            let stop = entry * (Decimal::ONE - stop_pct);
            let exit = if bar.high >= target {
                target
            } else if bar.low <= stop {
                stop
            } else {
                bar.close
            };
            (Side::Long, entry, exit)
        } else if bar.low < prev.low {
            let entry = prev.low;
            let target = entry * (Decimal::ONE - target_pct);
            let stop = entry * (Decimal::ONE + stop_pct);
            let exit = if bar.low <= target {
                target
            } else if bar.high >= stop {
                stop
            } else {
                bar.close
            };
            (Side::Short, entry, exit)
        } else {
            return state;
        };

        state
            .open(side, i, bar.timestamp, entry, self.settings.position_fraction)
            .close(bar.timestamp, exit)
    }
}
