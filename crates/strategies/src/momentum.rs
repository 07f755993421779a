// In crates/strategies/src/momentum.rs

use crate::indicators::closes;
use crate::types::MomentumSettings;
use crate::{SimulationState, Simulator};
use core_types::{Bar, Side};

/// Buys strength after a trailing-return breakout and holds for a fixed number of bars.
#[derive(Debug, Clone)]
pub struct Momentum {
    settings: MomentumSettings,
}

impl Momentum {
    pub fn new(settings: MomentumSettings) -> Self {
        Self { settings }
    }

    fn trailing_return(&self, closes: &[f64], i: usize) -> Option<f64> {
        let lookback = self.settings.lookback;
        if lookback == 0 || i < lookback {
            return None;
        }
        let base = closes[i - lookback];
        (base > 0.0).then(|| closes[i] / base - 1.0)
    }
}

impl Simulator for Momentum {
    type Series = Vec<f64>;

    fn name(&self) -> &'static str {
        "Momentum"
    }

    fn prepare(&self, bars: &[Bar]) -> Vec<f64> {
        closes(bars)
    }

    fn step(&self, state: SimulationState, closes: &Vec<f64>, bars: &[Bar], i: usize) -> SimulationState {
        let bar = &bars[i];

        if let Some(position) = &state.position {
            // Holding: the only possible action is the timed exit.
            return if i - position.entry_index >= self.settings.hold_days {
                state.close(bar.timestamp, bar.close)
            } else {
                state
            };
        }

        match self.trailing_return(closes, i) {
            Some(ret) if ret > self.settings.entry_threshold / 100.0 => state.open(
                Side::Long,
                i,
                bar.timestamp,
                bar.close,
                self.settings.position_fraction,
            ),
            _ => state,
        }
    }
}
