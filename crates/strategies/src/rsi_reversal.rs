// In crates/strategies/src/rsi_reversal.rs

use crate::indicators::{closes, wilder_rsi};
use crate::types::RsiReversalSettings;
use crate::{SimulationState, Simulator};
use core_types::{Bar, Side};

/// Buys oversold readings of Wilder's RSI and sells once it turns overbought.
#[derive(Debug, Clone)]
pub struct RsiReversal {
    settings: RsiReversalSettings,
}

impl RsiReversal {
    pub fn new(settings: RsiReversalSettings) -> Self {
        Self { settings }
    }
}

impl Simulator for RsiReversal {
    type Series = Vec<Option<f64>>;

    fn name(&self) -> &'static str {
        "RsiReversal"
    }

    fn prepare(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        wilder_rsi(&closes(bars), self.settings.period)
    }

    fn step(&self, state: SimulationState, rsi: &Vec<Option<f64>>, bars: &[Bar], i: usize) -> SimulationState {
        let Some(rsi) = rsi[i] else {
            return state;
        };
        let bar = &bars[i];

        if state.is_flat() {
            if rsi < self.settings.oversold {
                return state.open(Side::Long, i, bar.timestamp, bar.close, self.settings.position_fraction);
            }
            state
        } else if rsi > self.settings.overbought {
            state.close(bar.timestamp, bar.close)
        } else {
            state
        }
    }
}
