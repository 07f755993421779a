// In crates/strategies/src/mean_reversion.rs

use crate::indicators::{closes, rolling_mean_std};
use crate::types::MeanReversionSettings;
use crate::{SimulationState, Simulator};
use core_types::{Bar, Side};

/// Standard deviations below this are treated as zero.
const MIN_STD_DEV: f64 = 1e-9;

/// Z-score mean reversion: fade moves beyond `threshold` deviations, exit once
/// price is back at the rolling mean.
#[derive(Debug, Clone)]
pub struct MeanReversion {
    settings: MeanReversionSettings,
}

impl MeanReversion {
    pub fn new(settings: MeanReversionSettings) -> Self {
        Self { settings }
    }
}

pub struct ZScoreSeries {
    closes: Vec<f64>,
    stats: Vec<Option<(f64, f64)>>,
}

impl ZScoreSeries {
    fn z_score(&self, i: usize) -> Option<f64> {
        let (mean, std_dev) = self.stats[i]?;
        (std_dev > MIN_STD_DEV).then(|| (self.closes[i] - mean) / std_dev)
    }
}

impl Simulator for MeanReversion {
    type Series = ZScoreSeries;

    fn name(&self) -> &'static str {
        "MeanReversion"
    }

    fn prepare(&self, bars: &[Bar]) -> ZScoreSeries {
        let closes = closes(bars);
        let stats = rolling_mean_std(&closes, self.settings.period);
        ZScoreSeries { closes, stats }
    }

    fn step(&self, state: SimulationState, series: &ZScoreSeries, bars: &[Bar], i: usize) -> SimulationState {
        let Some(z) = series.z_score(i) else {
            return state;
        };
        let bar = &bars[i];
        let threshold = self.settings.threshold;

        match state.position.as_ref().map(|p| p.side) {
            None if z < -threshold => {
                state.open(Side::Long, i, bar.timestamp, bar.close, self.settings.position_fraction)
            }
            None if z > threshold => {
                state.open(Side::Short, i, bar.timestamp, bar.close, self.settings.position_fraction)
            }
            Some(Side::Long) if z >= 0.0 => state.close(bar.timestamp, bar.close),
            Some(Side::Short) if z <= 0.0 => state.close(bar.timestamp, bar.close),
            _ => state,
        }
    }
}
