// In crates/strategies/src/types.rs
//
// One settings struct per strategy. Keys use the camelCase names found in
// request payloads; anything missing falls back to the `Default` impl below.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BreakoutSettings {
    /// Length of the opening range in minutes. Bar replay always uses the
    /// previous bar as the range; the key is accepted so intraday configs load.
    pub range_period: u32,
    /// Profit target, percent of the entry price.
    pub target_percent: f64,
    /// Stop distance, percent of the entry price.
    pub stop_loss: f64,
    /// Ranges wider than this percent of the previous close are skipped.
    pub max_range_percent: f64,
    pub position_fraction: f64,
}

impl Default for BreakoutSettings {
    fn default() -> Self {
        Self {
            range_period: 15,
            target_percent: 1.5,
            stop_loss: 0.75,
            max_range_percent: 5.0,
            position_fraction: 0.10,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MaCrossoverSettings {
    pub short_period: usize,
    pub long_period: usize,
    pub position_fraction: f64,
}

impl Default for MaCrossoverSettings {
    fn default() -> Self {
        Self {
            short_period: 9,
            long_period: 21,
            position_fraction: 0.10,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MeanReversionSettings {
    pub period: usize,
    /// Absolute z-score that triggers an entry.
    pub threshold: f64,
    pub position_fraction: f64,
}

impl Default for MeanReversionSettings {
    fn default() -> Self {
        Self {
            period: 20,
            threshold: 2.0,
            position_fraction: 0.15,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MomentumSettings {
    pub lookback: usize,
    pub hold_days: usize,
    /// Trailing return, in percent, that must be exceeded to enter.
    pub entry_threshold: f64,
    pub position_fraction: f64,
}

impl Default for MomentumSettings {
    fn default() -> Self {
        Self {
            lookback: 20,
            hold_days: 10,
            entry_threshold: 5.0,
            position_fraction: 0.20,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RsiReversalSettings {
    pub period: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub position_fraction: f64,
}

impl Default for RsiReversalSettings {
    fn default() -> Self {
        Self {
            period: 14,
            oversold: 30.0,
            overbought: 70.0,
            position_fraction: 0.10,
        }
    }
}
