// In crates/backtester/src/optimizer.rs

use crate::{Backtester, Error, Result, validate_bars};
use analytics::Metrics;
use core_types::{Bar, StrategyConfig};
use itertools::Itertools;
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use toml::Value;
use tracing::{info, warn};

/// Candidate values per parameter key.
pub type ParamGrid = BTreeMap<String, Vec<f64>>;

/// One concrete assignment of grid values.
pub type ParamSet = BTreeMap<String, f64>;

/// The result of one grid cell.
#[derive(Debug, Clone, Serialize)]
pub struct SweepRun {
    pub params: ParamSet,
    /// Absent when the parameters could not be turned into a strategy.
    pub metrics: Option<Metrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SweepRun {
    /// The ranking key; failed cells rank below every successful one.
    pub fn sharpe(&self) -> f64 {
        self.metrics.as_ref().map_or(f64::NEG_INFINITY, |m| m.sharpe_ratio)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepOutcome {
    pub strategy: String,
    /// Sorted by Sharpe ratio, best first.
    pub runs: Vec<SweepRun>,
}

impl SweepOutcome {
    pub fn best(&self) -> Option<&SweepRun> {
        self.runs.iter().find(|run| run.metrics.is_some())
    }
}

/// Every combination of the grid's values, keys in sorted order.
///
/// An empty grid yields a single empty set, which runs the strategy on its
/// defaults. A key with no candidate values is an error.
pub fn expand_grid(grid: &ParamGrid) -> Result<Vec<ParamSet>> {
    if let Some((key, _)) = grid.iter().find(|(_, values)| values.is_empty()) {
        return Err(Error::InvalidGrid(format!("parameter '{key}' has no candidate values")));
    }
    if grid.is_empty() {
        return Ok(vec![ParamSet::new()]);
    }

    let combos = grid
        .values()
        .map(|values| values.iter().copied())
        .multi_cartesian_product()
        .map(|combo| grid.keys().cloned().zip(combo).collect())
        .collect();
    Ok(combos)
}

/// Whole numbers become TOML integers so they deserialize into integer fields.
fn to_toml(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::Integer(value as i64)
    } else {
        Value::Float(value)
    }
}

/// `base` with every entry of `params` layered over its parameter table.
pub fn apply_params(base: &StrategyConfig, params: &ParamSet) -> StrategyConfig {
    let mut config = base.clone();
    for (key, value) in params {
        config.set(key.clone(), to_toml(*value));
    }
    config
}

pub(crate) fn evaluate_cell(
    base: &StrategyConfig,
    params: ParamSet,
    bars: &[Bar],
    initial_capital: Decimal,
) -> SweepRun {
    match Backtester::new(&apply_params(base, &params), initial_capital) {
        Ok(backtester) => {
            let report = backtester.evaluate(bars);
            SweepRun {
                params,
                metrics: Some(report.metrics),
                error: None,
            }
        }
        Err(e) => {
            warn!(?params, error = %e, "Parameter set rejected; ranking it last.");
            SweepRun {
                params,
                metrics: None,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Runs one backtest per grid cell in parallel and ranks them by Sharpe ratio.
///
/// Runs on the current rayon pool; install a sized pool around the call to
/// bound the worker count.
pub fn sweep(
    base: &StrategyConfig,
    grid: &ParamGrid,
    bars: &[Bar],
    initial_capital: Decimal,
) -> Result<SweepOutcome> {
    validate_bars(bars)?;
    let combos = expand_grid(grid)?;
    info!(strategy = %base.name, cells = combos.len(), bars = bars.len(), "Starting parameter sweep.");

    let mut runs: Vec<SweepRun> = combos
        .into_par_iter()
        .map(|params| evaluate_cell(base, params, bars, initial_capital))
        .collect();
    // Stable sort: equal scores keep grid order.
    runs.sort_by(|a, b| b.sharpe().total_cmp(&a.sharpe()));

    if let Some(best) = runs.first() {
        info!(params = ?best.params, sharpe = best.sharpe(), "Sweep complete.");
    }
    Ok(SweepOutcome {
        strategy: base.name.clone(),
        runs,
    })
}
