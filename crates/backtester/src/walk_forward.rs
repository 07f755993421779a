// In crates/backtester/src/walk_forward.rs
//
// Rolling in-sample optimisation followed by an out-of-sample check. The bar
// series is cut into equal folds (the last fold takes the remainder), each
// fold is split into an in-sample head and an out-of-sample tail, and the
// best in-sample parameters are re-run on the tail.

use crate::optimizer::{ParamGrid, ParamSet, apply_params, expand_grid};
use crate::{BacktestReport, Backtester, Error, Result};
use core_types::num::round2;
use core_types::{Bar, StrategyConfig};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const MIN_WALK_FORWARD_BARS: usize = 60;
pub const MIN_FOLD_BARS: usize = 20;
const MIN_IN_SAMPLE_BARS: usize = 15;
const MIN_OUT_OF_SAMPLE_BARS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardOptions {
    /// Number of folds, clamped to 2..=10.
    pub folds: usize,
    /// Share of each fold used for optimisation, clamped to 0.5..=0.9.
    pub in_sample_ratio: f64,
}

impl Default for WalkForwardOptions {
    fn default() -> Self {
        Self {
            folds: 5,
            in_sample_ratio: 0.7,
        }
    }
}

impl WalkForwardOptions {
    pub fn clamped(self) -> Self {
        Self {
            folds: self.folds.clamp(2, 10),
            in_sample_ratio: self.in_sample_ratio.clamp(0.5, 0.9),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FoldResult {
    pub fold: usize,
    pub in_sample_bars: usize,
    pub out_of_sample_bars: usize,
    pub best_params: ParamSet,
    pub in_sample_sharpe: f64,
    pub out_of_sample_sharpe: f64,
    pub in_sample_win_rate: f64,
    pub out_of_sample_win_rate: f64,
    pub out_of_sample_trades: u32,
    pub out_of_sample_pnl: Decimal,
    /// `1 - oos/is` when the in-sample Sharpe is positive, otherwise 0.
    pub degradation: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WalkForwardAggregate {
    pub avg_in_sample_sharpe: f64,
    pub avg_out_of_sample_sharpe: f64,
    pub avg_degradation: f64,
    pub total_out_of_sample_trades: u32,
    pub total_out_of_sample_pnl: Decimal,
    /// Share of folds with a positive out-of-sample Sharpe ratio.
    pub consistency_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalkForwardReport {
    pub strategy: String,
    pub options: WalkForwardOptions,
    pub folds: Vec<FoldResult>,
    pub aggregate: WalkForwardAggregate,
    /// The parameters with the highest mean out-of-sample Sharpe ratio.
    pub best_robust_params: ParamSet,
    /// How much of the in-sample Sharpe ratio fails to carry over, 0..=1.
    pub overfitting_score: f64,
}

/// Walk-forward analysis of `base` over `grid`.
///
/// Every grid cell must resolve to a valid strategy; a malformed cell fails
/// the whole analysis rather than being ranked.
pub fn walk_forward(
    base: &StrategyConfig,
    grid: &ParamGrid,
    bars: &[Bar],
    initial_capital: Decimal,
    options: WalkForwardOptions,
) -> Result<WalkForwardReport> {
    let n = bars.len();
    if n < MIN_WALK_FORWARD_BARS {
        return Err(Error::InsufficientData {
            found: n,
            required: MIN_WALK_FORWARD_BARS,
        });
    }
    let options = options.clamped();
    let fold_size = n / options.folds;
    if fold_size < MIN_FOLD_BARS {
        return Err(Error::WalkForward(format!(
            "{n} bars split into {} folds leaves {fold_size} bars per fold, at least {MIN_FOLD_BARS} required",
            options.folds
        )));
    }

    let candidates: Vec<(ParamSet, Backtester)> = expand_grid(grid)?
        .into_iter()
        .map(|params| -> Result<(ParamSet, Backtester)> {
            let backtester = Backtester::new(&apply_params(base, &params), initial_capital)?;
            Ok((params, backtester))
        })
        .collect::<Result<_>>()?;

    info!(
        strategy = %base.name,
        bars = n,
        folds = options.folds,
        cells = candidates.len(),
        "Starting walk-forward analysis."
    );

    let mut folds = Vec::new();
    // Out-of-sample Sharpe ratios per winning candidate index.
    let mut robust_scores: BTreeMap<usize, Vec<f64>> = BTreeMap::new();

    for fold in 0..options.folds {
        let start = fold * fold_size;
        let end = if fold + 1 == options.folds { n } else { start + fold_size };
        let window = &bars[start..end];
        let split = (window.len() as f64 * options.in_sample_ratio) as usize;
        if split < MIN_IN_SAMPLE_BARS || window.len() - split < MIN_OUT_OF_SAMPLE_BARS {
            debug!(fold, bars = window.len(), split, "Fold too small; skipped.");
            continue;
        }
        let (in_sample, out_of_sample) = window.split_at(split);

        let in_sample_reports: Vec<BacktestReport> = candidates
            .par_iter()
            .map(|(_, backtester)| backtester.evaluate(in_sample))
            .collect();
        let Some((best, best_report)) = strongest(&in_sample_reports) else {
            continue;
        };
        let (best_params, best_backtester) = &candidates[best];
        let oos = best_backtester.evaluate(out_of_sample);

        let in_sample_sharpe = best_report.metrics.sharpe_ratio;
        let out_of_sample_sharpe = oos.metrics.sharpe_ratio;
        let degradation = if in_sample_sharpe > 0.0 {
            round2(1.0 - out_of_sample_sharpe / in_sample_sharpe)
        } else {
            0.0
        };
        let out_of_sample_pnl = oos
            .equity_curve
            .last()
            .map_or(Decimal::ZERO, |p| p.value - initial_capital);

        robust_scores.entry(best).or_default().push(out_of_sample_sharpe);
        debug!(fold, params = ?best_params, in_sample_sharpe, out_of_sample_sharpe, "Fold evaluated.");

        folds.push(FoldResult {
            fold,
            in_sample_bars: in_sample.len(),
            out_of_sample_bars: out_of_sample.len(),
            best_params: best_params.clone(),
            in_sample_sharpe,
            out_of_sample_sharpe,
            in_sample_win_rate: best_report.metrics.win_rate,
            out_of_sample_win_rate: oos.metrics.win_rate,
            out_of_sample_trades: oos.metrics.total_trades,
            out_of_sample_pnl,
            degradation,
        });
    }

    if folds.is_empty() {
        return Err(Error::WalkForward("no fold was large enough to evaluate".into()));
    }

    let count = folds.len() as f64;
    let avg = |f: fn(&FoldResult) -> f64| folds.iter().map(f).sum::<f64>() / count;
    let avg_is = avg(|f| f.in_sample_sharpe);
    let avg_oos = avg(|f| f.out_of_sample_sharpe);
    let aggregate = WalkForwardAggregate {
        avg_in_sample_sharpe: round2(avg_is),
        avg_out_of_sample_sharpe: round2(avg_oos),
        avg_degradation: round2(avg(|f| f.degradation)),
        total_out_of_sample_trades: folds.iter().map(|f| f.out_of_sample_trades).sum(),
        total_out_of_sample_pnl: folds.iter().map(|f| f.out_of_sample_pnl).sum(),
        consistency_score: round2(folds.iter().filter(|f| f.out_of_sample_sharpe > 0.0).count() as f64 / count),
    };

    let mut best_robust: Option<(usize, f64)> = None;
    for (&index, scores) in &robust_scores {
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        if best_robust.is_none_or(|(_, best)| mean > best) {
            best_robust = Some((index, mean));
        }
    }
    let best_robust_params = best_robust
        .map(|(index, _)| candidates[index].0.clone())
        .unwrap_or_default();

    let overfitting_score = if avg_is > 0.0 {
        round2(((avg_is - avg_oos) / avg_is).clamp(0.0, 1.0))
    } else {
        0.0
    };

    info!(
        folds = folds.len(),
        avg_out_of_sample_sharpe = aggregate.avg_out_of_sample_sharpe,
        overfitting_score,
        "Walk-forward analysis complete."
    );

    Ok(WalkForwardReport {
        strategy: base.name.clone(),
        options,
        folds,
        aggregate,
        best_robust_params,
        overfitting_score,
    })
}

/// Index and report of the highest Sharpe ratio; the earliest wins a tie.
fn strongest(reports: &[BacktestReport]) -> Option<(usize, &BacktestReport)> {
    reports
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, &BacktestReport)>, (i, report)| match best {
            Some((_, b)) if b.metrics.sharpe_ratio >= report.metrics.sharpe_ratio => best,
            _ => Some((i, report)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::wavy_bars;
    use rust_decimal_macros::dec;

    fn grid() -> ParamGrid {
        ParamGrid::from([
            ("period".to_string(), vec![5.0, 8.0]),
            ("threshold".to_string(), vec![1.0, 1.5]),
        ])
    }

    #[test]
    fn options_are_clamped() {
        let wild = WalkForwardOptions {
            folds: 50,
            in_sample_ratio: 0.99,
        };
        assert_eq!(
            wild.clamped(),
            WalkForwardOptions {
                folds: 10,
                in_sample_ratio: 0.9
            }
        );
        let tiny = WalkForwardOptions {
            folds: 0,
            in_sample_ratio: 0.1,
        };
        assert_eq!(tiny.clamped().folds, 2);
        assert_eq!(tiny.clamped().in_sample_ratio, 0.5);
    }

    #[test]
    fn needs_sixty_bars() {
        let base = StrategyConfig::with_defaults("mean_reversion");
        let result = walk_forward(&base, &grid(), &wavy_bars(59), dec!(10_000), WalkForwardOptions::default());
        assert!(matches!(result, Err(Error::InsufficientData { found: 59, required: 60 })));
    }

    #[test]
    fn folds_must_hold_twenty_bars() {
        let base = StrategyConfig::with_defaults("mean_reversion");
        let options = WalkForwardOptions {
            folds: 10,
            in_sample_ratio: 0.7,
        };
        let result = walk_forward(&base, &grid(), &wavy_bars(150), dec!(10_000), options);
        assert!(matches!(result, Err(Error::WalkForward(_))));
    }

    #[test]
    fn malformed_grid_cells_fail_the_analysis() {
        let base = StrategyConfig::with_defaults("mean_reversion");
        let grid = ParamGrid::from([("period".to_string(), vec![5.5])]);
        let result = walk_forward(&base, &grid, &wavy_bars(120), dec!(10_000), WalkForwardOptions::default());
        assert!(matches!(result, Err(Error::Strategy(_))));
    }

    #[test]
    fn five_even_folds_over_a_wavy_series() {
        let base = StrategyConfig::with_defaults("mean_reversion");
        let report = walk_forward(&base, &grid(), &wavy_bars(120), dec!(10_000), WalkForwardOptions::default()).unwrap();

        assert_eq!(report.folds.len(), 5);
        for (i, fold) in report.folds.iter().enumerate() {
            assert_eq!(fold.fold, i);
            // 24 bars per fold, 70% in sample
            assert_eq!(fold.in_sample_bars, 16);
            assert_eq!(fold.out_of_sample_bars, 8);
            assert!(grid()["period"].contains(&fold.best_params["period"]));
        }
        assert!((0.0..=1.0).contains(&report.aggregate.consistency_score));
        assert!((0.0..=1.0).contains(&report.overfitting_score));
        assert!(!report.best_robust_params.is_empty());
        assert_eq!(
            report.aggregate.total_out_of_sample_trades,
            report.folds.iter().map(|f| f.out_of_sample_trades).sum::<u32>()
        );
    }

    #[test]
    fn last_fold_takes_the_remainder() {
        let base = StrategyConfig::with_defaults("momentum");
        let options = WalkForwardOptions {
            folds: 3,
            in_sample_ratio: 0.8,
        };
        let report = walk_forward(&base, &ParamGrid::new(), &wavy_bars(65), dec!(10_000), options).unwrap();
        // 65 / 3 = 21 per fold, the last one gets 23.
        let last = report.folds.last().unwrap();
        assert_eq!(last.in_sample_bars + last.out_of_sample_bars, 23);
        assert!(report.best_robust_params.is_empty());
    }
}
