// In crates/options/src/chain.rs

use core_types::num::round2;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Open-interest weighted pain of settling the chain at `strike`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PainPoint {
    pub strike: Decimal,
    pub total_pain: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaxPain {
    pub max_pain_strike: Decimal,
    pub pain_by_strike: Vec<PainPoint>,
}

/// Finds the candidate strike with the least total pain.
///
/// Every listed strike is tried as the candidate. Its pain sums, over all
/// strikes `k`, call open interest times `max(k - candidate, 0)` plus put open
/// interest times `max(candidate - k, 0)`. Strikes missing from an
/// open-interest map count as zero contracts. The first strike wins a tie.
pub fn max_pain(
    strikes: &[Decimal],
    call_oi: &HashMap<Decimal, u64>,
    put_oi: &HashMap<Decimal, u64>,
) -> MaxPain {
    let oi = |map: &HashMap<Decimal, u64>, strike: &Decimal| Decimal::from(map.get(strike).copied().unwrap_or(0));

    let pain_by_strike: Vec<PainPoint> = strikes
        .iter()
        .map(|&candidate| {
            let total_pain = strikes
                .iter()
                .map(|k| {
                    let call_pain = oi(call_oi, k) * (k - candidate).max(Decimal::ZERO);
                    let put_pain = oi(put_oi, k) * (candidate - k).max(Decimal::ZERO);
                    call_pain + put_pain
                })
                .sum();
            PainPoint {
                strike: candidate,
                total_pain,
            }
        })
        .collect();

    let mut best: Option<&PainPoint> = None;
    for point in &pain_by_strike {
        if best.is_none_or(|b| point.total_pain < b.total_pain) {
            best = Some(point);
        }
    }
    let max_pain_strike = best.map_or(Decimal::ZERO, |p| p.strike);

    MaxPain {
        max_pain_strike,
        pain_by_strike,
    }
}

/// Ranks `current` within the range of `history` on a 0..=100 scale.
///
/// An empty history is neutral (50). A history with no spread reports 100 if
/// `current` is above it and 0 otherwise.
pub fn iv_percentile(current: f64, history: &[f64]) -> f64 {
    if history.is_empty() {
        return 50.0;
    }
    let min = history.iter().copied().fold(f64::INFINITY, f64::min);
    let max = history.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == min {
        return if current > max { 100.0 } else { 0.0 };
    }
    round2(((current - min) / (max - min) * 100.0).clamp(0.0, 100.0))
}
