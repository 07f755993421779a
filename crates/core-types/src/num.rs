//! Rounding helpers shared by the analytics crates.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds to 2 decimal places, half away from zero.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Rounds to 4 decimal places, half away from zero.
pub fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Money rounding: 2 decimal places, half away from zero.
pub fn round_money(v: Decimal) -> Decimal {
    v.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
