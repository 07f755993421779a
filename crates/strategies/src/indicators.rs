// In crates/strategies/src/indicators.rs

use core_types::Bar;
use num_traits::cast::ToPrimitive;
use ta::Next;
use ta::indicators::{SimpleMovingAverage as Sma, StandardDeviation};

/// Closing prices as f64 for indicator math.
pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close.to_f64().unwrap_or(0.0)).collect()
}

/// Simple moving average per index; `None` until `period` values have been seen.
pub fn sma_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let Ok(mut sma) = Sma::new(period) else {
        return vec![None; values.len()];
    };
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let avg = sma.next(*v);
            (i + 1 >= period).then_some(avg)
        })
        .collect()
}

/// Rolling mean and population standard deviation over `period` values,
/// the current value included.
pub fn rolling_mean_std(values: &[f64], period: usize) -> Vec<Option<(f64, f64)>> {
    let (Ok(mut sma), Ok(mut sd)) = (Sma::new(period), StandardDeviation::new(period)) else {
        return vec![None; values.len()];
    };
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let mean = sma.next(*v);
            let std_dev = sd.next(*v);
            (i + 1 >= period).then_some((mean, std_dev))
        })
        .collect()
}

/// Wilder's RSI. The first value lands on index `period`; earlier indices are `None`.
///
/// Seeded with a simple average of the first `period` moves and smoothed by
/// `1/period` afterwards. `ta`'s RSI smooths with an EMA and diverges from it.
pub fn wilder_rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut rsi = vec![None; values.len()];
    if period == 0 || values.len() <= period {
        return rsi;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let diff = values[i] - values[i - 1];
        if diff > 0.0 {
            avg_gain += diff;
        } else {
            avg_loss -= diff;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    rsi[period] = Some(rsi_value(avg_gain, avg_loss));

    // Wilder's smoothing
    let p = period as f64;
    for i in period + 1..values.len() {
        let diff = values[i] - values[i - 1];
        let (gain, loss) = if diff > 0.0 { (diff, 0.0) } else { (0.0, -diff) };
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
        rsi[i] = Some(rsi_value(avg_gain, avg_loss));
    }
    rsi
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        // A flat window carries no signal either way.
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_waits_for_a_full_window() {
        let sma = sma_series(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(sma, vec![None, None, Some(2.0), Some(3.0)]);
    }

    #[test]
    fn zero_period_yields_no_values() {
        assert_eq!(sma_series(&[1.0, 2.0], 0), vec![None, None]);
        assert_eq!(rolling_mean_std(&[1.0, 2.0], 0), vec![None, None]);
        assert_eq!(wilder_rsi(&[1.0, 2.0], 0), vec![None, None]);
    }

    #[test]
    fn rolling_std_is_population_std() {
        let stats = rolling_mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8);
        let (mean, sd) = stats[7].unwrap();
        assert!((mean - 5.0).abs() < 1e-9);
        assert!((sd - 2.0).abs() < 1e-9);
        assert!(stats[6].is_none());
    }

    #[test]
    fn rsi_extremes() {
        let rising: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        assert_eq!(wilder_rsi(&rising, 14)[14], Some(100.0));

        let flat = vec![100.0; 20];
        assert_eq!(wilder_rsi(&flat, 14)[19], Some(50.0));

        let falling: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        assert_eq!(wilder_rsi(&falling, 14)[19], Some(0.0));
    }

    #[test]
    fn rsi_balanced_moves_sit_at_fifty() {
        let zigzag: Vec<f64> = (0..15).map(|i| if i % 2 == 0 { 100.0 } else { 101.0 }).collect();
        // 7 gains and 7 losses of equal size in the seed window.
        let rsi = wilder_rsi(&zigzag, 14)[14].unwrap();
        assert!((rsi - 50.0).abs() < 1e-9);
    }
}
