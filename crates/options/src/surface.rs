// In crates/options/src/surface.rs
//
// Implied volatility across strikes and expiries of one underlying. Quotes
// carry either an implied volatility or a market price to invert; a side with
// neither, or whose price has no solution, is recorded as 0 and ignored by the
// aggregates.

use crate::pricer::{OptionType, implied_volatility};
use crate::{Error, Result};
use core_types::num::round4;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DAYS_PER_YEAR: f64 = 365.0;

/// Strikes within this distance of spot (as a fraction) count as at the money.
const ATM_BAND: f64 = 0.05;
const SKEW_BALANCE: f64 = 0.03;
const FLAT_SKEW: f64 = 0.02;
/// Relative gap between a strike's IV and its neighbours' mean that flags a spike or dip.
const SMILE_DEVIATION: f64 = 0.15;
/// Relative gap between call and put IV at one strike.
const PUT_CALL_DIVERGENCE: f64 = 0.2;
const MAX_ANOMALIES: usize = 10;
/// Fallback ATM volatility when no strike is near spot.
const DEFAULT_ATM_IV: f64 = 0.2;

/// One strike and expiry of a chain snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrikeQuote {
    pub strike: f64,
    pub expiry_days: f64,
    pub call_price: Option<f64>,
    pub put_price: Option<f64>,
    pub call_iv: Option<f64>,
    pub put_iv: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfacePoint {
    pub strike: f64,
    pub expiry_days: f64,
    /// Strike over spot.
    pub moneyness: f64,
    pub call_iv: f64,
    pub put_iv: f64,
    pub avg_iv: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkewDirection {
    PutHeavy,
    CallHeavy,
    Balanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkewAnalysis {
    /// OTM put IV minus OTM call IV.
    pub current_skew: f64,
    pub skew_direction: SkewDirection,
    pub put_call_iv_ratio: f64,
    pub atm_iv: f64,
    pub otm_put_iv: f64,
    pub otm_call_iv: f64,
    pub smile_curvature: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    IvSpike,
    IvDip,
    PutCallIvDivergence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    pub strike: f64,
    pub expiry_days: f64,
    pub kind: AnomalyKind,
    /// Relative deviation from `expected_iv`.
    pub severity: f64,
    pub expected_iv: f64,
    pub actual_iv: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermPoint {
    pub expiry_days: f64,
    pub atm_iv: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IvLevel {
    High,
    Moderate,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkewRegime {
    Flat,
    PutSkew,
    CallSkew,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TermShape {
    Contango,
    Backwardation,
    Flat,
    InsufficientData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SurfaceSignal {
    SellPremium,
    BuyPremium,
    ArbitrageOpportunities,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceSummary {
    pub overall_iv_level: IvLevel,
    pub skew_regime: SkewRegime,
    pub term_structure_shape: TermShape,
    pub mispriced_options_count: usize,
    pub signal: SurfaceSignal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IvSurface {
    pub surface: Vec<SurfacePoint>,
    pub skew_analysis: SkewAnalysis,
    pub anomalies: Vec<Anomaly>,
    pub term_structure: Vec<TermPoint>,
    pub summary: SurfaceSummary,
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

fn is_atm(point: &SurfacePoint) -> bool {
    (point.moneyness - 1.0).abs() < ATM_BAND
}

/// Quoted IV if present, else the IV implied by the quoted price, else 0.
fn side_iv(
    quoted_iv: Option<f64>,
    quoted_price: Option<f64>,
    spot: f64,
    quote: &StrikeQuote,
    r: f64,
    option_type: OptionType,
) -> f64 {
    if let Some(iv) = quoted_iv {
        return iv;
    }
    let Some(price) = quoted_price else {
        return 0.0;
    };
    let t = quote.expiry_days / DAYS_PER_YEAR;
    match implied_volatility(price, spot, quote.strike, t, r, option_type) {
        Ok(iv) => iv,
        Err(e) => {
            tracing::debug!(strike = quote.strike, expiry_days = quote.expiry_days, error = %e, "Quote left out of the surface.");
            0.0
        }
    }
}

fn surface_point(quote: &StrikeQuote, spot: f64, r: f64) -> SurfacePoint {
    let call_iv = side_iv(quote.call_iv, quote.call_price, spot, quote, r, OptionType::Call);
    let put_iv = side_iv(quote.put_iv, quote.put_price, spot, quote, r, OptionType::Put);
    let avg_iv = match (call_iv > 0.0, put_iv > 0.0) {
        (true, true) => (call_iv + put_iv) / 2.0,
        (true, false) => call_iv,
        _ => put_iv,
    };
    SurfacePoint {
        strike: quote.strike,
        expiry_days: quote.expiry_days,
        moneyness: round4(quote.strike / spot),
        call_iv: round4(call_iv),
        put_iv: round4(put_iv),
        avg_iv: round4(avg_iv),
    }
}

/// Surface points grouped by whole days to expiry, each group sorted by strike.
fn by_expiry(surface: &[SurfacePoint]) -> BTreeMap<i64, Vec<&SurfacePoint>> {
    let mut groups: BTreeMap<i64, Vec<&SurfacePoint>> = BTreeMap::new();
    for point in surface {
        groups.entry(point.expiry_days.round() as i64).or_default().push(point);
    }
    for points in groups.values_mut() {
        points.sort_by(|a, b| a.strike.total_cmp(&b.strike));
    }
    groups
}

/// Compares out-of-the-money put and call IV against the at-the-money level.
pub fn skew_analysis(surface: &[SurfacePoint]) -> SkewAnalysis {
    let atm_iv = mean(surface.iter().filter(|p| is_atm(p) && p.avg_iv > 0.0).map(|p| p.avg_iv)).unwrap_or(DEFAULT_ATM_IV);
    let otm_put_iv = mean(
        surface
            .iter()
            .filter(|p| p.moneyness < 1.0 - ATM_BAND && p.put_iv > 0.0)
            .map(|p| p.put_iv),
    )
    .unwrap_or(atm_iv);
    let otm_call_iv = mean(
        surface
            .iter()
            .filter(|p| p.moneyness > 1.0 + ATM_BAND && p.call_iv > 0.0)
            .map(|p| p.call_iv),
    )
    .unwrap_or(atm_iv);

    let skew = otm_put_iv - otm_call_iv;
    let skew_direction = if skew > SKEW_BALANCE {
        SkewDirection::PutHeavy
    } else if skew < -SKEW_BALANCE {
        SkewDirection::CallHeavy
    } else {
        SkewDirection::Balanced
    };

    SkewAnalysis {
        current_skew: round4(skew),
        skew_direction,
        put_call_iv_ratio: round4(if otm_call_iv > 0.0 { otm_put_iv / otm_call_iv } else { 1.0 }),
        atm_iv: round4(atm_iv),
        otm_put_iv: round4(otm_put_iv),
        otm_call_iv: round4(otm_call_iv),
        smile_curvature: round4((otm_put_iv + otm_call_iv) / 2.0 - atm_iv),
    }
}

/// Flags strikes whose IV breaks from their neighbours on the same expiry, and
/// strikes whose call and put IV disagree. The most severe come first.
pub fn detect_anomalies(surface: &[SurfacePoint]) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();

    for points in by_expiry(surface).values() {
        for window in points.windows(3) {
            let (prev, curr, next) = (window[0].avg_iv, window[1].avg_iv, window[2].avg_iv);
            if prev <= 0.0 || curr <= 0.0 || next <= 0.0 {
                continue;
            }
            let expected = (prev + next) / 2.0;
            let deviation = (curr - expected).abs() / expected;
            if deviation > SMILE_DEVIATION {
                anomalies.push(Anomaly {
                    strike: window[1].strike,
                    expiry_days: window[1].expiry_days,
                    kind: if curr > expected { AnomalyKind::IvSpike } else { AnomalyKind::IvDip },
                    severity: round4(deviation),
                    expected_iv: round4(expected),
                    actual_iv: round4(curr),
                });
            }
        }

        for p in points.iter().filter(|p| p.call_iv > 0.0 && p.put_iv > 0.0) {
            let avg = (p.call_iv + p.put_iv) / 2.0;
            let divergence = (p.call_iv - p.put_iv).abs() / avg;
            if divergence > PUT_CALL_DIVERGENCE {
                anomalies.push(Anomaly {
                    strike: p.strike,
                    expiry_days: p.expiry_days,
                    kind: AnomalyKind::PutCallIvDivergence,
                    severity: round4(divergence),
                    expected_iv: round4(avg),
                    actual_iv: round4(p.call_iv.max(p.put_iv)),
                });
            }
        }
    }

    anomalies.sort_by(|a, b| b.severity.total_cmp(&a.severity));
    anomalies.truncate(MAX_ANOMALIES);
    anomalies
}

/// At-the-money IV per expiry, nearest expiry first. An expiry with no strike
/// near spot uses the mean IV of all its strikes.
pub fn term_structure(surface: &[SurfacePoint]) -> Vec<TermPoint> {
    by_expiry(surface)
        .into_iter()
        .map(|(days, points)| {
            let priced = || points.iter().filter(|p| p.avg_iv > 0.0);
            let atm_iv = mean(priced().filter(|p| is_atm(p)).map(|p| p.avg_iv))
                .or_else(|| mean(priced().map(|p| p.avg_iv)))
                .unwrap_or(0.0);
            TermPoint {
                expiry_days: days as f64,
                atm_iv: round4(atm_iv),
            }
        })
        .collect()
}

fn term_shape(terms: &[TermPoint]) -> TermShape {
    match (terms.first(), terms.last()) {
        (Some(first), Some(last)) if terms.len() >= 2 => {
            if last.atm_iv > first.atm_iv * 1.05 {
                TermShape::Contango
            } else if last.atm_iv < first.atm_iv * 0.95 {
                TermShape::Backwardation
            } else {
                TermShape::Flat
            }
        }
        _ => TermShape::InsufficientData,
    }
}

/// Builds the volatility surface of a chain snapshot and summarizes its shape.
pub fn iv_surface(quotes: &[StrikeQuote], spot: f64, r: f64) -> Result<IvSurface> {
    if quotes.is_empty() {
        return Err(Error::InvalidInput("no strike quotes provided".into()));
    }
    if spot <= 0.0 {
        return Err(Error::InvalidInput(format!("spot ({spot}) must be positive")));
    }
    if let Some(bad) = quotes.iter().find(|q| q.strike <= 0.0) {
        return Err(Error::InvalidInput(format!("strike ({}) must be positive", bad.strike)));
    }

    let surface: Vec<SurfacePoint> = quotes.iter().map(|q| surface_point(q, spot, r)).collect();
    let skew = skew_analysis(&surface);
    let anomalies = detect_anomalies(&surface);
    let terms = term_structure(&surface);

    let overall_iv = mean(surface.iter().filter(|p| p.avg_iv > 0.0).map(|p| p.avg_iv)).unwrap_or(0.0);
    let overall_iv_level = if overall_iv > 0.35 {
        IvLevel::High
    } else if overall_iv > 0.20 {
        IvLevel::Moderate
    } else {
        IvLevel::Low
    };
    let skew_regime = if skew.current_skew.abs() < FLAT_SKEW {
        SkewRegime::Flat
    } else if skew.current_skew > 0.0 {
        SkewRegime::PutSkew
    } else {
        SkewRegime::CallSkew
    };
    let signal = if overall_iv > 0.30 && skew.put_call_iv_ratio > 1.2 {
        SurfaceSignal::SellPremium
    } else if overall_iv < 0.15 {
        SurfaceSignal::BuyPremium
    } else if anomalies.len() > 3 {
        SurfaceSignal::ArbitrageOpportunities
    } else {
        SurfaceSignal::Neutral
    };

    let summary = SurfaceSummary {
        overall_iv_level,
        skew_regime,
        term_structure_shape: term_shape(&terms),
        mispriced_options_count: anomalies.len(),
        signal,
    };
    tracing::debug!(points = surface.len(), anomalies = anomalies.len(), "Built IV surface.");

    Ok(IvSurface {
        surface,
        skew_analysis: skew,
        anomalies,
        term_structure: terms,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricer::price;

    fn quote(strike: f64, expiry_days: f64, call_iv: f64, put_iv: f64) -> StrikeQuote {
        StrikeQuote {
            strike,
            expiry_days,
            call_iv: Some(call_iv),
            put_iv: Some(put_iv),
            ..StrikeQuote::default()
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn flat_smile_is_balanced() {
        let quotes: Vec<StrikeQuote> = [90.0, 95.0, 100.0, 105.0, 110.0]
            .into_iter()
            .map(|k| quote(k, 30.0, 0.2, 0.2))
            .collect();
        let result = iv_surface(&quotes, 100.0, 0.065).unwrap();

        assert_eq!(result.surface.len(), 5);
        assert!(close(result.surface[0].moneyness, 0.9));
        assert!(close(result.skew_analysis.current_skew, 0.0));
        assert!(close(result.skew_analysis.put_call_iv_ratio, 1.0));
        assert_eq!(result.skew_analysis.skew_direction, SkewDirection::Balanced);
        assert!(result.anomalies.is_empty());
        assert_eq!(result.summary.skew_regime, SkewRegime::Flat);
        assert_eq!(result.summary.overall_iv_level, IvLevel::Low);
        assert_eq!(result.summary.term_structure_shape, TermShape::InsufficientData);
        assert_eq!(result.summary.signal, SurfaceSignal::Neutral);
    }

    #[test]
    fn rich_downside_puts_show_put_skew() {
        let quotes = [
            quote(90.0, 30.0, 0.28, 0.30),
            quote(100.0, 30.0, 0.2, 0.2),
            quote(110.0, 30.0, 0.15, 0.16),
        ];
        let result = iv_surface(&quotes, 100.0, 0.065).unwrap();
        let skew = &result.skew_analysis;

        assert!(close(skew.otm_put_iv, 0.30));
        assert!(close(skew.otm_call_iv, 0.15));
        assert!(close(skew.atm_iv, 0.2));
        assert!(close(skew.current_skew, 0.15));
        assert!(close(skew.put_call_iv_ratio, 2.0));
        assert!(close(skew.smile_curvature, 0.025));
        assert_eq!(skew.skew_direction, SkewDirection::PutHeavy);
        assert_eq!(result.summary.skew_regime, SkewRegime::PutSkew);
        assert!(result.anomalies.is_empty());
    }

    #[test]
    fn spikes_and_divergences_are_flagged() {
        let quotes = [
            quote(105.0, 30.0, 0.2, 0.2),
            quote(95.0, 30.0, 0.2, 0.2),
            quote(100.0, 30.0, 0.3, 0.3),
        ];
        let result = iv_surface(&quotes, 100.0, 0.065).unwrap();
        assert_eq!(result.anomalies.len(), 1);
        let spike = &result.anomalies[0];
        assert_eq!(spike.kind, AnomalyKind::IvSpike);
        assert_eq!(spike.strike, 100.0);
        assert!(close(spike.severity, 0.5));
        assert!(close(spike.expected_iv, 0.2));
        assert!(close(spike.actual_iv, 0.3));

        let result = iv_surface(&[quote(100.0, 30.0, 0.3, 0.2)], 100.0, 0.065).unwrap();
        let divergence = &result.anomalies[0];
        assert_eq!(divergence.kind, AnomalyKind::PutCallIvDivergence);
        assert!(close(divergence.severity, 0.4));
        assert!(close(divergence.expected_iv, 0.25));
        assert!(close(divergence.actual_iv, 0.3));
    }

    #[test]
    fn term_structure_is_sorted_by_expiry() {
        let quotes = [quote(100.0, 60.0, 0.25, 0.25), quote(100.0, 7.0, 0.15, 0.15)];
        let result = iv_surface(&quotes, 100.0, 0.065).unwrap();
        let days: Vec<f64> = result.term_structure.iter().map(|t| t.expiry_days).collect();
        assert_eq!(days, vec![7.0, 60.0]);
        assert_eq!(result.summary.term_structure_shape, TermShape::Contango);

        let inverted = [quote(100.0, 60.0, 0.15, 0.15), quote(100.0, 7.0, 0.25, 0.25)];
        let result = iv_surface(&inverted, 100.0, 0.065).unwrap();
        assert_eq!(result.summary.term_structure_shape, TermShape::Backwardation);
    }

    #[test]
    fn prices_are_inverted_into_volatility() {
        let (spot, strike, days, r) = (100.0, 100.0, 45.0, 0.065);
        let call_price = price(spot, strike, days / 365.0, 0.25, r, OptionType::Call);
        let quotes = [StrikeQuote {
            strike,
            expiry_days: days,
            call_price: Some(call_price),
            // No volatility reproduces a zero price.
            put_price: Some(0.0),
            ..StrikeQuote::default()
        }];
        let result = iv_surface(&quotes, spot, r).unwrap();
        let point = &result.surface[0];
        assert!((point.call_iv - 0.25).abs() < 0.01);
        assert_eq!(point.put_iv, 0.0);
        assert_eq!(point.avg_iv, point.call_iv);
    }

    #[test]
    fn invalid_snapshots_are_rejected() {
        assert!(matches!(iv_surface(&[], 100.0, 0.065), Err(Error::InvalidInput(_))));
        let quotes = [quote(100.0, 30.0, 0.2, 0.2)];
        assert!(matches!(iv_surface(&quotes, 0.0, 0.065), Err(Error::InvalidInput(_))));
        assert!(matches!(iv_surface(&[quote(-5.0, 30.0, 0.2, 0.2)], 100.0, 0.065), Err(Error::InvalidInput(_))));
    }
}
