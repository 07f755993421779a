// In crates/options/src/multi_leg.rs

use crate::legs::OptionLeg;
use crate::pricer::{OptionType, greeks};
use core_types::num::{round2, round4};
use serde::{Deserialize, Serialize};

/// Number of intervals in a payoff curve; the curve has one more sample.
pub const PAYOFF_STEPS: usize = 200;
/// Default half-width of the payoff range, percent of spot.
pub const DEFAULT_RANGE_PERCENT: f64 = 30.0;

/// Underlying prices a payoff curve is sampled over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoffRange {
    pub low: f64,
    pub high: f64,
}

impl PayoffRange {
    /// `spot` plus or minus `percent` of itself.
    pub fn around(spot: f64, percent: f64) -> Self {
        let half_width = spot * percent / 100.0;
        Self {
            low: (spot - half_width).max(0.0),
            high: spot + half_width,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoffPoint {
    pub spot_price: f64,
    pub pnl: f64,
}

/// Best or worst outcome of a strategy at expiry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfitBound {
    Finite(f64),
    Unbounded,
}

/// Aggregate Greeks and expiry profile of a leg set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyGreeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
    /// Premium received minus premium paid; negative for a net debit.
    pub net_premium: f64,
    pub max_profit: ProfitBound,
    pub max_loss: ProfitBound,
    pub breakevens: Vec<f64>,
}

/// Expiry profit or loss of the whole leg set with the underlying at `spot`.
pub fn payoff_at(legs: &[OptionLeg], spot: f64) -> f64 {
    legs.iter().map(|leg| leg.payoff_at(spot)).sum()
}

/// Samples the expiry payoff over `range`, defaulting to 30% either side of `spot`.
pub fn payoff_curve(legs: &[OptionLeg], spot: f64, range: Option<PayoffRange>) -> Vec<PayoffPoint> {
    let range = range.unwrap_or_else(|| PayoffRange::around(spot, DEFAULT_RANGE_PERCENT));
    let step = (range.high - range.low) / PAYOFF_STEPS as f64;

    (0..=PAYOFF_STEPS)
        .map(|i| {
            let price = range.low + step * i as f64;
            PayoffPoint {
                spot_price: round2(price),
                pnl: round2(payoff_at(legs, price)),
            }
        })
        .collect()
}

/// Net premium of the leg set; positive for a credit.
pub fn net_premium(legs: &[OptionLeg]) -> f64 {
    legs.iter().map(|leg| -leg.signed_qty() * leg.premium).sum()
}

/// Underlying prices at which the sampled payoff crosses or touches zero.
///
/// Sign changes between neighbouring samples are located by linear
/// interpolation. A run of zero samples counts once: at its first sample when
/// the payoff arrives from a non-zero value, else at its last sample when the
/// payoff leaves zero after it. A payoff that is zero everywhere has none.
pub fn breakevens(curve: &[PayoffPoint]) -> Vec<f64> {
    let mut points = Vec::new();
    let mut i = 0;
    while i < curve.len() {
        let point = &curve[i];
        if point.pnl == 0.0 {
            let start = i;
            while curve.get(i + 1).is_some_and(|next| next.pnl == 0.0) {
                i += 1;
            }
            if start > 0 {
                points.push(round2(curve[start].spot_price));
            } else if i + 1 < curve.len() {
                points.push(round2(curve[i].spot_price));
            }
        } else if let Some(next) = curve.get(i + 1) {
            if point.pnl * next.pnl < 0.0 {
                let fraction = -point.pnl / (next.pnl - point.pnl);
                points.push(round2(point.spot_price + fraction * (next.spot_price - point.spot_price)));
            }
        }
        i += 1;
    }
    points
}

/// Aggregate Greeks, premium and expiry bounds of a leg set.
///
/// Greeks are the per-unit Greeks of each leg, signed by action and scaled by
/// quantity. Any net long call exposure leaves the upside unbounded and any
/// net short call exposure leaves the downside unbounded; otherwise the bounds
/// are the extremes of the payoff curve over `range`.
pub fn strategy_greeks(
    legs: &[OptionLeg],
    spot: f64,
    t: f64,
    vol: f64,
    r: f64,
    range: Option<PayoffRange>,
) -> StrategyGreeks {
    let mut total = crate::pricer::Greeks::default();
    for leg in legs {
        let g = greeks(spot, leg.strike, t, vol, r, leg.option_type);
        let weight = leg.signed_qty();
        total.delta += g.delta * weight;
        total.gamma += g.gamma * weight;
        total.theta += g.theta * weight;
        total.vega += g.vega * weight;
        total.rho += g.rho * weight;
    }

    let curve = payoff_curve(legs, spot, range);
    let highest = curve.iter().map(|p| p.pnl).fold(f64::NEG_INFINITY, f64::max);
    let lowest = curve.iter().map(|p| p.pnl).fold(f64::INFINITY, f64::min);

    let net_long_calls: f64 = legs
        .iter()
        .filter(|leg| leg.option_type == OptionType::Call)
        .map(OptionLeg::signed_qty)
        .sum();

    let max_profit = if net_long_calls > 0.0 {
        ProfitBound::Unbounded
    } else {
        ProfitBound::Finite(highest)
    };
    let max_loss = if net_long_calls < 0.0 {
        ProfitBound::Unbounded
    } else {
        ProfitBound::Finite(lowest)
    };

    StrategyGreeks {
        delta: round4(total.delta),
        gamma: round4(total.gamma),
        theta: round4(total.theta),
        vega: round4(total.vega),
        rho: round4(total.rho),
        net_premium: round2(net_premium(legs)),
        max_profit,
        max_loss,
        breakevens: breakevens(&curve),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legs::LegAction;
    use crate::pricer::price;

    fn iron_condor() -> Vec<OptionLeg> {
        vec![
            OptionLeg::new(OptionType::Put, LegAction::Buy, 80.0, 1, 0.5),
            OptionLeg::new(OptionType::Put, LegAction::Sell, 90.0, 1, 1.5),
            OptionLeg::new(OptionType::Call, LegAction::Sell, 110.0, 1, 1.5),
            OptionLeg::new(OptionType::Call, LegAction::Buy, 120.0, 1, 0.5),
        ]
    }

    #[test]
    fn iron_condor_profile() {
        let legs = iron_condor();
        assert_eq!(net_premium(&legs), 2.0);
        // Between the short strikes every option expires worthless.
        assert_eq!(payoff_at(&legs, 100.0), 2.0);
        // Beyond the wings the loss is the wing width less the credit.
        assert_eq!(payoff_at(&legs, 60.0), -8.0);
        assert_eq!(payoff_at(&legs, 150.0), -8.0);

        let curve = payoff_curve(&legs, 100.0, None);
        assert_eq!(curve.len(), PAYOFF_STEPS + 1);
        assert!((curve[0].spot_price - 70.0).abs() < 1e-9);
        assert!((curve[PAYOFF_STEPS].spot_price - 130.0).abs() < 1e-9);
        assert_eq!(curve[0].pnl, -8.0);
        assert_eq!(curve[PAYOFF_STEPS].pnl, -8.0);

        let summary = strategy_greeks(&legs, 100.0, 30.0 / 365.0, 0.2, 0.06, None);
        assert_eq!(summary.max_profit, ProfitBound::Finite(2.0));
        assert_eq!(summary.max_loss, ProfitBound::Finite(-8.0));
        assert_eq!(summary.net_premium, 2.0);
        assert_eq!(summary.breakevens.len(), 2);
        assert!((summary.breakevens[0] - 88.0).abs() < 0.011);
        assert!((summary.breakevens[1] - 112.0).abs() < 0.011);
    }

    #[test]
    fn long_straddle_is_near_delta_neutral() {
        let (spot, t, vol, r) = (100.0, 30.0 / 365.0, 0.2, 0.06);
        let call_premium = price(spot, 100.0, t, vol, r, OptionType::Call);
        let put_premium = price(spot, 100.0, t, vol, r, OptionType::Put);
        let legs = vec![
            OptionLeg::new(OptionType::Call, LegAction::Buy, 100.0, 1, call_premium),
            OptionLeg::new(OptionType::Put, LegAction::Buy, 100.0, 1, put_premium),
        ];

        let summary = strategy_greeks(&legs, spot, t, vol, r, None);
        assert!(summary.delta.abs() < 0.15);
        assert!(summary.gamma > 0.0);
        assert!(summary.theta < 0.0);
        assert!((net_premium(&legs) + call_premium + put_premium).abs() < 1e-12);
        assert_eq!(summary.max_profit, ProfitBound::Unbounded);
        assert!(matches!(summary.max_loss, ProfitBound::Finite(loss) if loss < 0.0));
        assert_eq!(summary.breakevens.len(), 2);
    }

    #[test]
    fn naked_short_call_has_unbounded_loss() {
        let legs = vec![OptionLeg::new(OptionType::Call, LegAction::Sell, 105.0, 2, 1.25)];
        let summary = strategy_greeks(&legs, 100.0, 0.1, 0.25, 0.05, None);
        assert_eq!(summary.max_loss, ProfitBound::Unbounded);
        assert_eq!(summary.max_profit, ProfitBound::Finite(2.5));
        assert!(summary.delta < 0.0);
        assert_eq!(summary.breakevens, vec![106.25]);
    }

    #[test]
    fn breakevens_interpolate_between_samples() {
        let curve = [
            PayoffPoint { spot_price: 10.0, pnl: -2.0 },
            PayoffPoint { spot_price: 11.0, pnl: 2.0 },
            PayoffPoint { spot_price: 12.0, pnl: 0.0 },
            PayoffPoint { spot_price: 13.0, pnl: 0.5 },
        ];
        assert_eq!(breakevens(&curve), vec![10.5, 12.0]);
    }

    #[test]
    fn custom_range_is_respected() {
        let legs = vec![OptionLeg::new(OptionType::Put, LegAction::Buy, 50.0, 1, 2.0)];
        let curve = payoff_curve(&legs, 50.0, Some(PayoffRange { low: 40.0, high: 60.0 }));
        assert_eq!(curve.first().map(|p| p.pnl), Some(8.0));
        assert_eq!(curve.last().map(|p| p.pnl), Some(-2.0));
    }

    #[test]
    fn flat_zero_stretch_is_one_breakeven() {
        // Zero-cost bull call spread: flat at zero below 100, flat at +10 above 110.
        let legs = vec![
            OptionLeg::new(OptionType::Call, LegAction::Buy, 100.0, 1, 5.0),
            OptionLeg::new(OptionType::Call, LegAction::Sell, 110.0, 1, 5.0),
        ];
        let summary = strategy_greeks(&legs, 100.0, 30.0 / 365.0, 0.2, 0.06, None);
        assert_eq!(summary.breakevens, vec![100.0]);

        let zero = |spot_price| PayoffPoint { spot_price, pnl: 0.0 };
        let flat = [zero(1.0), zero(2.0), zero(3.0)];
        assert!(breakevens(&flat).is_empty());

        let dip = [
            PayoffPoint { spot_price: 1.0, pnl: -1.0 },
            zero(2.0),
            zero(3.0),
            PayoffPoint { spot_price: 4.0, pnl: 1.0 },
        ];
        assert_eq!(breakevens(&dip), vec![2.0]);
    }

    #[test]
    fn summary_bounds_follow_the_requested_range() {
        let legs = vec![OptionLeg::new(OptionType::Put, LegAction::Buy, 50.0, 1, 2.0)];
        let (t, vol, r) = (30.0 / 365.0, 0.2, 0.06);

        let default = strategy_greeks(&legs, 50.0, t, vol, r, None);
        assert_eq!(default.max_profit, ProfitBound::Finite(13.0));

        let narrow = strategy_greeks(&legs, 50.0, t, vol, r, Some(PayoffRange::around(50.0, 20.0)));
        assert_eq!(narrow.max_profit, ProfitBound::Finite(8.0));
        assert_eq!(narrow.max_loss, ProfitBound::Finite(-2.0));
        assert_eq!(narrow.breakevens, vec![48.0]);
    }
}
