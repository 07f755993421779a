// In crates/options/src/scenario.rs

use crate::legs::OptionLeg;
use crate::pricer::price;
use core_types::num::round2;
use serde::{Deserialize, Serialize};

const DAYS_PER_YEAR: f64 = 365.0;

/// Market inputs shared by every leg when re-pricing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingContext {
    /// Years to expiry.
    pub time_to_expiry: f64,
    pub volatility: f64,
    pub risk_free_rate: f64,
}

/// A point-in-time shock: percent moves of spot and volatility after some days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Scenario {
    pub spot_change_pct: f64,
    pub iv_change_pct: f64,
    pub days_elapsed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub scenario: Scenario,
    pub spot_price: f64,
    pub volatility: f64,
    pub time_to_expiry: f64,
    pub pnl: f64,
}

/// Re-prices every leg under each scenario and nets the result against the
/// premiums originally paid or received.
pub fn scenario_simulation(
    legs: &[OptionLeg],
    spot: f64,
    ctx: PricingContext,
    scenarios: &[Scenario],
) -> Vec<ScenarioResult> {
    scenarios
        .iter()
        .map(|scenario| {
            let shocked_spot = spot * (1.0 + scenario.spot_change_pct / 100.0);
            let shocked_vol = ctx.volatility * (1.0 + scenario.iv_change_pct / 100.0);
            let remaining = (ctx.time_to_expiry - scenario.days_elapsed / DAYS_PER_YEAR).max(0.0);

            let pnl: f64 = legs
                .iter()
                .map(|leg| {
                    let value = price(
                        shocked_spot,
                        leg.strike,
                        remaining,
                        shocked_vol,
                        ctx.risk_free_rate,
                        leg.option_type,
                    );
                    (value - leg.premium) * leg.signed_qty()
                })
                .sum();

            ScenarioResult {
                scenario: *scenario,
                spot_price: round2(shocked_spot),
                volatility: shocked_vol,
                time_to_expiry: remaining,
                pnl: round2(pnl),
            }
        })
        .collect()
}
