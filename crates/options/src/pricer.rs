// In crates/options/src/pricer.rs
//
// Closed-form Black-Scholes for European options without dividends.
// Theta is quoted per calendar day, vega and rho per one point (1%) of
// volatility or rate.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, SQRT_2};

const DAYS_PER_YEAR: f64 = 365.0;

/// Volatility search bracket and stopping rule for `implied_volatility`.
const IV_LOW: f64 = 0.01;
const IV_HIGH: f64 = 3.0;
const IV_MAX_ITERATIONS: usize = 100;
const IV_PRICE_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionType {
    #[serde(alias = "CE", alias = "call")]
    Call,
    #[serde(alias = "PE", alias = "put")]
    Put,
}

/// Per-unit sensitivities of one option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
}

pub(crate) fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + libm::erf(x / SQRT_2))
}

fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Payoff of the option if exercised at `spot` right now.
pub fn intrinsic(spot: f64, strike: f64, option_type: OptionType) -> f64 {
    match option_type {
        OptionType::Call => (spot - strike).max(0.0),
        OptionType::Put => (strike - spot).max(0.0),
    }
}

/// Inputs for which the closed form is undefined and the option is worth its
/// intrinsic value.
fn is_degenerate(spot: f64, strike: f64, t: f64, vol: f64) -> bool {
    t <= 0.0 || vol <= 0.0 || spot <= 0.0 || strike <= 0.0
}

fn d1_d2(spot: f64, strike: f64, t: f64, vol: f64, r: f64) -> (f64, f64) {
    let vol_sqrt_t = vol * t.sqrt();
    let d1 = ((spot / strike).ln() + (r + 0.5 * vol * vol) * t) / vol_sqrt_t;
    (d1, d1 - vol_sqrt_t)
}

/// Fair value of a European option.
pub fn price(spot: f64, strike: f64, t: f64, vol: f64, r: f64, option_type: OptionType) -> f64 {
    if is_degenerate(spot, strike, t, vol) {
        return intrinsic(spot, strike, option_type);
    }
    let (d1, d2) = d1_d2(spot, strike, t, vol, r);
    let discounted_strike = strike * (-r * t).exp();
    match option_type {
        OptionType::Call => spot * norm_cdf(d1) - discounted_strike * norm_cdf(d2),
        OptionType::Put => discounted_strike * norm_cdf(-d2) - spot * norm_cdf(-d1),
    }
}

/// Sensitivities of a European option.
///
/// At or past expiry, or with zero volatility, delta collapses to the
/// exercise indicator and every other Greek is zero.
pub fn greeks(spot: f64, strike: f64, t: f64, vol: f64, r: f64, option_type: OptionType) -> Greeks {
    if is_degenerate(spot, strike, t, vol) {
        let delta = match option_type {
            OptionType::Call if spot > strike => 1.0,
            OptionType::Put if spot < strike => -1.0,
            _ => 0.0,
        };
        return Greeks {
            delta,
            ..Greeks::default()
        };
    }

    let (d1, d2) = d1_d2(spot, strike, t, vol, r);
    let sqrt_t = t.sqrt();
    let pdf_d1 = norm_pdf(d1);
    let discounted_strike = strike * (-r * t).exp();
    let decay = -(spot * pdf_d1 * vol) / (2.0 * sqrt_t);

    let (delta, theta, rho) = match option_type {
        OptionType::Call => (
            norm_cdf(d1),
            decay - r * discounted_strike * norm_cdf(d2),
            discounted_strike * t * norm_cdf(d2),
        ),
        OptionType::Put => (
            norm_cdf(d1) - 1.0,
            decay + r * discounted_strike * norm_cdf(-d2),
            -discounted_strike * t * norm_cdf(-d2),
        ),
    };

    Greeks {
        delta,
        gamma: pdf_d1 / (spot * vol * sqrt_t),
        theta: theta / DAYS_PER_YEAR,
        vega: spot * pdf_d1 * sqrt_t / 100.0,
        rho: rho / 100.0,
    }
}

/// Solves for the volatility that reproduces `option_price`, by bisection.
pub fn implied_volatility(
    option_price: f64,
    spot: f64,
    strike: f64,
    t: f64,
    r: f64,
    option_type: OptionType,
) -> Result<f64> {
    if spot <= 0.0 || strike <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "spot ({spot}) and strike ({strike}) must be positive"
        )));
    }
    let no_solution = Error::NoSolution {
        price: option_price,
        low: IV_LOW,
        high: IV_HIGH,
    };
    if t <= 0.0 || option_price <= 0.0 || option_price < intrinsic(spot, strike, option_type) {
        return Err(no_solution);
    }

    let price_at = |vol: f64| price(spot, strike, t, vol, r, option_type);
    // Price is increasing in volatility, so a target outside the bracket's
    // prices has no root inside it.
    if option_price < price_at(IV_LOW) - IV_PRICE_TOLERANCE
        || option_price > price_at(IV_HIGH) + IV_PRICE_TOLERANCE
    {
        return Err(no_solution);
    }

    let (mut low, mut high) = (IV_LOW, IV_HIGH);
    for _ in 0..IV_MAX_ITERATIONS {
        let mid = 0.5 * (low + high);
        let model = price_at(mid);
        if (model - option_price).abs() < IV_PRICE_TOLERANCE {
            return Ok(mid);
        }
        if model > option_price {
            high = mid;
        } else {
            low = mid;
        }
    }
    tracing::debug!(option_price, spot, strike, "Implied volatility search hit the iteration limit.");
    Ok(0.5 * (low + high))
}
