// In crates/options/src/legs.rs

use crate::pricer::{OptionType, intrinsic};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LegAction {
    #[serde(alias = "buy")]
    Buy,
    #[serde(alias = "sell")]
    Sell,
}

impl LegAction {
    /// +1 for a bought leg, -1 for a sold one.
    pub fn sign(self) -> f64 {
        match self {
            LegAction::Buy => 1.0,
            LegAction::Sell => -1.0,
        }
    }
}

/// One option position within a multi-leg strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionLeg {
    #[serde(rename = "type", alias = "optionType")]
    pub option_type: OptionType,
    pub strike: f64,
    pub action: LegAction,
    pub qty: u32,
    /// Price paid or received per unit.
    #[serde(default)]
    pub premium: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<NaiveDate>,
}

impl OptionLeg {
    pub fn new(option_type: OptionType, action: LegAction, strike: f64, qty: u32, premium: f64) -> Self {
        Self {
            option_type,
            strike,
            action,
            qty,
            premium,
            expiry: None,
        }
    }

    /// Signed quantity: positive when long.
    pub fn signed_qty(&self) -> f64 {
        self.action.sign() * f64::from(self.qty)
    }

    /// Expiry profit or loss of this leg for an underlying settling at `spot`.
    pub fn payoff_at(&self, spot: f64) -> f64 {
        (intrinsic(spot, self.strike, self.option_type) - self.premium) * self.signed_qty()
    }
}
