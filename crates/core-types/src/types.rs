// In crates/core-types/src/types.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::num::{round2, round_money};

/// One OHLCV sample for a fixed interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> Decimal {
        match self {
            Side::Long => Decimal::ONE,
            Side::Short => Decimal::NEGATIVE_ONE,
        }
    }
}

/// A closed round-trip trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub entry_date: DateTime<Utc>,
    pub exit_date: DateTime<Utc>,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub qty: u64,
    pub side: Side,
    pub pnl: Decimal,
    pub pnl_percent: f64,
}

impl TradeRecord {
    /// Builds the record for a position closed at `exit_price`.
    ///
    /// `pnl` is the signed price move times quantity and `pnl_percent` the signed
    /// move relative to the entry price, both rounded to 2 decimal places.
    pub fn close(
        side: Side,
        entry_date: DateTime<Utc>,
        entry_price: Decimal,
        exit_date: DateTime<Utc>,
        exit_price: Decimal,
        qty: u64,
    ) -> Self {
        let move_per_unit = (exit_price - entry_price) * side.sign();
        let pnl = round_money(move_per_unit * Decimal::from(qty));
        let pnl_percent = if entry_price.is_zero() {
            0.0
        } else {
            round2((move_per_unit / entry_price).to_f64().unwrap_or(0.0) * 100.0)
        };

        Self {
            entry_date,
            exit_date,
            entry_price,
            exit_price,
            qty,
            side,
            pnl,
            pnl_percent,
        }
    }

    pub fn is_win(&self) -> bool {
        self.pnl > Decimal::ZERO
    }

    pub fn is_loss(&self) -> bool {
        self.pnl < Decimal::ZERO
    }
}

/// A struct to hold a point in the portfolio's equity curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: DateTime<Utc>,
    pub value: Decimal,
}
