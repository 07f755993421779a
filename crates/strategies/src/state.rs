// In crates/strategies/src/state.rs

use chrono::{DateTime, Utc};
use core_types::{EquityPoint, Side, TradeRecord};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::Serialize;

/// A position opened by a simulator and not yet closed.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub side: Side,
    pub entry_date: DateTime<Utc>,
    pub entry_price: Decimal,
    pub qty: u64,
    /// Index of the bar the position was opened on.
    pub entry_index: usize,
}

/// Everything a replay carries from one bar to the next.
///
/// Each transition takes the state by value and hands back the next one, so a
/// replay is a plain fold over bar indices.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    pub capital: Decimal,
    pub position: Option<OpenPosition>,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
}

/// The output of one strategy replay.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimulationResult {
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
}

impl SimulationState {
    /// Starts a replay with one equity point for the first bar.
    pub fn seed(date: DateTime<Utc>, initial_capital: Decimal) -> Self {
        Self {
            capital: initial_capital,
            position: None,
            trades: Vec::new(),
            equity_curve: vec![EquityPoint {
                date,
                value: initial_capital,
            }],
        }
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    /// Whole units affordable with `fraction` of the current capital at `price`.
    pub fn position_size(&self, price: Decimal, fraction: f64) -> u64 {
        if price <= Decimal::ZERO {
            return 0;
        }
        let fraction = Decimal::from_f64(fraction).unwrap_or_default();
        (self.capital * fraction / price)
            .floor()
            .to_u64()
            .unwrap_or(0)
    }

    /// Opens a position sized from current capital. A zero quantity leaves the
    /// state untouched, as does an already open position.
    pub fn open(
        mut self,
        side: Side,
        index: usize,
        date: DateTime<Utc>,
        price: Decimal,
        fraction: f64,
    ) -> Self {
        if self.position.is_some() {
            return self;
        }
        let qty = self.position_size(price, fraction);
        if qty == 0 {
            tracing::debug!(%date, %price, "Position size rounds to zero; entry skipped.");
            return self;
        }
        self.position = Some(OpenPosition {
            side,
            entry_date: date,
            entry_price: price,
            qty,
            entry_index: index,
        });
        self
    }

    /// Closes the open position, if any, and books the trade against capital.
    pub fn close(mut self, date: DateTime<Utc>, price: Decimal) -> Self {
        let Some(position) = self.position.take() else {
            return self;
        };
        let trade = TradeRecord::close(
            position.side,
            position.entry_date,
            position.entry_price,
            date,
            price,
            position.qty,
        );
        tracing::debug!(
            side = ?trade.side,
            qty = trade.qty,
            entry = %trade.entry_price,
            exit = %trade.exit_price,
            pnl = %trade.pnl,
            "Position closed."
        );
        self.capital += trade.pnl;
        self.trades.push(trade);
        self
    }

    /// Appends the equity point for a processed bar.
    pub fn mark(mut self, date: DateTime<Utc>) -> Self {
        self.equity_curve.push(EquityPoint {
            date,
            value: self.capital,
        });
        self
    }

    pub fn into_result(self) -> SimulationResult {
        SimulationResult {
            trades: self.trades,
            equity_curve: self.equity_curve,
        }
    }
}
