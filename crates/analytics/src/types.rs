// In crates/analytics/src/types.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Gross-profit to gross-loss ratio reported when a run has wins and no losses.
pub const PROFIT_FACTOR_CAP: f64 = 999.99;

/// Performance summary of a single backtest.
///
/// Percentages (`cagr`, `max_drawdown`, `win_rate`) are in percent units, not
/// fractions. A run with no trades reports every field as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub cagr: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub total_trades: u32,
    pub avg_win: Decimal,
    /// Magnitude of the average losing trade.
    pub avg_loss: Decimal,
}

/// Risk statistics of a periodic (daily) return series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    /// Worst peak-to-trough loss as a share of initial capital, in money.
    pub max_drawdown: f64,
    pub max_drawdown_percent: f64,
    pub var_95: f64,
    pub var_99: f64,
    pub cvar_95: f64,
    /// Annualized standard deviation, percent.
    pub volatility: f64,
    /// Mean periodic return times 252, percent.
    pub annualized_return: f64,
}
