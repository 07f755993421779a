// In crates/analytics/src/engine.rs

use crate::types::{Metrics, PROFIT_FACTOR_CAP, RiskReport};
use chrono::{DateTime, Utc};
use core_types::num::{round2, round4, round_money};
use core_types::{EquityPoint, TradeRecord};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

const TRADING_DAYS: f64 = 252.0;
const DAYS_PER_YEAR: f64 = 365.25;
/// Shortest period a backtest is annualized over.
const MIN_YEARS: f64 = 1.0 / 12.0;
/// Default per-period risk-free rate for `risk_report`: 6% a year.
const DEFAULT_RISK_FREE_RATE: f64 = 0.06 / TRADING_DAYS;

/// The engine responsible for calculating performance metrics from trade data.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnalyticsEngine;

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self
    }

    /// Calculates the full metric set from a trade log and its equity curve.
    pub fn calculate(
        &self,
        trades: &[TradeRecord],
        initial_capital: Decimal,
        equity_curve: &[EquityPoint],
    ) -> Metrics {
        if trades.is_empty() {
            return Metrics::default();
        }
        let total = trades.len();
        let years = span_in_years(trades, equity_curve);

        // --- Growth ---
        let final_equity = equity_curve
            .last()
            .map(|p| p.value)
            .unwrap_or_else(|| initial_capital + trades.iter().map(|t| t.pnl).sum::<Decimal>());
        let cagr = cagr(initial_capital, final_equity, years);
        let max_drawdown = round2(max_drawdown_percent(equity_curve));

        // --- Risk-adjusted returns on per-trade percentages ---
        let returns: Vec<f64> = trades.iter().map(|t| t.pnl_percent).collect();
        let mean = mean(&returns);
        let std_dev = population_std_dev(&returns, mean);
        let downside = downside_deviation(&returns);
        let trades_per_year = years * TRADING_DAYS / total as f64;
        let annualization = (TRADING_DAYS / trades_per_year.max(1.0)).sqrt();

        let sharpe_ratio = if std_dev > 0.0 {
            round2(mean / std_dev * annualization)
        } else {
            0.0
        };
        let sortino_ratio = if downside > 0.0 {
            round2(mean / downside * annualization)
        } else {
            0.0
        };
        let calmar_ratio = if max_drawdown > 0.0 {
            round4(cagr / max_drawdown)
        } else {
            0.0
        };

        // --- Win/loss breakdown ---
        let wins: Vec<Decimal> = trades.iter().filter(|t| t.is_win()).map(|t| t.pnl).collect();
        let losses: Vec<Decimal> = trades.iter().filter(|t| t.is_loss()).map(|t| t.pnl.abs()).collect();
        let gross_profit: Decimal = wins.iter().sum();
        let gross_loss: Decimal = losses.iter().sum();

        let profit_factor = if !gross_loss.is_zero() {
            round2((gross_profit / gross_loss).to_f64().unwrap_or(0.0))
        } else if !gross_profit.is_zero() {
            PROFIT_FACTOR_CAP
        } else {
            0.0
        };

        let metrics = Metrics {
            cagr,
            max_drawdown,
            sharpe_ratio,
            sortino_ratio,
            calmar_ratio,
            win_rate: round2(wins.len() as f64 / total as f64 * 100.0),
            profit_factor,
            total_trades: total as u32,
            avg_win: average(gross_profit, wins.len()),
            avg_loss: average(gross_loss, losses.len()),
        };
        tracing::debug!(
            trades = total,
            years,
            cagr = metrics.cagr,
            sharpe = metrics.sharpe_ratio,
            max_drawdown = metrics.max_drawdown,
            "Performance metrics calculated."
        );
        metrics
    }

    /// Risk statistics of a periodic return series compounded from `initial_capital`.
    ///
    /// Sharpe and Sortino use excess returns over `risk_free_rate` (per period,
    /// 6% a year by default) and are annualized with `sqrt(252)`. VaR and CVaR
    /// are historical and expressed in money.
    pub fn risk_report(
        &self,
        returns: &[f64],
        initial_capital: f64,
        risk_free_rate: Option<f64>,
    ) -> RiskReport {
        if returns.is_empty() {
            return RiskReport::default();
        }
        let rf = risk_free_rate.unwrap_or(DEFAULT_RISK_FREE_RATE);
        let n = returns.len() as f64;
        let mean_return = mean(returns);
        let mean_excess = mean_return - rf;
        let std_dev = population_std_dev(returns, mean_return);
        let downside = downside_deviation(returns);
        let annualization = TRADING_DAYS.sqrt();

        let sharpe_ratio = if std_dev > 0.0 {
            mean_excess / std_dev * annualization
        } else {
            0.0
        };
        let sortino_ratio = if downside > 0.0 {
            mean_excess / downside * annualization
        } else {
            0.0
        };

        // Compounded NAV walk.
        let mut nav = initial_capital;
        let mut peak = nav;
        let mut max_dd = 0.0_f64;
        for r in returns {
            nav *= 1.0 + r;
            peak = peak.max(nav);
            if peak > 0.0 {
                max_dd = max_dd.max((peak - nav) / peak);
            }
        }

        let annualized_return = mean_return * TRADING_DAYS * 100.0;
        let max_drawdown_percent = max_dd * 100.0;
        let calmar_ratio = if max_dd > 0.0 {
            annualized_return / max_drawdown_percent
        } else {
            0.0
        };

        let mut sorted = returns.to_vec();
        sorted.sort_by(f64::total_cmp);
        let var_at = |confidence: f64| {
            let idx = ((1.0 - confidence) * n) as usize;
            sorted.get(idx).map_or(0.0, |r| -r * initial_capital)
        };
        let var_95 = var_at(0.95);
        let var_99 = var_at(0.99);
        let tail = ((1.0 - 0.95) * n) as usize;
        let cvar_95 = if tail > 0 {
            -sorted[..tail].iter().sum::<f64>() / tail as f64 * initial_capital
        } else {
            var_95
        };

        RiskReport {
            sharpe_ratio: round2(sharpe_ratio),
            sortino_ratio: round2(sortino_ratio),
            calmar_ratio: round4(calmar_ratio),
            max_drawdown: round2(max_dd * initial_capital),
            max_drawdown_percent: round2(max_drawdown_percent),
            var_95: round2(var_95),
            var_99: round2(var_99),
            cvar_95: round2(cvar_95),
            volatility: round2(std_dev * annualization * 100.0),
            annualized_return: round2(annualized_return),
        }
    }
}

/// Computes backtest metrics. See [`AnalyticsEngine::calculate`].
pub fn compute_metrics(
    trades: &[TradeRecord],
    initial_capital: Decimal,
    equity_curve: &[EquityPoint],
) -> Metrics {
    AnalyticsEngine::new().calculate(trades, initial_capital, equity_curve)
}

/// Computes return-series risk statistics. See [`AnalyticsEngine::risk_report`].
pub fn risk_report(returns: &[f64], initial_capital: f64, risk_free_rate: Option<f64>) -> RiskReport {
    AnalyticsEngine::new().risk_report(returns, initial_capital, risk_free_rate)
}

fn span_in_years(trades: &[TradeRecord], equity_curve: &[EquityPoint]) -> f64 {
    let bounds: Option<(DateTime<Utc>, DateTime<Utc>)> = match (equity_curve.first(), equity_curve.last()) {
        (Some(first), Some(last)) => Some((first.date, last.date)),
        _ => trades
            .first()
            .zip(trades.last())
            .map(|(first, last)| (first.entry_date, last.exit_date)),
    };
    let days = bounds
        .map(|(start, end)| (end - start).num_seconds() as f64 / 86_400.0)
        .unwrap_or(0.0);
    (days / DAYS_PER_YEAR).max(MIN_YEARS)
}

fn cagr(initial: Decimal, final_equity: Decimal, years: f64) -> f64 {
    if initial <= Decimal::ZERO {
        return 0.0;
    }
    if final_equity <= Decimal::ZERO {
        return -100.0;
    }
    let growth = (final_equity / initial).to_f64().unwrap_or(1.0);
    round2((growth.powf(1.0 / years) - 1.0) * 100.0)
}

fn max_drawdown_percent(equity_curve: &[EquityPoint]) -> f64 {
    let mut peak: Option<Decimal> = None;
    let mut worst = Decimal::ZERO;
    for point in equity_curve {
        let current_peak = peak.map_or(point.value, |p| p.max(point.value));
        peak = Some(current_peak);
        if current_peak <= Decimal::ZERO {
            continue;
        }
        worst = worst.max((current_peak - point.value) / current_peak);
    }
    worst.to_f64().unwrap_or(0.0) * 100.0
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Root mean square of the negative values only.
fn downside_deviation(values: &[f64]) -> f64 {
    let negatives: Vec<f64> = values.iter().copied().filter(|v| *v < 0.0).collect();
    if negatives.is_empty() {
        return 0.0;
    }
    (negatives.iter().map(|v| v * v).sum::<f64>() / negatives.len() as f64).sqrt()
}

fn average(total: Decimal, count: usize) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        round_money(total / Decimal::from(count))
    }
}
