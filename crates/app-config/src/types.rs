// In crates/app-config/src/types.rs

use core_types::StrategyConfig;
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// The application's general settings.
    pub app: AppSettings,
    pub backtest: BacktestSettings,
    pub options: OptionsSettings,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    /// The environment the application is running in (e.g., "development", "production").
    pub environment: String,
    /// Default level for the log filter.
    pub log_level: String,
    /// Worker threads for parameter sweeps; 0 lets rayon decide.
    pub sweep_cores: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            environment: "development".into(),
            log_level: "info".into(),
            sweep_cores: 0,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BacktestSettings {
    pub initial_capital: Decimal,
    /// Strategy used when the command line names none.
    pub strategy: StrategyConfig,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            initial_capital: Decimal::from(100_000),
            strategy: StrategyConfig::with_defaults("opening_range_breakout"),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct OptionsSettings {
    /// Annual risk-free rate as a fraction.
    pub risk_free_rate: f64,
    /// Annual volatility used when a request supplies none.
    pub volatility: f64,
    /// Half-width of payoff tables, percent of spot.
    pub payoff_range_percent: f64,
}

impl Default for OptionsSettings {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.065,
            volatility: 0.15,
            payoff_range_percent: 30.0,
        }
    }
}
