// In crates/app-config/src/lib.rs

use config::{Config, Environment, File};

pub mod error;
pub mod types;

// Re-export the most important types for easy access.
pub use error::{Error, Result};
pub use types::{AppSettings, BacktestSettings, OptionsSettings, Settings};

/// Loads the application settings from various sources.
///
/// Sources are layered, later ones overriding earlier ones:
/// 1. `config/base.toml`, if present.
/// 2. `config/{APP_ENVIRONMENT}.toml`, if present (`development` by default).
/// 3. Environment variables such as `APP__BACKTEST__INITIAL_CAPITAL=50000`.
///
/// Every field has a default, so loading succeeds with no files at all.
pub fn load_settings() -> Result<Settings> {
    let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".into());
    load_from("config", &environment)
}

/// Same as [`load_settings`], reading files from `dir`.
pub fn load_from(dir: &str, environment: &str) -> Result<Settings> {
    load_with(dir, environment, env_source())
}

fn env_source() -> Environment {
    Environment::with_prefix("APP").prefix_separator("__").separator("__")
}

fn load_with(dir: &str, environment: &str, vars: Environment) -> Result<Settings> {
    let settings = Config::builder()
        .add_source(File::with_name(&format!("{dir}/base")).required(false))
        .add_source(File::with_name(&format!("{dir}/{environment}")).required(false))
        .add_source(vars)
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn environment_variables_override_sections() {
        let vars: config::Map<String, String> = [
            ("APP__BACKTEST__INITIAL_CAPITAL", "50000"),
            ("APP__OPTIONS__VOLATILITY", "0.25"),
            ("APP__APP__LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let settings = load_with("does/not/exist", "test", env_source().source(Some(vars))).unwrap();
        assert_eq!(settings.backtest.initial_capital, dec!(50000));
        assert_eq!(settings.options.volatility, 0.25);
        assert_eq!(settings.app.log_level, "debug");
        // Untouched keys keep their defaults.
        assert_eq!(settings.options.risk_free_rate, 0.065);
    }
}
