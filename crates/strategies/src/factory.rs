// In crates/strategies/src/factory.rs

use crate::breakout::OpeningRangeBreakout;
use crate::ma_crossover::MaCrossover;
use crate::mean_reversion::MeanReversion;
use crate::momentum::Momentum;
use crate::rsi_reversal::RsiReversal;
use crate::types::{
    BreakoutSettings, MaCrossoverSettings, MeanReversionSettings, MomentumSettings, RsiReversalSettings,
};
use crate::{Error, Result, SimulationResult, Simulator};
use core_types::{Bar, StrategyConfig};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

pub const OPENING_RANGE_BREAKOUT: &str = "opening_range_breakout";
pub const MA_CROSSOVER: &str = "ma_crossover";
pub const MEAN_REVERSION: &str = "mean_reversion";
pub const MOMENTUM: &str = "momentum";
pub const RSI_REVERSAL: &str = "rsi_reversal";

/// Every strategy this crate can replay, already configured.
#[derive(Debug, Clone)]
pub enum StrategyKind {
    OpeningRangeBreakout(OpeningRangeBreakout),
    MaCrossover(MaCrossover),
    MeanReversion(MeanReversion),
    Momentum(Momentum),
    RsiReversal(RsiReversal),
}

impl Default for StrategyKind {
    fn default() -> Self {
        StrategyKind::OpeningRangeBreakout(OpeningRangeBreakout::new(BreakoutSettings::default()))
    }
}

fn settings<T: DeserializeOwned>(strategy: &'static str, config: &StrategyConfig) -> Result<T> {
    config
        .params
        .clone()
        .try_into()
        .map_err(|source| Error::InvalidParameters { strategy, source })
}

impl StrategyKind {
    pub const IDS: [&'static str; 5] = [
        OPENING_RANGE_BREAKOUT,
        MA_CROSSOVER,
        MEAN_REVERSION,
        MOMENTUM,
        RSI_REVERSAL,
    ];

    /// Builds the strategy named by `config`.
    ///
    /// Ids are matched case-insensitively with `-` and `_` treated alike. An id
    /// that matches nothing resolves to the opening-range breakout with its
    /// default settings. Parameters that fail to deserialize are an error.
    pub fn from_config(config: &StrategyConfig) -> Result<Self> {
        let id = config.name.trim().to_ascii_lowercase().replace('-', "_");
        let kind = match id.as_str() {
            OPENING_RANGE_BREAKOUT => {
                StrategyKind::OpeningRangeBreakout(OpeningRangeBreakout::new(settings::<BreakoutSettings>(
                    OPENING_RANGE_BREAKOUT,
                    config,
                )?))
            }
            MA_CROSSOVER => {
                StrategyKind::MaCrossover(MaCrossover::new(settings::<MaCrossoverSettings>(MA_CROSSOVER, config)?))
            }
            MEAN_REVERSION => StrategyKind::MeanReversion(MeanReversion::new(settings::<MeanReversionSettings>(
                MEAN_REVERSION,
                config,
            )?)),
            MOMENTUM => StrategyKind::Momentum(Momentum::new(settings::<MomentumSettings>(MOMENTUM, config)?)),
            RSI_REVERSAL => {
                StrategyKind::RsiReversal(RsiReversal::new(settings::<RsiReversalSettings>(RSI_REVERSAL, config)?))
            }
            unknown => {
                tracing::warn!(
                    strategy = unknown,
                    fallback = OPENING_RANGE_BREAKOUT,
                    "Unknown strategy id, falling back to the default strategy."
                );
                StrategyKind::default()
            }
        };
        Ok(kind)
    }

    /// The canonical id of the resolved strategy.
    pub fn id(&self) -> &'static str {
        match self {
            StrategyKind::OpeningRangeBreakout(_) => OPENING_RANGE_BREAKOUT,
            StrategyKind::MaCrossover(_) => MA_CROSSOVER,
            StrategyKind::MeanReversion(_) => MEAN_REVERSION,
            StrategyKind::Momentum(_) => MOMENTUM,
            StrategyKind::RsiReversal(_) => RSI_REVERSAL,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::OpeningRangeBreakout(s) => s.name(),
            StrategyKind::MaCrossover(s) => s.name(),
            StrategyKind::MeanReversion(s) => s.name(),
            StrategyKind::Momentum(s) => s.name(),
            StrategyKind::RsiReversal(s) => s.name(),
        }
    }

    pub fn simulate(&self, bars: &[Bar], initial_capital: Decimal) -> SimulationResult {
        match self {
            StrategyKind::OpeningRangeBreakout(s) => s.simulate(bars, initial_capital),
            StrategyKind::MaCrossover(s) => s.simulate(bars, initial_capital),
            StrategyKind::MeanReversion(s) => s.simulate(bars, initial_capital),
            StrategyKind::Momentum(s) => s.simulate(bars, initial_capital),
            StrategyKind::RsiReversal(s) => s.simulate(bars, initial_capital),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toml::Value;

    #[test]
    fn unknown_id_falls_back_to_breakout_defaults() {
        let mut config = StrategyConfig::with_defaults("does-not-exist");
        config.set("targetPercent", Value::String("nonsense".into()));

        let kind = StrategyKind::from_config(&config).unwrap();
        match kind {
            StrategyKind::OpeningRangeBreakout(s) => assert_eq!(s.settings(), &BreakoutSettings::default()),
            other => panic!("expected breakout, got {}", other.id()),
        }
    }

    #[test]
    fn ids_are_normalized() {
        let kind = StrategyKind::from_config(&StrategyConfig::with_defaults("MA-Crossover")).unwrap();
        assert_eq!(kind.id(), MA_CROSSOVER);
        assert_eq!(kind.name(), "MovingAverageCrossover");
    }

    #[test]
    fn params_override_defaults_and_missing_keys_keep_them() {
        let mut config = StrategyConfig::with_defaults(MA_CROSSOVER);
        config.set("shortPeriod", Value::Integer(5));
        let StrategyKind::MaCrossover(s) = StrategyKind::from_config(&config).unwrap() else {
            panic!("expected ma crossover");
        };
        assert_eq!(s.settings().short_period, 5);
        assert_eq!(s.settings().long_period, 21);
    }

    #[test]
    fn breakout_accepts_integer_percentages() {
        let mut config = StrategyConfig::with_defaults(OPENING_RANGE_BREAKOUT);
        config.set("targetPercent", Value::Integer(2));
        let StrategyKind::OpeningRangeBreakout(s) = StrategyKind::from_config(&config).unwrap() else {
            panic!("expected breakout");
        };
        assert_eq!(s.settings().target_percent, 2.0);
    }

    #[test]
    fn malformed_params_are_rejected() {
        let mut config = StrategyConfig::with_defaults(MOMENTUM);
        config.set("lookback", Value::String("twenty".into()));
        assert!(matches!(
            StrategyKind::from_config(&config),
            Err(Error::InvalidParameters { strategy: MOMENTUM, .. })
        ));
    }

    #[test]
    fn every_id_resolves_to_itself() {
        for id in StrategyKind::IDS {
            let kind = StrategyKind::from_config(&StrategyConfig::with_defaults(id)).unwrap();
            assert_eq!(kind.id(), id);
        }
    }
}
