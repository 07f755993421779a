// In crates/options/src/lib.rs

pub mod chain;
pub mod error;
pub mod legs;
pub mod multi_leg;
pub mod pricer;
pub mod scenario;
pub mod surface;

pub use chain::{MaxPain, PainPoint, iv_percentile, max_pain};
pub use error::{Error, Result};
pub use legs::{LegAction, OptionLeg};
pub use multi_leg::{
    PAYOFF_STEPS, PayoffPoint, PayoffRange, ProfitBound, StrategyGreeks, breakevens, net_premium, payoff_at,
    payoff_curve, strategy_greeks,
};
pub use pricer::{Greeks, OptionType, greeks, implied_volatility, price};
pub use scenario::{PricingContext, Scenario, ScenarioResult, scenario_simulation};
pub use surface::{IvSurface, StrikeQuote, iv_surface};
