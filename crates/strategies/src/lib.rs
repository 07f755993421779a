// In crates/strategies/src/lib.rs

use core_types::Bar;
use rust_decimal::Decimal;

pub mod breakout;
pub mod error;
pub mod factory;
pub mod indicators;
pub mod ma_crossover;
pub mod mean_reversion;
pub mod momentum;
pub mod rsi_reversal;
pub mod state;
pub mod types;

pub use error::{Error, Result};
pub use factory::StrategyKind;
pub use state::{OpenPosition, SimulationResult, SimulationState};

/// The universal interface for a bar-replay strategy.
///
/// A simulator precomputes whatever indicator series it needs, then folds
/// `step` over every bar after the first. The state is owned by the fold, so a
/// simulator itself never changes between runs and can be shared across threads.
pub trait Simulator {
    /// Indicator series computed once per replay.
    type Series;

    /// The name of the strategy.
    fn name(&self) -> &'static str;

    fn prepare(&self, bars: &[Bar]) -> Self::Series;

    /// Applies the strategy's rules to bar `i` (always `>= 1`).
    fn step(
        &self,
        state: SimulationState,
        series: &Self::Series,
        bars: &[Bar],
        i: usize,
    ) -> SimulationState;

    /// Replays `bars` from `initial_capital`. Emits one equity point per bar.
    fn simulate(&self, bars: &[Bar], initial_capital: Decimal) -> SimulationResult {
        let Some(first) = bars.first() else {
            return SimulationResult::default();
        };
        let series = self.prepare(bars);
        let seed = SimulationState::seed(first.timestamp, initial_capital);

        let final_state = (1..bars.len()).fold(seed, |state, i| {
            self.step(state, &series, bars, i).mark(bars[i].timestamp)
        });

        tracing::debug!(
            strategy = self.name(),
            bars = bars.len(),
            trades = final_state.trades.len(),
            capital = %final_state.capital,
            "Replay finished."
        );
        final_state.into_result()
    }
}
