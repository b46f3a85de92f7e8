//! Strategy interface — the callbacks the engine drives each trading day.
//!
//! A strategy never touches the ledger directly. It reads state and stages
//! allocations through [`StrategyContext`]; the engine turns staged targets
//! into delayed orders.

pub mod context;
pub mod fixed_weight;

pub use context::StrategyContext;
pub use fixed_weight::FixedWeightStrategy;

use crate::domain::PortfolioLedger;
use crate::engine::SimulationError;

/// User-supplied allocation logic.
///
/// Every hook defaults to a no-op. `on_irregular_rebalancing` and
/// `on_custom_schedule` fall back to `on_data`.
pub trait Strategy {
    fn name(&self) -> &str {
        "strategy"
    }

    /// Called once before the first trading day.
    fn initialize(&mut self, _ctx: &mut StrategyContext<'_>) -> Result<(), SimulationError> {
        Ok(())
    }

    fn on_start_of_day(&mut self, _ctx: &mut StrategyContext<'_>) -> Result<(), SimulationError> {
        Ok(())
    }

    /// Periodic rebalancing day.
    fn on_data(&mut self, _ctx: &mut StrategyContext<'_>) -> Result<(), SimulationError> {
        Ok(())
    }

    /// Fired once the irregular cooldown runs out after a trigger.
    fn on_irregular_rebalancing(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), SimulationError> {
        self.on_data(ctx)
    }

    /// Rebalancing day of an active custom schedule.
    fn on_custom_schedule(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), SimulationError> {
        self.on_data(ctx)
    }

    fn on_end_of_day(&mut self, _ctx: &mut StrategyContext<'_>) -> Result<(), SimulationError> {
        Ok(())
    }

    /// Called once after the last trading day with the final ledger.
    fn on_end_of_algorithm(&mut self, _ledger: &PortfolioLedger) -> Result<(), SimulationError> {
        Ok(())
    }
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn initialize(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), SimulationError> {
        (**self).initialize(ctx)
    }

    fn on_start_of_day(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), SimulationError> {
        (**self).on_start_of_day(ctx)
    }

    fn on_data(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), SimulationError> {
        (**self).on_data(ctx)
    }

    fn on_irregular_rebalancing(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), SimulationError> {
        (**self).on_irregular_rebalancing(ctx)
    }

    fn on_custom_schedule(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), SimulationError> {
        (**self).on_custom_schedule(ctx)
    }

    fn on_end_of_day(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), SimulationError> {
        (**self).on_end_of_day(ctx)
    }

    fn on_end_of_algorithm(&mut self, ledger: &PortfolioLedger) -> Result<(), SimulationError> {
        (**self).on_end_of_algorithm(ledger)
    }
}
