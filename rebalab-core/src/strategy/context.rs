//! The engine handle passed to every strategy hook.

use crate::domain::{AllocationTarget, PortfolioLedger};
use crate::engine::state::{EngineState, EventRow, StagedAllocation, WeightRow};
use crate::engine::SimulationError;
use crate::market::{MarketData, PriceType, PriceView};
use chrono::NaiveDate;

pub struct StrategyContext<'a> {
    market: &'a MarketData,
    state: &'a mut EngineState,
}

impl<'a> StrategyContext<'a> {
    pub(crate) fn new(market: &'a MarketData, state: &'a mut EngineState) -> Self {
        Self { market, state }
    }

    pub fn date(&self) -> NaiveDate {
        self.state.date
    }

    pub fn ledger(&self) -> &PortfolioLedger {
        &self.state.ledger
    }

    /// Stage a target allocation for order derivation later today.
    ///
    /// Instruments omitted get weight 0; an omitted `"cash"` entry absorbs
    /// the remainder. Fails immediately when the weights are out of range or
    /// do not sum to 1.
    pub fn set_allocation<I, S>(&mut self, weights: I) -> Result<(), SimulationError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let date = self.state.date;
        let target = AllocationTarget::from_weights(weights)
            .map_err(|source| SimulationError::Allocation { date, source })?;
        self.set_allocation_target(target);
        Ok(())
    }

    /// Stage an already validated target.
    pub fn set_allocation_target(&mut self, target: AllocationTarget) {
        self.state.logs.rebalancing_weights.push(WeightRow {
            date: self.state.date,
            weights: target.weights().clone(),
        });
        self.state.staged = Some(StagedAllocation::delayed(target));
    }

    /// Staged allocation if one is pending today, else the ledger's current weights.
    pub fn base_weight(&self) -> AllocationTarget {
        match &self.state.staged {
            Some(staged) => staged.target.clone(),
            None => self.state.ledger.allocations(),
        }
    }

    /// Price history truncated at today, with or without today's row.
    pub fn available_data(&self, price_type: PriceType, include_today: bool) -> PriceView<'a> {
        self.market.available(price_type, self.state.date, include_today)
    }

    /// Request an irregular rebalance once the cooldown runs out.
    pub fn trigger_irregular_rebalancing(&mut self) {
        self.state.irregular.trigger();
    }

    pub fn irregular_pending(&self) -> bool {
        self.state.irregular.is_pending()
    }

    pub fn log_event(&mut self, message: impl Into<String>) {
        self.state.logs.events.push(EventRow {
            date: self.state.date,
            message: message.into(),
        });
    }
}
