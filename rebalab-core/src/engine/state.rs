//! Engine configuration, per-run state, and run result types.

use super::custom::CustomSchedule;
use super::error::SimulationError;
use super::irregular::{IrregularTrigger, DEFAULT_IRREGULAR_COOLDOWN};
use super::reservation::ReservationBook;
use crate::calendar::{Moment, Periodicity, RebalanceRule};
use crate::domain::{AllocationTarget, PortfolioLedger};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rule: RebalanceRule,
    /// Trading days between a decision and its buy settlement.
    pub buy_delay: usize,
    /// Trading days between a decision and its sell settlement.
    pub sell_delay: usize,
    /// Fraction of each trade lost to fees, in [0, 1).
    pub transaction_fee: f64,
    pub initial_cash: f64,
    pub irregular_cooldown: u32,
    pub custom_schedule: Option<CustomSchedule>,
}

impl EngineConfig {
    /// Monthly/first rebalancing, zero delays, no fee.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, initial_cash: f64) -> Self {
        Self {
            start_date,
            end_date,
            rule: RebalanceRule::new(Periodicity::Monthly, Moment::First),
            buy_delay: 0,
            sell_delay: 0,
            transaction_fee: 0.0,
            initial_cash,
            irregular_cooldown: DEFAULT_IRREGULAR_COOLDOWN,
            custom_schedule: None,
        }
    }

    pub fn with_rule(mut self, rule: RebalanceRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_delays(mut self, buy_delay: usize, sell_delay: usize) -> Self {
        self.buy_delay = buy_delay;
        self.sell_delay = sell_delay;
        self
    }

    pub fn with_fee(mut self, transaction_fee: f64) -> Self {
        self.transaction_fee = transaction_fee;
        self
    }

    pub fn with_irregular_cooldown(mut self, days: u32) -> Self {
        self.irregular_cooldown = days;
        self
    }

    pub fn with_custom_schedule(mut self, schedule: CustomSchedule) -> Self {
        self.custom_schedule = Some(schedule);
        self
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.start_date > self.end_date {
            return Err(SimulationError::InvalidConfig(format!(
                "start date {} is after end date {}",
                self.start_date, self.end_date
            )));
        }
        if !(0.0..1.0).contains(&self.transaction_fee) {
            return Err(SimulationError::InvalidConfig(format!(
                "transaction fee {} must be within [0, 1)",
                self.transaction_fee
            )));
        }
        if !self.initial_cash.is_finite() || self.initial_cash < 0.0 {
            return Err(SimulationError::InvalidConfig(format!(
                "initial cash {} must be finite and non-negative",
                self.initial_cash
            )));
        }
        Ok(())
    }

    /// Delay pair (buy, sell) in force on `date`.
    pub fn delays_on(&self, date: NaiveDate) -> (usize, usize) {
        match &self.custom_schedule {
            Some(custom) if custom.is_active(date) => (custom.buy_delay, custom.sell_delay),
            _ => (self.buy_delay, self.sell_delay),
        }
    }
}

/// An allocation set by the strategy but not yet turned into orders.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedAllocation {
    pub target: AllocationTarget,
    /// Settle with zero delay regardless of the configured delays.
    pub immediate: bool,
    /// Cancel pending buys and sell everything at today's settlement.
    pub liquidation: bool,
}

impl StagedAllocation {
    pub fn delayed(target: AllocationTarget) -> Self {
        Self {
            target,
            immediate: false,
            liquidation: false,
        }
    }

    pub fn immediate(target: AllocationTarget) -> Self {
        Self {
            target,
            immediate: true,
            liquidation: false,
        }
    }

    /// A 100% cash target that overrides every order still in flight.
    pub fn liquidation() -> Self {
        Self {
            target: AllocationTarget::all_cash(),
            immediate: true,
            liquidation: true,
        }
    }
}

/// Portfolio value, cash and holdings at the close of one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationRow {
    pub date: NaiveDate,
    pub total_value: f64,
    pub cash: f64,
    pub holdings: BTreeMap<String, f64>,
}

/// A dated weight vector (rebalancing targets, executed orders, or allocations).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRow {
    pub date: NaiveDate,
    pub weights: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRow {
    pub date: NaiveDate,
    pub message: String,
}

/// Everything recorded while the run progresses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunLogs {
    pub valuations: Vec<ValuationRow>,
    pub rebalancing_weights: Vec<WeightRow>,
    pub order_weights: Vec<WeightRow>,
    pub allocation_history: Vec<WeightRow>,
    pub events: Vec<EventRow>,
    /// Held-instrument revaluations that found no return (treated as 0%).
    pub data_gaps: usize,
    /// Sell orders dropped because nothing was held.
    pub skipped_orders: usize,
}

/// Mutable state threaded through every phase transition.
///
/// Phases take the state by value and hand back the next one.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub date: NaiveDate,
    /// Position of `date` among the run's trading days.
    pub day_index: usize,
    pub ledger: PortfolioLedger,
    pub reservations: ReservationBook,
    pub staged: Option<StagedAllocation>,
    pub irregular: IrregularTrigger,
    pub logs: RunLogs,
}

impl EngineState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            date: config.start_date,
            day_index: 0,
            ledger: PortfolioLedger::new(config.initial_cash, config.transaction_fee),
            reservations: ReservationBook::new(),
            staged: None,
            irregular: IrregularTrigger::new(config.irregular_cooldown),
            logs: RunLogs::default(),
        }
    }
}

/// Result of a complete run, handed to external reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Date-indexed portfolio value, cash, and per-instrument amounts.
    pub valuations: Vec<ValuationRow>,
    /// Weights passed to `set_allocation`, per decision date.
    pub rebalancing_weights: Vec<WeightRow>,
    /// Executed signed amounts divided by post-settlement value, per settlement date.
    pub order_weights: Vec<WeightRow>,
    /// End-of-day allocation weights.
    pub allocation_history: Vec<WeightRow>,
    pub events: Vec<EventRow>,
    pub rebalancing_days: Vec<NaiveDate>,
    pub trading_day_count: usize,
    pub data_gaps: usize,
    pub skipped_orders: usize,
    pub final_value: f64,
    pub final_ledger: PortfolioLedger,
}

impl RunResult {
    pub(crate) fn from_state(state: EngineState, rebalancing_days: Vec<NaiveDate>, trading_day_count: usize) -> Self {
        let final_value = state.ledger.total_value();
        let logs = state.logs;
        Self {
            valuations: logs.valuations,
            rebalancing_weights: logs.rebalancing_weights,
            order_weights: logs.order_weights,
            allocation_history: logs.allocation_history,
            events: logs.events,
            rebalancing_days,
            trading_day_count,
            data_gaps: logs.data_gaps,
            skipped_orders: logs.skipped_orders,
            final_value,
            final_ledger: state.ledger,
        }
    }

    /// Portfolio value series in date order.
    pub fn value_curve(&self) -> Vec<f64> {
        self.valuations.iter().map(|v| v.total_value).collect()
    }
}
