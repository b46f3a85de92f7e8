//! Day-by-day simulation loop, the heart of the engine.
//!
//! Each trading day walks the [`DayPhase`] sequence. A phase transition
//! consumes the [`EngineState`] and returns the next one, so a run is a
//! fold over trading days and any day can be replayed from a saved state.

use super::error::SimulationError;
use super::phase::DayPhase;
use super::reservation::OrderSet;
use super::settlement::settle;
use super::state::{EngineConfig, EngineState, RunResult, StagedAllocation, ValuationRow, WeightRow};
use crate::calendar::{Magnet, TradingCalendar};
use crate::domain::TradeDelta;
use crate::market::{MarketData, PriceType};
use crate::strategy::{Strategy, StrategyContext};

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Date sets computed once before the first trading day.
#[derive(Debug, Clone)]
pub struct RunPlan {
    run_days: Vec<NaiveDate>,
    run_index: HashMap<NaiveDate, usize>,
    rebalancing_days: Vec<NaiveDate>,
    periodic: HashSet<NaiveDate>,
    custom: HashSet<NaiveDate>,
    liquidation_day: Option<NaiveDate>,
}

impl RunPlan {
    pub fn build(config: &EngineConfig, market: &MarketData) -> Result<Self, SimulationError> {
        let calendar = TradingCalendar::new(market.dates().to_vec())?;
        let run_days = calendar.trading_days(config.start_date, config.end_date).to_vec();
        if run_days.is_empty() {
            return Err(SimulationError::NoTradingDays {
                start: config.start_date,
                end: config.end_date,
            });
        }
        let run_index = run_days.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        let rebalancing_days = calendar.rebalancing_days(config.start_date, config.end_date, &config.rule)?;
        let periodic = rebalancing_days.iter().copied().collect();

        let (custom, liquidation_day): (HashSet<NaiveDate>, Option<NaiveDate>) = match &config.custom_schedule {
            Some(schedule) => {
                let from = schedule.start_date.max(config.start_date);
                let days = calendar.rebalancing_days(from, config.end_date, &schedule.rule)?;
                let liquidation = schedule.liquidation_date.and_then(|date| {
                    let snapped = calendar
                        .snap(date, Magnet::After)
                        .filter(|d| *d >= config.start_date && *d <= config.end_date);
                    if snapped.is_none() {
                        log::warn!("liquidation date {date} falls outside the run; ignored");
                    }
                    snapped
                });
                (days.into_iter().collect(), liquidation)
            }
            None => (HashSet::new(), None),
        };

        Ok(Self {
            run_days,
            run_index,
            rebalancing_days,
            periodic,
            custom,
            liquidation_day,
        })
    }

    pub fn run_days(&self) -> &[NaiveDate] {
        &self.run_days
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.run_index.get(&date).copied()
    }

    /// Periodic rebalancing days of the run.
    pub fn rebalancing_days(&self) -> &[NaiveDate] {
        &self.rebalancing_days
    }

    pub fn is_periodic_day(&self, date: NaiveDate) -> bool {
        self.periodic.contains(&date)
    }

    pub fn is_custom_day(&self, date: NaiveDate) -> bool {
        self.custom.contains(&date)
    }

    pub fn liquidation_day(&self) -> Option<NaiveDate> {
        self.liquidation_day
    }

    /// Trading day `delay` positions after `day_index`, clamped to the last run day.
    pub fn settlement_date(&self, day_index: usize, delay: usize) -> NaiveDate {
        let last = self.run_days.len() - 1;
        self.run_days[day_index.saturating_add(delay).min(last)]
    }
}

/// One run: config, market, strategy, and the precomputed plan.
pub struct Simulation<'a, S: Strategy + ?Sized> {
    config: &'a EngineConfig,
    market: &'a MarketData,
    strategy: &'a mut S,
    plan: RunPlan,
}

impl<'a, S: Strategy + ?Sized> Simulation<'a, S> {
    pub fn new(config: &'a EngineConfig, market: &'a MarketData, strategy: &'a mut S) -> Result<Self, SimulationError> {
        config.validate()?;
        let plan = RunPlan::build(config, market)?;
        Ok(Self {
            config,
            market,
            strategy,
            plan,
        })
    }

    pub fn plan(&self) -> &RunPlan {
        &self.plan
    }

    /// Fresh state positioned on the first run day, after `initialize`.
    pub fn initial_state(&mut self) -> Result<EngineState, SimulationError> {
        let mut state = EngineState::new(self.config);
        state.date = self.plan.run_days[0];
        let mut ctx = StrategyContext::new(self.market, &mut state);
        self.strategy.initialize(&mut ctx)?;
        Ok(state)
    }

    /// Advance one full trading day.
    pub fn run_day(&mut self, mut state: EngineState, day_index: usize) -> Result<EngineState, SimulationError> {
        let date = self.plan.run_days.get(day_index).copied().ok_or_else(|| {
            SimulationError::InvalidConfig(format!("day index {day_index} is past the last trading day"))
        })?;
        state.date = date;
        state.day_index = day_index;

        let mut phase = Some(DayPhase::StartOfDay);
        while let Some(current) = phase {
            state = self.transition(current, state)?;
            phase = current.next();
        }
        Ok(state)
    }

    /// Apply a single phase to the state.
    pub fn transition(&mut self, phase: DayPhase, state: EngineState) -> Result<EngineState, SimulationError> {
        match phase {
            DayPhase::StartOfDay => self.start_of_day(state),
            DayPhase::Decision => self.decide(state),
            DayPhase::OrderDerivation => Ok(self.derive_orders(state)),
            DayPhase::OpenValuation => Ok(self.revalue(state, PriceType::Open)),
            DayPhase::Settlement => Ok(self.settle_due(state)),
            DayPhase::CloseValuation => Ok(self.revalue(state, PriceType::Close)),
            DayPhase::EndOfDay => self.end_of_day(state),
        }
    }

    pub fn run(mut self) -> Result<RunResult, SimulationError> {
        let days = self.plan.run_days.len();
        log::info!(
            "starting {} from {} to {} ({} trading days, {} rebalancing days)",
            self.strategy.name(),
            self.config.start_date,
            self.config.end_date,
            days,
            self.plan.rebalancing_days.len()
        );

        let mut state = self.initial_state()?;
        for day_index in 0..days {
            state = self.run_day(state, day_index)?;
        }
        self.strategy.on_end_of_algorithm(&state.ledger)?;

        let result = RunResult::from_state(state, self.plan.rebalancing_days, days);
        log::info!(
            "finished {}: final value {:.4}, {} data gaps, {} skipped orders",
            self.strategy.name(),
            result.final_value,
            result.data_gaps,
            result.skipped_orders
        );
        Ok(result)
    }

    fn start_of_day(&mut self, mut state: EngineState) -> Result<EngineState, SimulationError> {
        let mut ctx = StrategyContext::new(self.market, &mut state);
        self.strategy.on_start_of_day(&mut ctx)?;
        Ok(state)
    }

    /// Precedence: liquidation, custom schedule, irregular trigger, periodic schedule.
    fn decide(&mut self, mut state: EngineState) -> Result<EngineState, SimulationError> {
        let date = state.date;

        if self.plan.liquidation_day == Some(date) {
            log::info!("{date}: liquidating to cash");
            let staged = StagedAllocation::liquidation();
            state.logs.rebalancing_weights.push(WeightRow {
                date,
                weights: staged.target.weights().clone(),
            });
            state.staged = Some(staged);
            return Ok(state);
        }

        if self.plan.is_custom_day(date) {
            let mut ctx = StrategyContext::new(self.market, &mut state);
            self.strategy.on_custom_schedule(&mut ctx)?;
        } else if state.irregular.is_pending() {
            if state.irregular.tick() {
                log::debug!("{date}: irregular rebalancing fires");
                let mut ctx = StrategyContext::new(self.market, &mut state);
                self.strategy.on_irregular_rebalancing(&mut ctx)?;
            }
        } else if self.plan.is_periodic_day(date) {
            let mut ctx = StrategyContext::new(self.market, &mut state);
            self.strategy.on_data(&mut ctx)?;
        }
        Ok(state)
    }

    /// Staged target → sell and buy reservations at their own delays.
    fn derive_orders(&self, mut state: EngineState) -> EngineState {
        let Some(staged) = state.staged.take() else {
            return state;
        };
        if staged.liquidation {
            return self.derive_liquidation(state);
        }
        let (buy_delay, sell_delay) = if staged.immediate {
            (0, 0)
        } else {
            self.config.delays_on(state.date)
        };

        let (sells, buys): (OrderSet, OrderSet) = state
            .ledger
            .amount_delta(&staged.target)
            .into_iter()
            .partition(|(_, delta)| delta.is_sell());
        let buys: OrderSet = buys.into_iter().filter(|(_, delta)| delta.is_buy()).collect();

        if !sells.is_empty() {
            let due = self.plan.settlement_date(state.day_index, sell_delay);
            state.reservations.reserve(due, sells);
        }
        if !buys.is_empty() {
            let due = self.plan.settlement_date(state.day_index, buy_delay);
            state.reservations.reserve(due, buys);
        }
        state
    }

    /// Every pending buy is dropped and every held or still-queued instrument
    /// is sold in full at today's settlement.
    fn derive_liquidation(&self, mut state: EngineState) -> EngineState {
        let date = state.date;
        let cancelled = state.reservations.cancel_buys();
        if cancelled > 0 {
            log::debug!("{date}: {cancelled} pending buys cancelled by liquidation");
        }

        let mut instruments: BTreeSet<String> = state.ledger.holdings().keys().cloned().collect();
        if let Some(due) = state.reservations.peek(date) {
            instruments.extend(due.keys().cloned());
        }
        if !instruments.is_empty() {
            state.reservations.reserve(
                date,
                instruments.into_iter().map(|i| (i, TradeDelta::LiquidateAll)),
            );
        }
        state
    }

    fn revalue(&self, mut state: EngineState, price_type: PriceType) -> EngineState {
        let gaps = state
            .ledger
            .update_holdings_value(state.date, self.market.returns(price_type));
        for instrument in &gaps {
            log::warn!(
                "{}: no {price_type} return for {instrument}, treated as 0%",
                state.date
            );
        }
        state.logs.data_gaps += gaps.len();
        state
    }

    fn settle_due(&self, mut state: EngineState) -> EngineState {
        let date = state.date;
        let Some(orders) = state.reservations.take_due(date) else {
            return state;
        };
        let report = settle(&mut state.ledger, orders);

        if report.downsize_ratio < 1.0 {
            log::debug!("{date}: buys downsized by {:.6}", report.downsize_ratio);
        }
        for instrument in &report.skipped {
            log::warn!("{date}: sell of {instrument} skipped, nothing held");
        }
        state.logs.skipped_orders += report.skipped.len();

        if !report.executed.is_empty() {
            let value = state.ledger.total_value();
            let weights = report
                .executed
                .iter()
                .map(|(instrument, amount)| {
                    let weight = if value != 0.0 { amount / value } else { 0.0 };
                    (instrument.clone(), weight)
                })
                .collect();
            state.logs.order_weights.push(WeightRow { date, weights });
        }
        state
    }

    fn end_of_day(&mut self, mut state: EngineState) -> Result<EngineState, SimulationError> {
        let date = state.date;
        let total_value = state.ledger.total_value();
        let cash = state.ledger.cash();
        log::debug!("{date}: value {total_value:.4}, cash {cash:.4}");

        state.logs.valuations.push(ValuationRow {
            date,
            total_value,
            cash,
            holdings: state.ledger.holdings().clone(),
        });
        state.logs.allocation_history.push(WeightRow {
            date,
            weights: state.ledger.allocations().weights().clone(),
        });

        let mut ctx = StrategyContext::new(self.market, &mut state);
        self.strategy.on_end_of_day(&mut ctx)?;
        Ok(state)
    }
}

/// Run a complete simulation.
pub fn run_simulation<S: Strategy + ?Sized>(
    config: &EngineConfig,
    market: &MarketData,
    strategy: &mut S,
) -> Result<RunResult, SimulationError> {
    Simulation::new(config, market, strategy)?.run()
}
