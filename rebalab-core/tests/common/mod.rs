//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use rebalab_core::engine::SimulationError;
use rebalab_core::market::{MarketData, PriceTable};
use rebalab_core::strategy::{Strategy, StrategyContext};
use std::collections::HashMap;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn d(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

/// Weekdays Jan 2..=12 2024 (nine trading days).
pub fn january_days() -> Vec<NaiveDate> {
    [2, 3, 4, 5, 8, 9, 10, 11, 12].iter().map(|&x| d(1, x)).collect()
}

/// Close-only market with constant prices for every instrument.
pub fn flat_market(instruments: &[&str]) -> MarketData {
    let dates = january_days();
    let n = dates.len();
    let columns = instruments.iter().map(|s| (s.to_string(), vec![100.0; n])).collect();
    MarketData::close_only(PriceTable::new(dates, columns).unwrap()).unwrap()
}

/// Sets the scripted weights on the dates listed, nothing otherwise.
#[derive(Default)]
pub struct ScriptedStrategy {
    pub script: HashMap<NaiveDate, Vec<(String, f64)>>,
    pub decisions: Vec<NaiveDate>,
}

impl ScriptedStrategy {
    pub fn on(mut self, date: NaiveDate, weights: &[(&str, f64)]) -> Self {
        let weights = weights.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        self.script.insert(date, weights);
        self
    }
}

impl Strategy for ScriptedStrategy {
    fn name(&self) -> &str {
        "scripted"
    }

    fn on_data(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), SimulationError> {
        self.decisions.push(ctx.date());
        if let Some(weights) = self.script.get(&ctx.date()) {
            ctx.set_allocation(weights.clone())?;
        }
        Ok(())
    }
}
