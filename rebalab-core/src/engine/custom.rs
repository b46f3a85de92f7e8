//! Custom (override) rebalancing schedule.

use crate::calendar::RebalanceRule;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A schedule that takes over from `start_date` onward.
///
/// On its own rebalancing days it preempts the periodic and irregular
/// decision paths. While active its delay pair replaces the engine's. On
/// `liquidation_date` the portfolio is moved to 100% cash with zero delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomSchedule {
    pub start_date: NaiveDate,
    pub rule: RebalanceRule,
    pub buy_delay: usize,
    pub sell_delay: usize,
    pub liquidation_date: Option<NaiveDate>,
}

impl CustomSchedule {
    pub fn new(start_date: NaiveDate, rule: RebalanceRule) -> Self {
        Self {
            start_date,
            rule,
            buy_delay: 0,
            sell_delay: 0,
            liquidation_date: None,
        }
    }

    pub fn with_delays(mut self, buy_delay: usize, sell_delay: usize) -> Self {
        self.buy_delay = buy_delay;
        self.sell_delay = sell_delay;
        self
    }

    pub fn with_liquidation_date(mut self, date: NaiveDate) -> Self {
        self.liquidation_date = Some(date);
        self
    }

    pub fn is_active(&self, date: NaiveDate) -> bool {
        date >= self.start_date
    }

    pub fn is_liquidation_day(&self, date: NaiveDate) -> bool {
        self.liquidation_date == Some(date)
    }
}
