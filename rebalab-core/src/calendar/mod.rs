//! Trading and rebalancing calendars.
//!
//! A `TradingCalendar` is built once per run from the price table's date
//! axis. Rebalancing days are derived from a `RebalanceRule` through the
//! schedule dispatch table in [`schedule`].

pub mod rule;
pub mod schedule;
pub mod trading_calendar;

pub use rule::{CalendarError, Magnet, Moment, Periodicity, RebalanceRule};
pub use schedule::{schedule_fn, ScheduleFn, ScheduleWindow};
pub use trading_calendar::TradingCalendar;
