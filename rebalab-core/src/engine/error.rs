//! Engine error type.

use crate::calendar::CalendarError;
use crate::domain::AllocationError;
use crate::market::DataError;
use chrono::NaiveDate;
use thiserror::Error;

/// Errors that abort a simulation run.
///
/// All of these are configuration or usage errors raised synchronously at
/// the point of misuse. Data gaps and unfillable orders never surface here.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("calendar error: {0}")]
    Calendar(#[from] CalendarError),

    #[error("market data error: {0}")]
    Data(#[from] DataError),

    #[error("invalid allocation on {date}: {source}")]
    Allocation {
        date: NaiveDate,
        #[source]
        source: AllocationError,
    },

    #[error("invalid engine config: {0}")]
    InvalidConfig(String),

    #[error("no trading days between {start} and {end}")]
    NoTradingDays { start: NaiveDate, end: NaiveDate },

    #[error("strategy error: {0}")]
    Strategy(String),
}
