//! Market data: open/close price tables and the return tables derived from them.
//!
//! Trading happens at the open, valuation at the close. Holdings are
//! revalued twice per day: once with the open-vs-prior-close return, once
//! with the close-vs-open return.

pub mod price_table;

pub use price_table::{DataError, PriceTable, PriceView};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which price series a strategy or revaluation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceType {
    Open,
    Close,
}

impl FromStr for PriceType {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(PriceType::Open),
            "close" => Ok(PriceType::Close),
            other => Err(DataError::UnknownPriceType(other.to_string())),
        }
    }
}

impl std::fmt::Display for PriceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceType::Open => write!(f, "open"),
            PriceType::Close => write!(f, "close"),
        }
    }
}

/// Open and close prices on a shared date axis, plus derived returns.
#[derive(Debug, Clone)]
pub struct MarketData {
    open: PriceTable,
    close: PriceTable,
    open_returns: PriceTable,
    intraday_returns: PriceTable,
}

impl MarketData {
    /// Pair open and close tables. Both must share the same date axis.
    ///
    /// Returns are computed once here:
    /// - open return: `open[t] / close[t-1] - 1` (NaN on the first row)
    /// - intraday return: `close[t] / open[t] - 1`
    pub fn new(open: PriceTable, close: PriceTable) -> Result<Self, DataError> {
        if open.is_empty() || close.is_empty() {
            return Err(DataError::Empty);
        }
        if open.dates() != close.dates() {
            return Err(DataError::AxisMismatch);
        }

        let open_returns = close.derive(|row, instrument| {
            if row == 0 {
                return f64::NAN;
            }
            match (open.get_at(row, instrument), close.get_at(row - 1, instrument)) {
                (Some(o), Some(prev_close)) if prev_close != 0.0 => o / prev_close - 1.0,
                _ => f64::NAN,
            }
        });
        let intraday_returns = close.derive(|row, instrument| {
            match (close.get_at(row, instrument), open.get_at(row, instrument)) {
                (Some(c), Some(o)) if o != 0.0 => c / o - 1.0,
                _ => f64::NAN,
            }
        });

        Ok(Self {
            open,
            close,
            open_returns,
            intraday_returns,
        })
    }

    /// Use the same table for open and close (close-to-close simulation).
    pub fn close_only(close: PriceTable) -> Result<Self, DataError> {
        Self::new(close.clone(), close)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        self.close.dates()
    }

    pub fn instruments(&self) -> &[String] {
        self.close.instruments()
    }

    pub fn prices(&self, price_type: PriceType) -> &PriceTable {
        match price_type {
            PriceType::Open => &self.open,
            PriceType::Close => &self.close,
        }
    }

    /// Return table used for the revaluation of the given price point.
    pub fn returns(&self, price_type: PriceType) -> &PriceTable {
        match price_type {
            PriceType::Open => &self.open_returns,
            PriceType::Close => &self.intraday_returns,
        }
    }

    /// Price history up to `date`, excluding or including that date's row.
    pub fn available(&self, price_type: PriceType, date: NaiveDate, include_today: bool) -> PriceView<'_> {
        let table = self.prices(price_type);
        let cutoff = match table.row_of(date) {
            Some(row) if include_today => row + 1,
            Some(row) => row,
            None => table.dates().partition_point(|d| *d < date),
        };
        table.view_until(cutoff)
    }
}
