//! Date-indexed, instrument-keyed numeric tables.
//!
//! Every column has the same length as the date axis. Missing values are
//! stored as NaN, never forward-filled.

use chrono::NaiveDate;
use std::collections::HashMap;
use thiserror::Error;

/// Errors from building or combining market data tables.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("date axis is not strictly increasing at row {0}")]
    UnsortedDates(usize),

    #[error("column '{instrument}' has {got} rows, expected {expected}")]
    ColumnLength {
        instrument: String,
        expected: usize,
        got: usize,
    },

    #[error("open and close tables have different date axes")]
    AxisMismatch,

    #[error("invalid price type: '{0}' (expected 'open' or 'close')")]
    UnknownPriceType(String),

    #[error("price table has no rows")]
    Empty,
}

/// A wide table of values: one row per date, one column per instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    instruments: Vec<String>,
    columns: HashMap<String, Vec<f64>>,
    rows: HashMap<NaiveDate, usize>,
}

impl PriceTable {
    /// Build a table from a sorted date axis and per-instrument columns.
    ///
    /// Instruments are kept in the order given.
    pub fn new(
        dates: Vec<NaiveDate>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, DataError> {
        if let Some(i) = dates.windows(2).position(|w| w[0] >= w[1]) {
            return Err(DataError::UnsortedDates(i + 1));
        }
        let mut instruments = Vec::with_capacity(columns.len());
        let mut map = HashMap::with_capacity(columns.len());
        for (instrument, values) in columns {
            if values.len() != dates.len() {
                return Err(DataError::ColumnLength {
                    instrument,
                    expected: dates.len(),
                    got: values.len(),
                });
            }
            if !map.contains_key(&instrument) {
                instruments.push(instrument.clone());
            }
            map.insert(instrument, values);
        }
        let rows = dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();
        Ok(Self {
            dates,
            instruments,
            columns: map,
            rows,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn row_of(&self, date: NaiveDate) -> Option<usize> {
        self.rows.get(&date).copied()
    }

    pub fn column(&self, instrument: &str) -> Option<&[f64]> {
        self.columns.get(instrument).map(|c| c.as_slice())
    }

    /// Value for `instrument` on `date`. `None` when the date or instrument
    /// is unknown or the cell is NaN.
    pub fn get(&self, date: NaiveDate, instrument: &str) -> Option<f64> {
        let row = self.row_of(date)?;
        self.get_at(row, instrument)
    }

    pub fn get_at(&self, row: usize, instrument: &str) -> Option<f64> {
        self.columns
            .get(instrument)
            .and_then(|c| c.get(row))
            .copied()
            .filter(|v| v.is_finite())
    }

    /// A read-only view of rows `[0, end_row)`.
    pub fn view_until(&self, end_row: usize) -> PriceView<'_> {
        PriceView {
            table: self,
            end: end_row.min(self.len()),
        }
    }

    /// Same axis and instruments, values produced by `f(row, instrument)`.
    pub(crate) fn derive<F>(&self, mut f: F) -> PriceTable
    where
        F: FnMut(usize, &str) -> f64,
    {
        let columns = self
            .instruments
            .iter()
            .map(|instrument| {
                let values = (0..self.len()).map(|row| f(row, instrument)).collect();
                (instrument.clone(), values)
            })
            .collect::<HashMap<_, _>>();
        PriceTable {
            dates: self.dates.clone(),
            instruments: self.instruments.clone(),
            columns,
            rows: self.rows.clone(),
        }
    }
}

/// A truncated, zero-copy window over a `PriceTable`.
///
/// Handed to strategies so they can only see history up to the cutoff.
#[derive(Debug, Clone, Copy)]
pub struct PriceView<'a> {
    table: &'a PriceTable,
    end: usize,
}

impl<'a> PriceView<'a> {
    pub fn dates(&self) -> &'a [NaiveDate] {
        &self.table.dates[..self.end]
    }

    pub fn instruments(&self) -> &'a [String] {
        self.table.instruments()
    }

    pub fn len(&self) -> usize {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end == 0
    }

    /// The visible part of one instrument's column.
    pub fn series(&self, instrument: &str) -> Option<&'a [f64]> {
        self.table.column(instrument).map(|c| &c[..self.end])
    }

    /// Most recent finite value for `instrument` inside the window.
    pub fn last(&self, instrument: &str) -> Option<f64> {
        self.series(instrument)?
            .iter()
            .rev()
            .copied()
            .find(|v| v.is_finite())
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates().last().copied()
    }
}
