//! Price loading for the runner.
//!
//! Prices come as wide CSV files, one per price type:
//!
//! ```text
//! date,SPY,IEF
//! 2024-01-02,472.65,94.10
//! 2024-01-03,468.79,
//! ```
//!
//! The first column holds ISO dates, every other column one instrument. A
//! blank cell is a missing price (NaN). Rows may arrive in any order; they
//! are sorted by date before the table is built.

use chrono::NaiveDate;
use rebalab_core::market::{DataError, MarketData, PriceTable, PriceType};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("price file has no instrument columns")]
    NoInstruments,

    #[error("row {row}: invalid date '{value}'")]
    BadDate { row: usize, value: String },

    #[error("row {row}: invalid price '{value}' for {instrument}")]
    BadPrice {
        row: usize,
        instrument: String,
        value: String,
    },

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Market data plus the hash identifying it.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub market: MarketData,
    /// BLAKE3 hash of the dates and prices of both tables.
    pub dataset_hash: String,
}

impl LoadedData {
    pub fn new(market: MarketData) -> Self {
        let dataset_hash = dataset_hash(&market);
        Self {
            market,
            dataset_hash,
        }
    }
}

/// Parse a wide price CSV from any reader.
pub fn parse_price_csv<R: Read>(reader: R) -> Result<PriceTable, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let instruments: Vec<String> = rdr.headers()?.iter().skip(1).map(str::to_string).collect();
    if instruments.is_empty() {
        return Err(LoadError::NoInstruments);
    }

    let mut rows: Vec<(NaiveDate, Vec<f64>)> = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let raw_date = record.get(0).unwrap_or_default();
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|_| LoadError::BadDate {
            row,
            value: raw_date.to_string(),
        })?;

        let mut values = Vec::with_capacity(instruments.len());
        for (col, instrument) in instruments.iter().enumerate() {
            let cell = record.get(col + 1).unwrap_or_default();
            let value = if cell.is_empty() {
                f64::NAN
            } else {
                cell.parse::<f64>().map_err(|_| LoadError::BadPrice {
                    row,
                    instrument: instrument.clone(),
                    value: cell.to_string(),
                })?
            };
            values.push(value);
        }
        rows.push((date, values));
    }
    rows.sort_by_key(|(date, _)| *date);

    let dates: Vec<NaiveDate> = rows.iter().map(|(date, _)| *date).collect();
    let columns = instruments
        .iter()
        .enumerate()
        .map(|(col, instrument)| {
            let values = rows.iter().map(|(_, v)| v[col]).collect();
            (instrument.clone(), values)
        })
        .collect();
    Ok(PriceTable::new(dates, columns)?)
}

/// Load one price CSV from disk.
pub fn load_price_csv(path: &Path) -> Result<PriceTable, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table = parse_price_csv(file)?;
    log::debug!(
        "loaded {} rows x {} instruments from {}",
        table.len(),
        table.instruments().len(),
        path.display()
    );
    Ok(table)
}

/// Load open and close price files into market data.
pub fn load_market_data(open: &Path, close: &Path) -> Result<LoadedData, LoadError> {
    let market = MarketData::new(load_price_csv(open)?, load_price_csv(close)?)?;
    Ok(LoadedData::new(market))
}

/// Load a single close price file; opens are taken equal to closes.
pub fn load_close_only(close: &Path) -> Result<LoadedData, LoadError> {
    let market = MarketData::close_only(load_price_csv(close)?)?;
    Ok(LoadedData::new(market))
}

/// Compute a deterministic BLAKE3 hash over all price data.
///
/// Covers the date axis, then open and close values per instrument in sorted
/// instrument order. Missing prices hash as their NaN bit pattern.
pub fn dataset_hash(market: &MarketData) -> String {
    let mut hasher = blake3::Hasher::new();

    for date in market.dates() {
        hasher.update(date.to_string().as_bytes());
    }

    let mut instruments: Vec<&String> = market.instruments().iter().collect();
    instruments.sort();

    for instrument in instruments {
        hasher.update(instrument.as_bytes());
        for table in [market.prices(PriceType::Open), market.prices(PriceType::Close)] {
            if let Some(column) = table.column(instrument) {
                for value in column {
                    hasher.update(&value.to_bits().to_le_bytes());
                }
            }
        }
    }

    hasher.finalize().to_hex().to_string()
}
