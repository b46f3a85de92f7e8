//! Rebalab Runner: run files, price loading, result hand-off, batch runs.
//!
//! This crate builds on `rebalab-core` to provide:
//! - TOML run configuration with content-addressed run ids
//! - Wide CSV price loading with dataset hashing
//! - Single-run orchestration producing a schema-versioned result
//! - JSON export/import of results for external reporting
//! - Parallel batch runs over rule and delay grids

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;
pub mod sweep;

pub use config::{ConfigError, CustomScheduleConfig, MomentSpec, RunConfig, RunId, ScheduleSpec};
pub use data_loader::{
    dataset_hash, load_close_only, load_market_data, load_price_csv, parse_price_csv, LoadError, LoadedData,
};
pub use export::{export_json, import_json, load_result, save_result};
pub use runner::{run_from_config, run_from_files, BacktestResult, RunError, SCHEMA_VERSION};
pub use sweep::{run_batch, BatchResults, RunGrid};
