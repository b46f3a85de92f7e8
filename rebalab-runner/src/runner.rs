//! Run orchestration: config + loaded data + strategy → schema-versioned result.
//!
//! Two entry points:
//! - `run_from_config()`: pre-loaded data, no I/O. Used by batch runs.
//! - `run_from_files()`: reads the config and price files first.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use rebalab_core::engine::{run_simulation, RunResult, SimulationError};
use rebalab_core::strategy::Strategy;

use crate::config::{ConfigError, RunConfig};
use crate::data_loader::{load_market_data, LoadError, LoadedData};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single run, handed to external reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub name: String,
    pub strategy: String,
    pub dataset_hash: String,
    pub config: RunConfig,
    pub result: RunResult,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn final_value(&self) -> f64 {
        self.result.final_value
    }

    /// Final value over initial cash, minus one.
    pub fn total_return(&self) -> f64 {
        if self.config.initial_cash == 0.0 {
            return 0.0;
        }
        self.result.final_value / self.config.initial_cash - 1.0
    }
}

/// Run one configuration against pre-loaded data.
pub fn run_from_config<S: Strategy + ?Sized>(
    config: &RunConfig,
    data: &LoadedData,
    strategy: &mut S,
) -> Result<BacktestResult, RunError> {
    let engine_config = config.engine_config()?;
    let run_id = config.run_id()?;
    log::info!("run {} ({})", config.name, &run_id[..12]);

    let result = run_simulation(&engine_config, &data.market, strategy)?;
    if result.data_gaps > 0 {
        log::warn!(
            "run {}: {} missing returns treated as 0%",
            config.name,
            result.data_gaps
        );
    }

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        name: config.name.clone(),
        strategy: strategy.name().to_string(),
        dataset_hash: data.dataset_hash.clone(),
        config: config.clone(),
        result,
    })
}

/// Read a TOML run file and open/close price CSVs, then run.
pub fn run_from_files<S: Strategy + ?Sized>(
    config_path: &Path,
    open_prices: &Path,
    close_prices: &Path,
    strategy: &mut S,
) -> Result<BacktestResult, RunError> {
    let config = RunConfig::load(config_path)?;
    let data = load_market_data(open_prices, close_prices)?;
    run_from_config(&config, &data, strategy)
}
