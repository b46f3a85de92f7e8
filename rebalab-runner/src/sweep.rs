//! Batch runs: many independent configurations over the same data.
//!
//! Runs share nothing mutable. Each one builds its own strategy and ledger
//! and stays single-threaded; only the batch fans out across the pool.

use rayon::prelude::*;
use std::collections::HashMap;

use rebalab_core::strategy::Strategy;

use crate::config::{MomentSpec, RunConfig};
use crate::data_loader::LoadedData;
use crate::runner::{run_from_config, BacktestResult, RunError};

/// Grid of rebalancing rules and delays to cross with a base config.
#[derive(Debug, Clone)]
pub struct RunGrid {
    pub periodicities: Vec<String>,
    pub moments: Vec<MomentSpec>,
    pub buy_delays: Vec<usize>,
    pub sell_delays: Vec<usize>,
}

impl RunGrid {
    /// Monthly/quarterly × first/last with zero delays.
    pub fn schedule_default() -> Self {
        Self {
            periodicities: vec!["monthly".into(), "quarterly".into()],
            moments: vec![MomentSpec::Name("first".into()), MomentSpec::Name("last".into())],
            buy_delays: vec![0],
            sell_delays: vec![0],
        }
    }

    pub fn size(&self) -> usize {
        self.periodicities.len() * self.moments.len() * self.buy_delays.len() * self.sell_delays.len()
    }

    /// Every combination applied to `base`, named `{base}/{periodicity}-{moment}-b{buy}-s{sell}`.
    pub fn generate_configs(&self, base: &RunConfig) -> Vec<RunConfig> {
        let mut configs = Vec::with_capacity(self.size());
        for periodicity in &self.periodicities {
            for moment in &self.moments {
                for &buy_delay in &self.buy_delays {
                    for &sell_delay in &self.sell_delays {
                        let mut config = base.clone();
                        config.schedule.periodicity = periodicity.clone();
                        config.schedule.moment = moment.clone();
                        config.buy_delay = buy_delay;
                        config.sell_delay = sell_delay;
                        config.name = format!("{}/{periodicity}-{moment}-b{buy_delay}-s{sell_delay}", base.name);
                        configs.push(config);
                    }
                }
            }
        }
        configs
    }
}

/// Run every config against `data`, in parallel.
///
/// `make_strategy` builds a fresh strategy per run. Results come back in
/// input order; a failing run does not stop the others.
pub fn run_batch<F>(configs: &[RunConfig], data: &LoadedData, make_strategy: F) -> Vec<Result<BacktestResult, RunError>>
where
    F: Fn(&RunConfig) -> Box<dyn Strategy> + Send + Sync,
{
    log::info!("batch of {} runs", configs.len());
    configs
        .par_iter()
        .map(|config| {
            let mut strategy = make_strategy(config);
            run_from_config(config, data, &mut strategy)
        })
        .collect()
}

/// Successful results of a batch, indexed by run id.
#[derive(Debug)]
pub struct BatchResults {
    results: Vec<BacktestResult>,
    by_run_id: HashMap<String, usize>,
    failures: Vec<(String, RunError)>,
}

impl BatchResults {
    pub fn collect(configs: &[RunConfig], outcomes: Vec<Result<BacktestResult, RunError>>) -> Self {
        let mut results = Vec::new();
        let mut failures = Vec::new();
        for (config, outcome) in configs.iter().zip(outcomes) {
            match outcome {
                Ok(result) => results.push(result),
                Err(e) => {
                    log::warn!("run {} failed: {e}", config.name);
                    failures.push((config.name.clone(), e));
                }
            }
        }
        let by_run_id = results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.run_id.clone(), i))
            .collect();
        Self {
            results,
            by_run_id,
            failures,
        }
    }

    pub fn all(&self) -> &[BacktestResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, run_id: &str) -> Option<&BacktestResult> {
        self.by_run_id.get(run_id).map(|&i| &self.results[i])
    }

    /// Runs that failed, by config name.
    pub fn failures(&self) -> &[(String, RunError)] {
        &self.failures
    }

    /// Results sorted by final value, best first.
    pub fn sorted_by_final_value(&self) -> Vec<&BacktestResult> {
        let mut sorted: Vec<&BacktestResult> = self.results.iter().collect();
        sorted.sort_by(|a, b| b.final_value().total_cmp(&a.final_value()));
        sorted
    }
}
