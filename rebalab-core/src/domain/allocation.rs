//! Allocation targets: instrument → weight maps that sum to one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Reserved key for the cash weight.
pub const CASH: &str = "cash";

/// Tolerance for the sum-to-one check.
pub const WEIGHT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AllocationError {
    #[error("weight for '{instrument}' is {weight}, must be finite and within [-1, 1]")]
    WeightOutOfRange { instrument: String, weight: f64 },

    #[error("allocation weights sum to {0}, expected 1")]
    DoesNotSumToOne(f64),
}

/// A validated allocation target. Always contains a `"cash"` entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AllocationTarget {
    weights: BTreeMap<String, f64>,
}

impl AllocationTarget {
    /// Validate raw weights.
    ///
    /// When `"cash"` is absent it absorbs the unassigned weight
    /// (`1 - sum`). When present, the full sum must already be 1.
    pub fn from_weights<I, S>(weights: I) -> Result<Self, AllocationError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut map: BTreeMap<String, f64> = BTreeMap::new();
        for (instrument, weight) in weights {
            *map.entry(instrument.into()).or_insert(0.0) += weight;
        }
        if !map.contains_key(CASH) {
            let assigned: f64 = map.values().sum();
            map.insert(CASH.to_string(), 1.0 - assigned);
        }
        for (instrument, &weight) in &map {
            if !weight.is_finite() || !(-1.0..=1.0).contains(&weight) {
                return Err(AllocationError::WeightOutOfRange {
                    instrument: instrument.clone(),
                    weight,
                });
            }
        }
        let total: f64 = map.values().sum();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(AllocationError::DoesNotSumToOne(total));
        }
        Ok(Self { weights: map })
    }

    /// 100% cash.
    pub fn all_cash() -> Self {
        let mut weights = BTreeMap::new();
        weights.insert(CASH.to_string(), 1.0);
        Self { weights }
    }

    /// Wrap weights that are already known to be consistent (ledger-derived).
    pub(crate) fn from_ledger(weights: BTreeMap<String, f64>) -> Self {
        Self { weights }
    }

    pub fn weight(&self, instrument: &str) -> f64 {
        self.weights.get(instrument).copied().unwrap_or(0.0)
    }

    pub fn cash_weight(&self) -> f64 {
        self.weight(CASH)
    }

    pub fn weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    /// Non-cash entries.
    pub fn instruments(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights
            .iter()
            .filter(|(k, _)| k.as_str() != CASH)
            .map(|(k, v)| (k.as_str(), *v))
    }

    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }
}
