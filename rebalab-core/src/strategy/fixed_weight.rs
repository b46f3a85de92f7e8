//! Static-allocation strategy (e.g. 80/20 stock/bond).

use super::{Strategy, StrategyContext};
use crate::domain::{AllocationError, AllocationTarget};
use crate::engine::SimulationError;

/// Re-targets the same weights on every decision day.
///
/// With a drift threshold set, the strategy also requests an irregular
/// rebalance at end of day once any weight strays further than the
/// threshold from its target.
#[derive(Debug, Clone)]
pub struct FixedWeightStrategy {
    target: AllocationTarget,
    drift_threshold: Option<f64>,
}

impl FixedWeightStrategy {
    pub fn new<I, S>(weights: I) -> Result<Self, AllocationError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Ok(Self {
            target: AllocationTarget::from_weights(weights)?,
            drift_threshold: None,
        })
    }

    pub fn with_drift_trigger(mut self, threshold: f64) -> Self {
        self.drift_threshold = Some(threshold);
        self
    }

    pub fn target(&self) -> &AllocationTarget {
        &self.target
    }

    /// Largest absolute gap between current and target weights.
    fn drift(&self, ctx: &StrategyContext<'_>) -> f64 {
        let current = ctx.ledger().allocations();
        self.target
            .weights()
            .keys()
            .chain(current.weights().keys())
            .map(|k| (self.target.weight(k) - current.weight(k)).abs())
            .fold(0.0, f64::max)
    }
}

impl Strategy for FixedWeightStrategy {
    fn name(&self) -> &str {
        "fixed_weight"
    }

    fn on_data(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), SimulationError> {
        ctx.set_allocation_target(self.target.clone());
        Ok(())
    }

    fn on_end_of_day(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), SimulationError> {
        let Some(threshold) = self.drift_threshold else {
            return Ok(());
        };
        if ctx.ledger().total_value() <= 0.0 || ctx.irregular_pending() {
            return Ok(());
        }
        let drift = self.drift(ctx);
        if drift > threshold {
            ctx.log_event(format!("weight drift {drift:.4} above {threshold:.4}"));
            ctx.trigger_irregular_rebalancing();
        }
        Ok(())
    }
}
