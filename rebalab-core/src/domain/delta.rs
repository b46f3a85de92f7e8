//! Signed trade deltas with an explicit full-liquidation variant.

use serde::{Deserialize, Serialize};

/// A signed change to a position, in weight or currency units.
///
/// `LiquidateAll` means "sell down to zero" and is resolved against the
/// actual holding at settlement time, since the holding's value can move
/// between the decision day and the settlement day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TradeDelta {
    Fixed(f64),
    LiquidateAll,
}

impl TradeDelta {
    /// Accumulate two deltas queued for the same instrument.
    ///
    /// Fixed amounts add. A full liquidation absorbs anything it meets.
    pub fn combine(self, other: TradeDelta) -> TradeDelta {
        match (self, other) {
            (TradeDelta::Fixed(a), TradeDelta::Fixed(b)) => TradeDelta::Fixed(a + b),
            _ => TradeDelta::LiquidateAll,
        }
    }

    /// Multiply a fixed delta. Liquidations pass through unchanged.
    pub fn scale(self, factor: f64) -> TradeDelta {
        match self {
            TradeDelta::Fixed(v) => TradeDelta::Fixed(v * factor),
            TradeDelta::LiquidateAll => TradeDelta::LiquidateAll,
        }
    }

    /// Concrete amount, resolving a liquidation against the current holding.
    pub fn resolve(self, current_holding: f64) -> f64 {
        match self {
            TradeDelta::Fixed(v) => v,
            TradeDelta::LiquidateAll => -current_holding,
        }
    }

    pub fn is_sell(&self) -> bool {
        match self {
            TradeDelta::Fixed(v) => *v < 0.0,
            TradeDelta::LiquidateAll => true,
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self, TradeDelta::Fixed(v) if *v > 0.0)
    }

    pub fn fixed(&self) -> Option<f64> {
        match self {
            TradeDelta::Fixed(v) => Some(*v),
            TradeDelta::LiquidateAll => None,
        }
    }
}
