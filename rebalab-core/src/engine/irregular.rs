//! Irregular (event-driven) rebalancing trigger with cooldown.

use serde::{Deserialize, Serialize};

/// Default number of trading days between irregular rebalances.
pub const DEFAULT_IRREGULAR_COOLDOWN: u32 = 7;

/// Pending flag plus cooldown counter.
///
/// The counter starts at zero, so the first trigger fires on the next
/// decision phase. After each fire it resets to the configured default.
/// While a trigger is pending the periodic schedule is suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrregularTrigger {
    pending: bool,
    remaining: u32,
    default_cooldown: u32,
}

impl IrregularTrigger {
    pub fn new(default_cooldown: u32) -> Self {
        Self {
            pending: false,
            remaining: 0,
            default_cooldown,
        }
    }

    pub fn trigger(&mut self) {
        self.pending = true;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Count down one trading day. Returns true when the rebalance fires.
    pub fn tick(&mut self) -> bool {
        if !self.pending {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.remaining = self.default_cooldown;
            self.pending = false;
            true
        } else {
            false
        }
    }
}

impl Default for IrregularTrigger {
    fn default() -> Self {
        Self::new(DEFAULT_IRREGULAR_COOLDOWN)
    }
}
