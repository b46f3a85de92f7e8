//! Intra-day phase sequence.
//!
//! Every trading day walks the same seven phases in a fixed order. Phases
//! are never skipped, reordered, or interleaved across days.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayPhase {
    /// Strategy `on_start_of_day` hook.
    StartOfDay,
    /// Periodic, irregular, or custom rebalancing decision.
    Decision,
    /// Staged allocation → delayed buy/sell reservations.
    OrderDerivation,
    /// Revalue holdings with the open-vs-prior-close return.
    OpenValuation,
    /// Settle reservations due today: sells, then downsized buys.
    Settlement,
    /// Revalue holdings with the close-vs-open return.
    CloseValuation,
    /// Record logs, strategy `on_end_of_day` hook.
    EndOfDay,
}

impl DayPhase {
    pub const SEQUENCE: [DayPhase; 7] = [
        DayPhase::StartOfDay,
        DayPhase::Decision,
        DayPhase::OrderDerivation,
        DayPhase::OpenValuation,
        DayPhase::Settlement,
        DayPhase::CloseValuation,
        DayPhase::EndOfDay,
    ];

    /// The phase after this one, or `None` at end of day.
    pub fn next(self) -> Option<DayPhase> {
        let i = Self::SEQUENCE.iter().position(|p| *p == self)?;
        Self::SEQUENCE.get(i + 1).copied()
    }
}

impl fmt::Display for DayPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
