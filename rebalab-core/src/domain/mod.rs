//! Domain types for rebalancing simulation.

pub mod allocation;
pub mod delta;
pub mod ledger;

pub use allocation::{AllocationError, AllocationTarget, CASH, WEIGHT_TOLERANCE};
pub use delta::TradeDelta;
pub use ledger::PortfolioLedger;
