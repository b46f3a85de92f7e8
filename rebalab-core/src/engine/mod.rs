//! Simulation engine: the day-stepping state machine and its supporting parts.
//!
//! Each trading day runs the seven [`DayPhase`]s in order:
//!
//! 1. Start of day: strategy hook
//! 2. Decision: liquidation, custom schedule, irregular trigger, or periodic schedule
//! 3. Order derivation: staged allocation → delayed sell and buy reservations
//! 4. Open valuation: open-vs-prior-close return
//! 5. Settlement: due sells, then uniformly downsized buys
//! 6. Close valuation: close-vs-open return
//! 7. End of day: logs, strategy hook

pub mod custom;
pub mod error;
pub mod irregular;
pub mod loop_runner;
pub mod phase;
pub mod reservation;
pub mod settlement;
pub mod state;

pub use custom::CustomSchedule;
pub use error::SimulationError;
pub use irregular::{IrregularTrigger, DEFAULT_IRREGULAR_COOLDOWN};
pub use loop_runner::{run_simulation, RunPlan, Simulation};
pub use phase::DayPhase;
pub use reservation::{OrderSet, ReservationBook};
pub use settlement::{downsize_ratio, settle, SettlementReport};
pub use state::{
    EngineConfig, EngineState, EventRow, RunLogs, RunResult, StagedAllocation, ValuationRow, WeightRow,
};
