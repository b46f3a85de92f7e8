//! Rebalab Core: trading calendar, portfolio ledger, and the rebalancing simulation engine.
//!
//! This crate contains the heart of the backtester:
//! - Trading and rebalancing calendars (periodicity × moment schedules with snapping)
//! - Market data tables and the open/intraday return tables derived from them
//! - Portfolio ledger with weight ↔ amount conversion and full-liquidation deltas
//! - Day-phase state machine with delayed, cash-constrained settlement
//! - Strategy callback interface

pub mod calendar;
pub mod domain;
pub mod engine;
pub mod market;
pub mod strategy;
