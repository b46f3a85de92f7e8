//! Reservation book — delayed orders keyed by settlement date.

use crate::domain::TradeDelta;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Signed currency deltas per instrument for one settlement date.
pub type OrderSet = BTreeMap<String, TradeDelta>;

/// Orders waiting for their settlement date.
///
/// Orders for the same date and instrument accumulate with
/// [`TradeDelta::combine`]. A date's entry is removed once it is taken for
/// settlement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReservationBook {
    orders: BTreeMap<NaiveDate, OrderSet>,
}

impl ReservationBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `orders` for settlement on `date`.
    pub fn reserve<I>(&mut self, date: NaiveDate, orders: I)
    where
        I: IntoIterator<Item = (String, TradeDelta)>,
    {
        let slot = self.orders.entry(date).or_default();
        for (instrument, delta) in orders {
            slot.entry(instrument)
                .and_modify(|existing| *existing = existing.combine(delta))
                .or_insert(delta);
        }
    }

    pub fn has_due(&self, date: NaiveDate) -> bool {
        self.orders.contains_key(&date)
    }

    /// Remove and return the orders due on `date`.
    pub fn take_due(&mut self, date: NaiveDate) -> Option<OrderSet> {
        self.orders.remove(&date)
    }

    /// Drop every pending buy. Dates left without orders are removed.
    ///
    /// Returns the number of orders dropped.
    pub fn cancel_buys(&mut self) -> usize {
        let mut dropped = 0;
        for slot in self.orders.values_mut() {
            let before = slot.len();
            slot.retain(|_, delta| !delta.is_buy());
            dropped += before - slot.len();
        }
        self.orders.retain(|_, slot| !slot.is_empty());
        dropped
    }

    pub fn peek(&self, date: NaiveDate) -> Option<&OrderSet> {
        self.orders.get(&date)
    }

    pub fn pending_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.orders.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
