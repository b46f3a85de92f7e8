//! Portfolio ledger — cash plus per-instrument holdings in currency amounts.

use super::allocation::{AllocationTarget, CASH};
use super::delta::TradeDelta;
use crate::market::PriceTable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Cash and holdings of a simulated portfolio.
///
/// Holdings are amounts of currency, not share counts; price moves are
/// applied as returns. The accounting identity
/// `total_value == cash + sum(holdings)` holds by construction because the
/// total is always derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioLedger {
    cash: f64,
    holdings: BTreeMap<String, f64>,
    transaction_fee: f64,
}

impl PortfolioLedger {
    pub fn new(initial_cash: f64, transaction_fee: f64) -> Self {
        Self {
            cash: initial_cash,
            holdings: BTreeMap::new(),
            transaction_fee,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn transaction_fee(&self) -> f64 {
        self.transaction_fee
    }

    pub fn holdings(&self) -> &BTreeMap<String, f64> {
        &self.holdings
    }

    /// Amount held in `instrument` (0 when not held).
    pub fn holding(&self, instrument: &str) -> f64 {
        self.holdings.get(instrument).copied().unwrap_or(0.0)
    }

    pub fn holdings_value(&self) -> f64 {
        self.holdings.values().sum()
    }

    pub fn total_value(&self) -> f64 {
        self.cash + self.holdings_value()
    }

    /// Spend `amount` of cash; the holding grows by `amount * (1 - fee)`.
    ///
    /// No cash check: settlement downsizes buys before calling this.
    pub fn buy(&mut self, instrument: &str, amount: f64) {
        let after_fee = amount * (1.0 - self.transaction_fee);
        *self.holdings.entry(instrument.to_string()).or_insert(0.0) += after_fee;
        self.cash -= amount;
    }

    /// Reduce the holding by `amount`; cash grows by `amount * (1 - fee)`.
    ///
    /// A holding that lands on exactly zero is removed.
    pub fn sell(&mut self, instrument: &str, amount: f64) {
        let remaining = self.holding(instrument) - amount;
        if remaining == 0.0 {
            self.holdings.remove(instrument);
        } else {
            self.holdings.insert(instrument.to_string(), remaining);
        }
        self.cash += amount * (1.0 - self.transaction_fee);
    }

    /// Weight of `instrument` in the total portfolio value.
    pub fn weight(&self, instrument: &str) -> f64 {
        let total = self.total_value();
        if total == 0.0 {
            return 0.0;
        }
        let amount = if instrument == CASH {
            self.cash
        } else {
            self.holding(instrument)
        };
        amount / total
    }

    /// Current weights of every holding plus `"cash"`. Sums to one.
    ///
    /// An empty portfolio (total value of zero) reports 100% cash.
    pub fn allocations(&self) -> AllocationTarget {
        let total = self.total_value();
        if total == 0.0 {
            return AllocationTarget::all_cash();
        }
        let mut weights: BTreeMap<String, f64> = self
            .holdings
            .iter()
            .map(|(k, v)| (k.clone(), v / total))
            .collect();
        weights.insert(CASH.to_string(), self.cash / total);
        AllocationTarget::from_ledger(weights)
    }

    /// Weight change needed to reach `target`, per instrument and cash.
    ///
    /// Instruments missing on either side count as zero. When the delta
    /// exactly cancels a non-zero current weight, the entry becomes
    /// `LiquidateAll` so the sell size is decided at settlement.
    pub fn allocations_delta(&self, target: &AllocationTarget) -> BTreeMap<String, TradeDelta> {
        let current = self.allocations();
        let keys: BTreeSet<&String> = current
            .weights()
            .keys()
            .chain(target.weights().keys())
            .collect();

        keys.into_iter()
            .map(|key| {
                let now = current.weight(key);
                let delta = target.weight(key) - now;
                let entry = if key != CASH && now != 0.0 && delta == -now {
                    TradeDelta::LiquidateAll
                } else {
                    TradeDelta::Fixed(delta)
                };
                (key.clone(), entry)
            })
            .collect()
    }

    /// Currency change needed to reach `target`, excluding cash.
    pub fn amount_delta(&self, target: &AllocationTarget) -> BTreeMap<String, TradeDelta> {
        let total = self.total_value();
        self.allocations_delta(target)
            .into_iter()
            .filter(|(k, _)| k != CASH)
            .map(|(k, delta)| (k, delta.scale(total)))
            .collect()
    }

    /// Trade immediately so `instrument` ends up near `weight`.
    pub fn set_weight(&mut self, instrument: &str, weight: f64) {
        let weight_delta = weight - self.weight(instrument);
        let total = self.total_value();
        if weight_delta > 0.0 {
            self.buy(instrument, total * weight_delta);
        } else if weight_delta < 0.0 {
            self.sell(instrument, total * -weight_delta);
        }
    }

    /// Move straight to `target` without settlement delay, sells first.
    pub fn rebalance_now(&mut self, target: &AllocationTarget) {
        let mut order: Vec<(String, f64)> = self
            .allocations_delta(target)
            .into_iter()
            .filter(|(k, _)| k != CASH)
            .map(|(k, d)| (k, d.fixed().unwrap_or(f64::NEG_INFINITY)))
            .collect();
        order.sort_by(|a, b| a.1.total_cmp(&b.1));
        for (instrument, _) in order {
            self.set_weight(&instrument, target.weight(&instrument));
        }
    }

    /// Apply one day's returns to every holding.
    ///
    /// A missing return is treated as 0% (position unchanged). The affected
    /// instruments are returned so the caller can report the gap.
    pub fn update_holdings_value(&mut self, date: NaiveDate, returns: &PriceTable) -> Vec<String> {
        let row = returns.row_of(date);
        let mut gaps = Vec::new();
        for (instrument, amount) in self.holdings.iter_mut() {
            match row.and_then(|r| returns.get_at(r, instrument)) {
                Some(r) => *amount *= 1.0 + r,
                None => gaps.push(instrument.clone()),
            }
        }
        gaps
    }
}
