//! Settlement — applies the orders due today to the ledger.
//!
//! Order of operations:
//! 1. Resolve `LiquidateAll` against the current holding
//! 2. Drop zero amounts
//! 3. Execute every sell (skipped when nothing is held, capped to the holding)
//! 4. Scale every buy by one downsize ratio, `min(1, cash / requested)`
//! 5. Execute the buys

use super::reservation::OrderSet;
use crate::domain::PortfolioLedger;
use std::collections::BTreeMap;

/// What actually happened during one settlement batch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SettlementReport {
    /// Signed amounts executed per instrument (negative = sold).
    pub executed: BTreeMap<String, f64>,
    /// Ratio applied to every buy in the batch (1.0 when cash sufficed).
    pub downsize_ratio: f64,
    /// Sells skipped because nothing was held.
    pub skipped: Vec<String>,
}

/// Uniform scaling factor for a batch of buys.
///
/// Returns 1 when nothing is requested. Never negative.
pub fn downsize_ratio(available_cash: f64, requested_buys: f64) -> f64 {
    if requested_buys <= 0.0 {
        return 1.0;
    }
    (available_cash / requested_buys).clamp(0.0, 1.0)
}

/// Settle one day's orders against the ledger.
pub fn settle(ledger: &mut PortfolioLedger, orders: OrderSet) -> SettlementReport {
    let resolved: Vec<(String, f64)> = orders
        .into_iter()
        .map(|(instrument, delta)| {
            let amount = delta.resolve(ledger.holding(&instrument));
            (instrument, amount)
        })
        .filter(|(_, amount)| *amount != 0.0)
        .collect();

    let (sells, buys): (Vec<_>, Vec<_>) = resolved.into_iter().partition(|(_, a)| *a < 0.0);

    let mut report = SettlementReport {
        downsize_ratio: 1.0,
        ..SettlementReport::default()
    };

    for (instrument, amount) in sells {
        let held = ledger.holding(&instrument);
        if held == 0.0 {
            report.skipped.push(instrument);
            continue;
        }
        let mut quantity = -amount;
        if held > 0.0 {
            quantity = quantity.min(held);
        }
        ledger.sell(&instrument, quantity);
        report.executed.insert(instrument, -quantity);
    }

    let requested: f64 = buys.iter().map(|(_, a)| *a).sum();
    let ratio = downsize_ratio(ledger.cash(), requested);
    report.downsize_ratio = ratio;

    for (instrument, amount) in buys {
        let scaled = amount * ratio;
        if scaled > 0.0 {
            ledger.buy(&instrument, scaled);
            report.executed.insert(instrument, scaled);
        }
    }

    report
}
