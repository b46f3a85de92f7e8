//! End-to-end tests of the simulation loop.

mod common;

use common::{d, flat_market, init_logging, january_days, ScriptedStrategy};
use rebalab_core::calendar::{Moment, Periodicity, RebalanceRule};
use rebalab_core::domain::AllocationError;
use rebalab_core::engine::{run_simulation, CustomSchedule, EngineConfig, SimulationError};
use rebalab_core::market::{MarketData, PriceTable, PriceType};
use rebalab_core::strategy::{FixedWeightStrategy, Strategy, StrategyContext};

fn daily_rule() -> RebalanceRule {
    RebalanceRule::new(Periodicity::Daily, Moment::First)
}

#[test]
fn single_instrument_compounds_returns() {
    init_logging();
    let dates = vec![d(1, 2), d(1, 3), d(1, 4)];
    let open = PriceTable::new(dates.clone(), vec![("SPY".into(), vec![100.0, 100.0, 110.0])]).unwrap();
    let close = PriceTable::new(dates, vec![("SPY".into(), vec![100.0, 110.0, 104.5])]).unwrap();
    let market = MarketData::new(open, close).unwrap();

    let config = EngineConfig::new(d(1, 2), d(1, 4), 100.0);
    let mut strategy = FixedWeightStrategy::new([("SPY", 1.0)]).unwrap();
    let result = run_simulation(&config, &market, &mut strategy).unwrap();

    assert_eq!(result.trading_day_count, 3);
    assert_eq!(result.rebalancing_days, vec![d(1, 2)]);
    assert!((result.final_value - 104.5).abs() < 1e-9);
    let curve = result.value_curve();
    assert!((curve[0] - 100.0).abs() < 1e-9);
    assert!((curve[1] - 110.0).abs() < 1e-9);
    assert_eq!(result.data_gaps, 0);
}

#[test]
fn buy_delay_counts_trading_days_not_calendar_days() {
    init_logging();
    let market = flat_market(&["SPY"]);
    // Thursday decision, two trading days later is the following Monday.
    let config = EngineConfig::new(d(1, 4), d(1, 12), 100.0)
        .with_rule(daily_rule())
        .with_delays(2, 0);
    let mut strategy = ScriptedStrategy::default().on(d(1, 4), &[("SPY", 1.0)]);
    let result = run_simulation(&config, &market, &mut strategy).unwrap();

    assert_eq!(result.rebalancing_days.first(), Some(&d(1, 4)));
    assert_eq!(strategy.decisions.len(), 7);
    assert_eq!(result.order_weights.len(), 1);
    assert_eq!(result.order_weights[0].date, d(1, 8));

    let by_date = |date| result.valuations.iter().find(|v| v.date == date).unwrap();
    assert_eq!(by_date(d(1, 5)).cash, 100.0);
    assert!(by_date(d(1, 5)).holdings.is_empty());
    assert_eq!(by_date(d(1, 8)).cash, 0.0);
    assert_eq!(by_date(d(1, 8)).holdings["SPY"], 100.0);
}

#[test]
fn delay_past_run_end_settles_on_last_day() {
    let market = flat_market(&["SPY"]);
    let config = EngineConfig::new(d(1, 2), d(1, 12), 100.0)
        .with_rule(RebalanceRule::new(Periodicity::Weekly, Moment::Last))
        .with_delays(5, 5);
    let mut strategy = FixedWeightStrategy::new([("SPY", 1.0)]).unwrap();
    let result = run_simulation(&config, &market, &mut strategy).unwrap();

    assert_eq!(result.rebalancing_days, vec![d(1, 5), d(1, 12)]);
    assert_eq!(result.order_weights.len(), 1);
    assert_eq!(result.order_weights[0].date, d(1, 12));
}

#[test]
fn insufficient_cash_downsizes_every_buy() {
    init_logging();
    let market = flat_market(&["A", "B", "C"]);
    let config = EngineConfig::new(d(1, 2), d(1, 12), 100.0)
        .with_rule(daily_rule())
        .with_delays(0, 2);
    let mut strategy = ScriptedStrategy::default()
        .on(d(1, 2), &[("A", 0.5)])
        .on(d(1, 3), &[("B", 0.6), ("C", 0.4)]);
    let result = run_simulation(&config, &market, &mut strategy).unwrap();

    // Jan 3: 100 requested against 50 cash, ratio 0.5; A is sold two days later.
    let jan3 = &result.valuations[1];
    assert_eq!(jan3.date, d(1, 3));
    assert!((jan3.holdings["B"] - 30.0).abs() < 1e-9);
    assert!((jan3.holdings["C"] - 20.0).abs() < 1e-9);
    assert!(jan3.cash.abs() < 1e-9);
    assert!(jan3.cash > -1e-9);

    let jan5 = &result.valuations[3];
    assert!(!jan5.holdings.contains_key("A"));
    assert!((jan5.cash - 50.0).abs() < 1e-9);

    let orders = &result.order_weights[1];
    assert_eq!(orders.date, d(1, 3));
    assert!((orders.weights["B"] - 0.3).abs() < 1e-9);
    assert!((orders.weights["C"] - 0.2).abs() < 1e-9);
}

#[test]
fn valuation_identity_holds_every_day() {
    let dates = january_days();
    let spy = vec![100.0, 101.5, 99.0, 102.25, 103.0, 98.5, 97.0, 101.0, 104.0];
    let ief = vec![50.0, 50.1, 50.3, 49.9, 49.8, 50.4, 50.6, 50.2, 50.0];
    let close = PriceTable::new(dates, vec![("SPY".into(), spy), ("IEF".into(), ief)]).unwrap();
    let market = MarketData::close_only(close).unwrap();

    let config = EngineConfig::new(d(1, 2), d(1, 12), 1_000.0)
        .with_rule(daily_rule())
        .with_delays(1, 0)
        .with_fee(0.001);
    let mut strategy = FixedWeightStrategy::new([("SPY", 0.6), ("IEF", 0.4)]).unwrap();
    let result = run_simulation(&config, &market, &mut strategy).unwrap();

    assert_eq!(result.valuations.len(), 9);
    for row in &result.valuations {
        let derived = row.cash + row.holdings.values().sum::<f64>();
        assert!((row.total_value - derived).abs() < 1e-9, "identity broken on {}", row.date);
    }
    for row in &result.allocation_history {
        let sum: f64 = row.weights.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }
}

#[test]
fn custom_schedule_liquidates_then_uses_its_own_delays() {
    init_logging();
    let market = flat_market(&["SPY"]);
    let custom = CustomSchedule::new(d(1, 8), daily_rule())
        .with_delays(1, 1)
        .with_liquidation_date(d(1, 10));
    let config = EngineConfig::new(d(1, 2), d(1, 12), 100.0)
        .with_rule(daily_rule())
        .with_custom_schedule(custom);
    let mut strategy = FixedWeightStrategy::new([("SPY", 1.0)]).unwrap();
    let result = run_simulation(&config, &market, &mut strategy).unwrap();

    let row = |date| result.valuations.iter().find(|v| v.date == date).unwrap();
    assert_eq!(row(d(1, 9)).holdings["SPY"], 100.0);
    assert_eq!(row(d(1, 10)).cash, 100.0);
    assert!(row(d(1, 10)).holdings.is_empty());
    // Jan 11 decision settles one trading day later under the custom delays.
    assert!(row(d(1, 11)).holdings.is_empty());
    assert_eq!(row(d(1, 12)).holdings["SPY"], 100.0);

    let liquidation = result
        .rebalancing_weights
        .iter()
        .find(|w| w.date == d(1, 10))
        .unwrap();
    assert_eq!(liquidation.weights["cash"], 1.0);
}

/// Triggers an irregular rebalance at start, and once more after the first fires.
#[derive(Default)]
struct IrregularStrategy {
    periodic: Vec<chrono::NaiveDate>,
    irregular: Vec<chrono::NaiveDate>,
}

impl Strategy for IrregularStrategy {
    fn initialize(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), SimulationError> {
        ctx.trigger_irregular_rebalancing();
        Ok(())
    }

    fn on_data(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), SimulationError> {
        self.periodic.push(ctx.date());
        Ok(())
    }

    fn on_irregular_rebalancing(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), SimulationError> {
        self.irregular.push(ctx.date());
        if self.irregular.len() == 1 {
            ctx.trigger_irregular_rebalancing();
        }
        ctx.set_allocation([("SPY", 0.5)])
    }
}

#[test]
fn irregular_trigger_fires_after_cooldown_and_suppresses_periodic() {
    let market = flat_market(&["SPY"]);
    let config = EngineConfig::new(d(1, 2), d(1, 12), 100.0)
        .with_rule(daily_rule())
        .with_irregular_cooldown(3);
    let mut strategy = IrregularStrategy::default();
    let result = run_simulation(&config, &market, &mut strategy).unwrap();

    assert_eq!(strategy.irregular, vec![d(1, 2), d(1, 5)]);
    assert_eq!(strategy.periodic, vec![d(1, 8), d(1, 9), d(1, 10), d(1, 11), d(1, 12)]);
    assert_eq!(result.valuations[0].holdings["SPY"], 50.0);
}

#[test]
fn bad_allocation_aborts_the_run() {
    let market = flat_market(&["SPY"]);
    let config = EngineConfig::new(d(1, 2), d(1, 12), 100.0);
    let mut strategy = ScriptedStrategy::default().on(d(1, 2), &[("SPY", 0.7), ("cash", 0.7)]);
    match run_simulation(&config, &market, &mut strategy) {
        Err(SimulationError::Allocation { date, source }) => {
            assert_eq!(date, d(1, 2));
            assert!(matches!(source, AllocationError::DoesNotSumToOne(_)));
        }
        other => panic!("expected allocation error, got {other:?}"),
    }
}

#[test]
fn configuration_errors_surface_before_the_first_day() {
    let market = flat_market(&["SPY"]);
    let mut strategy = FixedWeightStrategy::new([("SPY", 1.0)]).unwrap();

    let bad_fee = EngineConfig::new(d(1, 2), d(1, 12), 100.0).with_fee(1.5);
    assert!(matches!(
        run_simulation(&bad_fee, &market, &mut strategy),
        Err(SimulationError::InvalidConfig(_))
    ));

    let bad_moment = EngineConfig::new(d(1, 2), d(1, 12), 100.0)
        .with_rule(RebalanceRule::new(Periodicity::Weekly, Moment::DayOfMonth(15)));
    assert!(matches!(
        run_simulation(&bad_moment, &market, &mut strategy),
        Err(SimulationError::Calendar(_))
    ));

    let outside = EngineConfig::new(d(3, 1), d(3, 31), 100.0);
    assert!(matches!(
        run_simulation(&outside, &market, &mut strategy),
        Err(SimulationError::NoTradingDays { .. })
    ));
}

#[test]
fn missing_returns_count_as_gaps_and_zero_moves() {
    init_logging();
    let dates = vec![d(1, 2), d(1, 3), d(1, 4), d(1, 5)];
    let close = PriceTable::new(dates, vec![("SPY".into(), vec![100.0, 100.0, f64::NAN, 100.0])]).unwrap();
    let market = MarketData::close_only(close).unwrap();
    let config = EngineConfig::new(d(1, 2), d(1, 5), 100.0);
    let mut strategy = FixedWeightStrategy::new([("SPY", 1.0)]).unwrap();
    let result = run_simulation(&config, &market, &mut strategy).unwrap();

    assert_eq!(result.data_gaps, 3);
    assert!((result.final_value - 100.0).abs() < 1e-9);
}

/// Reads history through the context; asserts it never sees the current close.
struct HistoryReader;

impl Strategy for HistoryReader {
    fn on_data(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), SimulationError> {
        let view = ctx.available_data(PriceType::Close, false);
        if let Some(last) = view.last_date() {
            if last >= ctx.date() {
                return Err(SimulationError::Strategy(format!("saw {last} on {}", ctx.date())));
            }
        }
        ctx.log_event(format!("{} rows visible", view.len()));
        Ok(())
    }
}

#[test]
fn available_data_excludes_today() {
    let market = flat_market(&["SPY"]);
    let config = EngineConfig::new(d(1, 2), d(1, 12), 100.0).with_rule(daily_rule());
    let result = run_simulation(&config, &market, &mut HistoryReader).unwrap();
    assert_eq!(result.events.len(), 9);
    assert_eq!(result.events[0].message, "0 rows visible");
    assert_eq!(result.events[8].message, "8 rows visible");
}

#[test]
fn liquidation_cancels_buys_still_in_flight() {
    init_logging();
    let market = flat_market(&["SPY"]);
    let custom = CustomSchedule::new(d(1, 12), RebalanceRule::never()).with_liquidation_date(d(1, 10));
    let config = EngineConfig::new(d(1, 2), d(1, 12), 100.0)
        .with_rule(daily_rule())
        .with_delays(2, 0)
        .with_custom_schedule(custom);
    let mut strategy = ScriptedStrategy::default()
        .on(d(1, 2), &[("SPY", 0.5)])
        .on(d(1, 8), &[("SPY", 1.0)])
        .on(d(1, 9), &[("SPY", 1.0)]);
    let result = run_simulation(&config, &market, &mut strategy).unwrap();

    let row = |date| result.valuations.iter().find(|v| v.date == date).unwrap();
    assert_eq!(row(d(1, 9)).holdings["SPY"], 50.0);
    // Jan 8 buy was due on Jan 10, Jan 9 buy on Jan 11.
    for day in [10, 11, 12] {
        assert_eq!(row(d(1, day)).cash, 100.0, "Jan {day}");
        assert!(row(d(1, day)).holdings.is_empty(), "Jan {day}");
    }
    assert!(!strategy.decisions.contains(&d(1, 10)));
    assert_eq!(result.final_ledger.holdings().len(), 0);
}

/// Records which decision hook ran on each day.
#[derive(Default)]
struct HookRecorder {
    calls: Vec<(chrono::NaiveDate, &'static str)>,
}

impl Strategy for HookRecorder {
    fn on_data(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), SimulationError> {
        self.calls.push((ctx.date(), "periodic"));
        if ctx.date() == d(1, 4) {
            ctx.trigger_irregular_rebalancing();
        }
        Ok(())
    }

    fn on_irregular_rebalancing(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), SimulationError> {
        self.calls.push((ctx.date(), "irregular"));
        ctx.trigger_irregular_rebalancing();
        Ok(())
    }

    fn on_custom_schedule(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), SimulationError> {
        self.calls.push((ctx.date(), "custom"));
        Ok(())
    }
}

#[test]
fn custom_schedule_preempts_periodic_and_irregular_hooks() {
    let market = flat_market(&["SPY"]);
    let custom = CustomSchedule::new(d(1, 10), daily_rule());
    let config = EngineConfig::new(d(1, 2), d(1, 12), 100.0)
        .with_rule(daily_rule())
        .with_irregular_cooldown(2)
        .with_custom_schedule(custom);
    let mut strategy = HookRecorder::default();
    run_simulation(&config, &market, &mut strategy).unwrap();

    // Jan 8: trigger pending and cooling down, periodic suppressed.
    // Jan 10 onward: a trigger is still pending but custom days win.
    assert_eq!(
        strategy.calls,
        vec![
            (d(1, 2), "periodic"),
            (d(1, 3), "periodic"),
            (d(1, 4), "periodic"),
            (d(1, 5), "irregular"),
            (d(1, 9), "irregular"),
            (d(1, 10), "custom"),
            (d(1, 11), "custom"),
            (d(1, 12), "custom"),
        ]
    );
}

#[test]
fn drift_trigger_rebalances_the_next_day() {
    init_logging();
    let dates = january_days();
    let mut spy = vec![150.0; dates.len()];
    spy[0] = 100.0;
    let ief = vec![100.0; dates.len()];
    let close = PriceTable::new(dates, vec![("SPY".into(), spy), ("IEF".into(), ief)]).unwrap();
    let market = MarketData::close_only(close).unwrap();

    let config = EngineConfig::new(d(1, 2), d(1, 12), 100.0);
    let mut strategy = FixedWeightStrategy::new([("SPY", 0.5), ("IEF", 0.5)])
        .unwrap()
        .with_drift_trigger(0.05);
    let result = run_simulation(&config, &market, &mut strategy).unwrap();

    let weights = |date| {
        let row = result.allocation_history.iter().find(|w| w.date == date).unwrap();
        (row.weights["SPY"], row.weights["IEF"])
    };
    let (spy_jan3, ief_jan3) = weights(d(1, 3));
    assert!((spy_jan3 - 0.6).abs() < 1e-12);
    assert!((ief_jan3 - 0.4).abs() < 1e-12);

    assert_eq!(result.events.len(), 1);
    assert_eq!(result.events[0].date, d(1, 3));

    let (spy_jan4, ief_jan4) = weights(d(1, 4));
    assert!((spy_jan4 - 0.5).abs() < 1e-12);
    assert!((ief_jan4 - 0.5).abs() < 1e-12);
    assert!(result.order_weights.iter().any(|w| w.date == d(1, 4)));
}
