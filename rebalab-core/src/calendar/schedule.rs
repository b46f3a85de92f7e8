//! Pure schedule functions, one per (periodicity, moment) combination.
//!
//! `schedule_fn` is the dispatch table. Each function returns candidate
//! dates in ascending order; range filtering and de-duplication happen once
//! in `TradingCalendar::rebalancing_days`.

use super::rule::{CalendarError, Magnet, Moment, Periodicity};
use super::trading_calendar::TradingCalendar;
use chrono::{Datelike, NaiveDate, Weekday};

/// Inputs shared by every schedule function.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub moment: Moment,
    pub close_day_policy: Magnet,
}

pub type ScheduleFn = fn(&TradingCalendar, &ScheduleWindow) -> Vec<NaiveDate>;

/// Months whose first trading day opens a rebalancing window for quarterly/first.
///
/// Kept as Apr/Jun/Sep/Dec while quarterly/last uses Mar/Jun/Sep/Dec; the
/// one-month asymmetry is preserved rather than reconciled.
pub const REPORT_MONTHS: [u32; 4] = [4, 6, 9, 12];

/// Quarter-end months used by quarterly/last.
pub const QUARTER_END_MONTHS: [u32; 4] = [3, 6, 9, 12];

/// Resolve the schedule function for a periodicity/moment pair.
pub fn schedule_fn(periodicity: Periodicity, moment: Moment) -> Result<ScheduleFn, CalendarError> {
    let f: ScheduleFn = match (periodicity, moment) {
        (Periodicity::None, _) => no_rebalancing,
        (Periodicity::Daily, _) => every_trading_day,
        (Periodicity::Weekly, Moment::First) => first_of_every_week,
        (Periodicity::Weekly, Moment::Last) => last_of_every_week,
        (Periodicity::Monthly, Moment::First) => first_of_every_month,
        (Periodicity::Monthly, Moment::Last) => last_of_every_month,
        (Periodicity::Monthly, Moment::DayOfMonth(_)) => nth_day_of_every_month,
        (Periodicity::Quarterly, Moment::First) => first_of_report_months,
        (Periodicity::Quarterly, Moment::Last) => last_of_quarter_end_months,
        (Periodicity::Yearly, Moment::First) => first_of_every_year,
        (Periodicity::Yearly, Moment::Last) => last_of_every_year,
        (periodicity, moment) => {
            return Err(CalendarError::MomentNotSupported {
                periodicity,
                moment,
            })
        }
    };
    Ok(f)
}

pub fn no_rebalancing(_: &TradingCalendar, _: &ScheduleWindow) -> Vec<NaiveDate> {
    Vec::new()
}

pub fn every_trading_day(cal: &TradingCalendar, w: &ScheduleWindow) -> Vec<NaiveDate> {
    cal.trading_days(w.start, w.end).to_vec()
}

/// Every Monday in range, snapped forward.
pub fn first_of_every_week(cal: &TradingCalendar, w: &ScheduleWindow) -> Vec<NaiveDate> {
    weekday_anchors(w.start, w.end, Weekday::Mon)
        .filter_map(|anchor| cal.snap(anchor, Magnet::After))
        .collect()
}

/// Every Friday in range, snapped backward.
pub fn last_of_every_week(cal: &TradingCalendar, w: &ScheduleWindow) -> Vec<NaiveDate> {
    weekday_anchors(w.start, w.end, Weekday::Fri)
        .filter_map(|anchor| cal.snap(anchor, Magnet::Before))
        .collect()
}

pub fn first_of_every_month(cal: &TradingCalendar, w: &ScheduleWindow) -> Vec<NaiveDate> {
    months_spanned(w.start, w.end)
        .into_iter()
        .filter_map(|(y, m)| first_of_month(y, m))
        .filter_map(|anchor| cal.snap(anchor, Magnet::After))
        .collect()
}

/// Last trading day inside each month. Months without trading days are skipped.
pub fn last_of_every_month(cal: &TradingCalendar, w: &ScheduleWindow) -> Vec<NaiveDate> {
    months_spanned(w.start, w.end)
        .into_iter()
        .filter_map(|(y, m)| {
            let first = first_of_month(y, m)?;
            let last = last_of_month(y, m)?;
            cal.trading_days(first, last).last().copied()
        })
        .collect()
}

/// The n-th calendar day of each month, snapped by the close day policy.
///
/// A month that has no n-th day (e.g. the 31st of April) is skipped.
pub fn nth_day_of_every_month(cal: &TradingCalendar, w: &ScheduleWindow) -> Vec<NaiveDate> {
    let Moment::DayOfMonth(day) = w.moment else {
        return Vec::new();
    };
    months_spanned(w.start, w.end)
        .into_iter()
        .filter_map(|(y, m)| NaiveDate::from_ymd_opt(y, m, day))
        .filter_map(|anchor| cal.snap(anchor, w.close_day_policy))
        .collect()
}

pub fn first_of_report_months(cal: &TradingCalendar, w: &ScheduleWindow) -> Vec<NaiveDate> {
    months_spanned(w.start, w.end)
        .into_iter()
        .filter(|(_, m)| REPORT_MONTHS.contains(m))
        .filter_map(|(y, m)| first_of_month(y, m))
        .filter_map(|anchor| cal.snap(anchor, Magnet::After))
        .collect()
}

pub fn last_of_quarter_end_months(cal: &TradingCalendar, w: &ScheduleWindow) -> Vec<NaiveDate> {
    months_spanned(w.start, w.end)
        .into_iter()
        .filter(|(_, m)| QUARTER_END_MONTHS.contains(m))
        .filter_map(|(y, m)| last_of_month(y, m))
        .filter_map(|anchor| cal.snap(anchor, Magnet::Before))
        .collect()
}

pub fn first_of_every_year(cal: &TradingCalendar, w: &ScheduleWindow) -> Vec<NaiveDate> {
    (w.start.year()..=w.end.year())
        .filter_map(|y| year_trading_days(cal, y).first().copied())
        .collect()
}

pub fn last_of_every_year(cal: &TradingCalendar, w: &ScheduleWindow) -> Vec<NaiveDate> {
    (w.start.year()..=w.end.year())
        .filter_map(|y| year_trading_days(cal, y).last().copied())
        .collect()
}

// ── Calendar arithmetic ─────────────────────────────────────────────

/// Every (year, month) pair from `start`'s month through `end`'s month.
pub fn months_spanned(start: NaiveDate, end: NaiveDate) -> Vec<(i32, u32)> {
    let mut months = Vec::new();
    let (mut y, mut m) = (start.year(), start.month());
    while (y, m) <= (end.year(), end.month()) {
        months.push((y, m));
        if m == 12 {
            y += 1;
            m = 1;
        } else {
            m += 1;
        }
    }
    months
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn last_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next?.pred_opt()
}

fn year_trading_days(cal: &TradingCalendar, year: i32) -> &[NaiveDate] {
    match (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) {
        (Some(first), Some(last)) => cal.trading_days(first, last),
        _ => &[],
    }
}

fn weekday_anchors(
    start: NaiveDate,
    end: NaiveDate,
    weekday: Weekday,
) -> impl Iterator<Item = NaiveDate> {
    start
        .iter_days()
        .take_while(move |d| *d <= end)
        .filter(move |d| d.weekday() == weekday)
}
