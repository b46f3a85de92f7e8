//! The set of known trading days and date-index lookups over it.

use super::rule::{CalendarError, Magnet, RebalanceRule};
use super::schedule::{schedule_fn, ScheduleWindow};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Ordered, duplicate-free trading days plus an O(1) date → position table.
///
/// Immutable once built. `first_date` and `last_date` bound every snap.
#[derive(Debug, Clone)]
pub struct TradingCalendar {
    days: Vec<NaiveDate>,
    index: HashMap<NaiveDate, usize>,
}

impl TradingCalendar {
    /// Build a calendar from raw dates. Input order and duplicates don't matter.
    pub fn new(mut dates: Vec<NaiveDate>) -> Result<Self, CalendarError> {
        dates.sort_unstable();
        dates.dedup();
        if dates.is_empty() {
            return Err(CalendarError::Empty);
        }
        let index = dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();
        Ok(Self { days: dates, index })
    }

    pub fn all_trading_days(&self) -> &[NaiveDate] {
        &self.days
    }

    pub fn first_date(&self) -> NaiveDate {
        self.days[0]
    }

    pub fn last_date(&self) -> NaiveDate {
        self.days[self.days.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        self.index.contains_key(&date)
    }

    /// Position of `date` in the full trading-day sequence.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.index.get(&date).copied()
    }

    /// Trading days within the inclusive range `[start, end]`.
    ///
    /// Empty when the range lies entirely outside the known dates.
    pub fn trading_days(&self, start: NaiveDate, end: NaiveDate) -> &[NaiveDate] {
        if start > end {
            return &[];
        }
        let lo = self.days.partition_point(|d| *d < start);
        let hi = self.days.partition_point(|d| *d <= end);
        &self.days[lo..hi]
    }

    /// Map a calendar date onto the nearest trading day in the given direction.
    pub fn snap(&self, anchor: NaiveDate, magnet: Magnet) -> Option<NaiveDate> {
        match magnet {
            Magnet::After => {
                let i = self.days.partition_point(|d| *d < anchor);
                self.days.get(i).copied()
            }
            Magnet::Before => {
                let i = self.days.partition_point(|d| *d <= anchor);
                i.checked_sub(1).map(|i| self.days[i])
            }
        }
    }

    /// Rebalancing days in `[start, end]` selected by `rule`.
    ///
    /// Snapped dates falling outside the range are dropped and duplicates
    /// collapsed, so the result is strictly increasing.
    pub fn rebalancing_days(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        rule: &RebalanceRule,
    ) -> Result<Vec<NaiveDate>, CalendarError> {
        let schedule = schedule_fn(rule.periodicity, rule.moment)?;
        let window = ScheduleWindow {
            start,
            end,
            moment: rule.moment,
            close_day_policy: rule.close_day_policy,
        };
        let mut days: Vec<NaiveDate> = schedule(self, &window)
            .into_iter()
            .filter(|d| *d >= start && *d <= end)
            .collect();
        days.sort_unstable();
        days.dedup();
        Ok(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn weekdays(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        use chrono::{Datelike, Weekday};
        start
            .iter_days()
            .take_while(|x| *x <= end)
            .filter(|x| !matches!(x.weekday(), Weekday::Sat | Weekday::Sun))
            .collect()
    }

    #[test]
    fn empty_calendar_is_rejected() {
        assert_eq!(TradingCalendar::new(vec![]).unwrap_err(), CalendarError::Empty);
    }

    #[test]
    fn dates_are_sorted_and_deduplicated() {
        let cal = TradingCalendar::new(vec![d(2020, 1, 3), d(2020, 1, 1), d(2020, 1, 3)]).unwrap();
        assert_eq!(cal.all_trading_days(), &[d(2020, 1, 1), d(2020, 1, 3)]);
        assert_eq!(cal.first_date(), d(2020, 1, 1));
        assert_eq!(cal.last_date(), d(2020, 1, 3));
        assert_eq!(cal.index_of(d(2020, 1, 3)), Some(1));
        assert_eq!(cal.index_of(d(2020, 1, 2)), None);
    }

    #[test]
    fn trading_days_inclusive_range() {
        let cal = TradingCalendar::new(weekdays(d(2020, 1, 1), d(2020, 1, 31))).unwrap();
        let days = cal.trading_days(d(2020, 1, 4), d(2020, 1, 10));
        assert_eq!(days, &[d(2020, 1, 6), d(2020, 1, 7), d(2020, 1, 8), d(2020, 1, 9), d(2020, 1, 10)]);
    }

    #[test]
    fn trading_days_outside_known_range_is_empty() {
        let cal = TradingCalendar::new(weekdays(d(2020, 1, 1), d(2020, 1, 31))).unwrap();
        assert!(cal.trading_days(d(2021, 1, 1), d(2021, 2, 1)).is_empty());
        assert!(cal.trading_days(d(2020, 1, 10), d(2020, 1, 5)).is_empty());
    }

    #[test]
    fn snap_moves_in_fixed_direction() {
        let cal = TradingCalendar::new(weekdays(d(2020, 1, 1), d(2020, 1, 31))).unwrap();
        // 2020-01-04 is a Saturday
        assert_eq!(cal.snap(d(2020, 1, 4), Magnet::After), Some(d(2020, 1, 6)));
        assert_eq!(cal.snap(d(2020, 1, 4), Magnet::Before), Some(d(2020, 1, 3)));
        assert_eq!(cal.snap(d(2020, 1, 6), Magnet::Before), Some(d(2020, 1, 6)));
        assert_eq!(cal.snap(d(2020, 2, 1), Magnet::After), None);
        assert_eq!(cal.snap(d(2019, 12, 31), Magnet::Before), None);
    }
}
