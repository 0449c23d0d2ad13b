//! Date-indexed daily bar series.
//!
//! Secondary lower-frequency series consulted by absolute date, e.g. to find
//! the opening price of a named day for a manual center override.

use crate::domain::day::DayRecord;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::calendar_port::SessionCalendar;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct DailySeries {
    days: Vec<DayRecord>,
    date_index: HashMap<NaiveDate, usize>,
}

impl DailySeries {
    /// Records are sorted by date; a later duplicate date replaces an earlier one.
    pub fn new(mut days: Vec<DayRecord>) -> Self {
        days.sort_by_key(|d| d.date);
        days.dedup_by(|later, earlier| {
            if later.date == earlier.date {
                *earlier = *later;
                true
            } else {
                false
            }
        });
        let date_index = days.iter().enumerate().map(|(i, d)| (d.date, i)).collect();
        Self { days, date_index }
    }

    /// Rolls bars up to one record per trading day. Bars the calendar cannot
    /// resolve, or with invalid prices, are left out.
    pub fn from_bars(bars: &[OhlcvBar], calendar: &dyn SessionCalendar) -> Self {
        let mut days: Vec<DayRecord> = Vec::new();
        for bar in bars {
            if bar.validate().is_err() {
                continue;
            }
            let Ok(date) = calendar.trading_day_of(bar.timestamp) else {
                continue;
            };
            match days.last_mut() {
                Some(day) if day.date == date => {
                    day.high = day.high.max(bar.high);
                    day.low = day.low.min(bar.low);
                    day.close = bar.close;
                    day.volume += bar.volume;
                }
                _ => days.push(DayRecord {
                    date,
                    open: bar.open,
                    high: bar.high,
                    low: bar.low,
                    close: bar.close,
                    volume: bar.volume,
                }),
            }
        }
        Self::new(days)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    pub fn get(&self, index: usize) -> Option<&DayRecord> {
        self.days.get(index)
    }

    pub fn open(&self, index: usize) -> Option<f64> {
        self.get(index).map(|d| d.open)
    }

    pub fn high(&self, index: usize) -> Option<f64> {
        self.get(index).map(|d| d.high)
    }

    pub fn low(&self, index: usize) -> Option<f64> {
        self.get(index).map(|d| d.low)
    }

    pub fn close(&self, index: usize) -> Option<f64> {
        self.get(index).map(|d| d.close)
    }

    pub fn date(&self, index: usize) -> Option<NaiveDate> {
        self.get(index).map(|d| d.date)
    }

    pub fn days(&self) -> &[DayRecord] {
        &self.days
    }
}

/// Prefix of `days` (sorted by date) dated strictly before `date`.
pub fn days_before(days: &[DayRecord], date: NaiveDate) -> &[DayRecord] {
    &days[..days.partition_point(|d| d.date < date)]
}

/// Opening price of `target`, scanning `days` (oldest first) backward from the
/// newest entry over at most `horizon` records.
pub fn find_open_of(days: &[DayRecord], target: NaiveDate, horizon: usize) -> Option<f64> {
    days.iter()
        .rev()
        .take(horizon)
        .find(|d| d.date == target)
        .map(|d| d.open)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::calendar_port::CalendarError;
    use chrono::NaiveDateTime;

    struct CalendarDay;

    impl SessionCalendar for CalendarDay {
        fn trading_day_of(&self, timestamp: NaiveDateTime) -> Result<NaiveDate, CalendarError> {
            Ok(timestamp.date())
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn record(d: u32, open: f64) -> DayRecord {
        DayRecord {
            date: date(d),
            open,
            high: open + 2.0,
            low: open - 2.0,
            close: open + 1.0,
            volume: 1000.0,
        }
    }

    fn bar(d: u32, hour: u32, open: f64, close: f64) -> OhlcvBar {
        OhlcvBar {
            timestamp: date(d).and_hms_opt(hour, 0, 0).unwrap(),
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume: 10.0,
        }
    }

    #[test]
    fn new_sorts_and_indexes() {
        let series = DailySeries::new(vec![record(3, 103.0), record(1, 101.0), record(2, 102.0)]);
        assert_eq!(series.len(), 3);
        assert_eq!(series.index_of(date(1)), Some(0));
        assert_eq!(series.index_of(date(3)), Some(2));
        assert_eq!(series.open(1), Some(102.0));
        assert_eq!(series.date(2), Some(date(3)));
        assert_eq!(series.index_of(date(9)), None);
    }

    #[test]
    fn duplicate_dates_keep_latest() {
        let series = DailySeries::new(vec![record(1, 100.0), record(1, 200.0)]);
        assert_eq!(series.len(), 1);
        assert_eq!(series.open(0), Some(200.0));
    }

    #[test]
    fn from_bars_rolls_up_days() {
        let bars = vec![
            bar(1, 9, 100.0, 101.0),
            bar(1, 10, 101.0, 99.0),
            bar(2, 9, 99.5, 103.0),
        ];
        let series = DailySeries::from_bars(&bars, &CalendarDay);

        assert_eq!(series.len(), 2);
        let first = series.get(0).unwrap();
        assert!((first.open - 100.0).abs() < f64::EPSILON);
        assert!((first.close - 99.0).abs() < f64::EPSILON);
        assert!((first.high - 102.0).abs() < f64::EPSILON);
        assert!((first.low - 98.0).abs() < f64::EPSILON);
        assert!((first.volume - 20.0).abs() < f64::EPSILON);
        assert_eq!(series.open(1), Some(99.5));
    }

    #[test]
    fn days_before_cuts_at_date() {
        let days: Vec<_> = (1..=5).map(|d| record(d, 100.0)).collect();
        assert_eq!(days_before(&days, date(3)).len(), 2);
        assert_eq!(days_before(&days, date(1)).len(), 0);
        assert_eq!(days_before(&days, date(9)).len(), 5);
    }

    #[test]
    fn find_open_respects_horizon() {
        let days: Vec<_> = (1..=10).map(|d| record(d, 100.0 + d as f64)).collect();
        assert_eq!(find_open_of(&days, date(8), 5), Some(108.0));
        assert_eq!(find_open_of(&days, date(2), 5), None);
        assert_eq!(find_open_of(&days, date(2), 30), Some(102.0));
    }
}
