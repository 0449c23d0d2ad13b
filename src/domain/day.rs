//! Forming-day accumulation and archived day records.
//!
//! A [`DayAccumulator`] is advanced by value on every bar of the current
//! trading day. When the session rolls it is frozen into an immutable
//! [`DayRecord`] and handed to the history window.

use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayRecord {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl DayRecord {
    /// high - low
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// close > open; a flat day counts as bearish.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayAccumulator {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    bar_count: usize,
}

impl DayAccumulator {
    /// Opens a new forming day from its first bar.
    pub fn start(date: NaiveDate, bar: &OhlcvBar) -> Self {
        Self {
            date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            bar_count: 1,
        }
    }

    pub fn advance(self, bar: &OhlcvBar) -> Self {
        Self {
            high: self.high.max(bar.high),
            low: self.low.min(bar.low),
            close: bar.close,
            volume: self.volume + bar.volume,
            bar_count: self.bar_count + 1,
            ..self
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn open(&self) -> f64 {
        self.open
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn close(&self) -> f64 {
        self.close
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn bar_count(&self) -> usize {
        self.bar_count
    }

    pub fn archive(self) -> DayRecord {
        DayRecord {
            date: self.date,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}
