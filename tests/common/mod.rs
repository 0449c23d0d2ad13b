#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use daylevels::domain::error::DaylevelsError;
pub use daylevels::domain::ohlcv::OhlcvBar;
use daylevels::ports::calendar_port::{CalendarError, SessionCalendar};
use daylevels::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<OhlcvBar>, DaylevelsError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(DaylevelsError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, DaylevelsError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

/// Trading day is the calendar date.
pub struct CalendarDay;

impl SessionCalendar for CalendarDay {
    fn trading_day_of(&self, timestamp: NaiveDateTime) -> Result<NaiveDate, CalendarError> {
        Ok(timestamp.date())
    }
}

pub fn ts(date: &str, time: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M").unwrap()
}

pub fn make_bar(date: &str, time: &str, open: f64, high: f64, low: f64, close: f64) -> OhlcvBar {
    OhlcvBar {
        timestamp: ts(date, time),
        open,
        high,
        low,
        close,
        volume: 1000.0,
    }
}

/// Opening and closing bar for one day; the day spans `low..=high`.
pub fn make_day(date: &str, open: f64, high: f64, low: f64, close: f64) -> Vec<OhlcvBar> {
    vec![
        make_bar(date, "09:30", open, high, open.min(close), open),
        make_bar(date, "15:30", open, open.max(close), low, close),
    ]
}

/// Consecutive weekdays from 2024-01-01 (a Monday).
pub fn weekdays(count: usize) -> Vec<String> {
    let mut day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut out = Vec::with_capacity(count);
    while out.len() < count {
        if chrono::Datelike::weekday(&day).number_from_monday() <= 5 {
            out.push(day.format("%Y-%m-%d").to_string());
        }
        day = day.succ_opt().unwrap();
    }
    out
}

/// Bars for `count` weekdays drifting upward; every third day closes down.
pub fn trending_bars(count: usize) -> Vec<OhlcvBar> {
    weekdays(count)
        .iter()
        .enumerate()
        .flat_map(|(i, date)| {
            let open = 100.0 + i as f64;
            let close = if i % 3 == 2 { open - 1.0 } else { open + 1.5 };
            make_day(date, open, open + 3.0, open - 2.0, close)
        })
        .collect()
}

pub fn bars_to_csv(bars: &[OhlcvBar]) -> String {
    let mut out = String::from("timestamp,open,high,low,close,volume\n");
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.timestamp.format("%Y-%m-%d %H:%M"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    out
}
