//! Session calendar port.
//!
//! Exchange hours, holidays and session rolls belong to the platform; the
//! engine only asks which trading day a timestamp falls in.

use chrono::{NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot resolve trading day for {timestamp}: {reason}")]
pub struct CalendarError {
    pub timestamp: NaiveDateTime,
    pub reason: String,
}

pub trait SessionCalendar {
    fn trading_day_of(&self, timestamp: NaiveDateTime) -> Result<NaiveDate, CalendarError>;
}
