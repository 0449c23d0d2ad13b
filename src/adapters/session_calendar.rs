//! Clock-based session calendar.
//!
//! The trading day is the calendar date of the bar, moved to the next date
//! once the bar time reaches the roll time (an evening open such as 18:00
//! belongs to the following day's session). Weekend dates optionally roll
//! forward to Monday. Bars that land on a closed day do not resolve.

use crate::domain::error::DaylevelsError;
use crate::ports::calendar_port::{CalendarError, SessionCalendar};
use crate::ports::config_port::ConfigPort;
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollingSessionCalendar {
    roll_time: NaiveTime,
    skip_weekends: bool,
    closed_days: BTreeSet<NaiveDate>,
}

impl Default for RollingSessionCalendar {
    fn default() -> Self {
        Self::new(NaiveTime::MIN, true)
    }
}

impl RollingSessionCalendar {
    /// A roll time of midnight means the trading day is the calendar date.
    pub fn new(roll_time: NaiveTime, skip_weekends: bool) -> Self {
        Self {
            roll_time,
            skip_weekends,
            closed_days: BTreeSet::new(),
        }
    }

    pub fn with_closed_days(mut self, days: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.closed_days.extend(days);
        self
    }

    /// Reads the `[session]` section. Absent keys keep their defaults.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, DaylevelsError> {
        let roll_time = match config.get_string("session", "roll_time") {
            None => NaiveTime::MIN,
            Some(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| {
                DaylevelsError::ConfigInvalid {
                    section: "session".to_string(),
                    key: "roll_time".to_string(),
                    reason: format!("'{}' is not HH:MM: {}", raw, e),
                }
            })?,
        };
        let skip_weekends = config.get_bool("session", "skip_weekends", true);

        let mut closed_days = Vec::new();
        if let Some(raw) = config.get_string("session", "closed_days") {
            for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let day = NaiveDate::parse_from_str(item, "%Y-%m-%d").map_err(|e| {
                    DaylevelsError::ConfigInvalid {
                        section: "session".to_string(),
                        key: "closed_days".to_string(),
                        reason: format!("'{}' is not YYYY-MM-DD: {}", item, e),
                    }
                })?;
                closed_days.push(day);
            }
        }

        Ok(Self::new(roll_time, skip_weekends).with_closed_days(closed_days))
    }

    pub fn roll_time(&self) -> NaiveTime {
        self.roll_time
    }

    pub fn is_closed(&self, day: NaiveDate) -> bool {
        self.closed_days.contains(&day)
    }
}

impl SessionCalendar for RollingSessionCalendar {
    fn trading_day_of(&self, timestamp: NaiveDateTime) -> Result<NaiveDate, CalendarError> {
        let overflow = || CalendarError {
            timestamp,
            reason: "date out of range".to_string(),
        };

        let mut day = timestamp.date();
        if self.roll_time != NaiveTime::MIN && timestamp.time() >= self.roll_time {
            day = day.succ_opt().ok_or_else(overflow)?;
        }
        if self.skip_weekends {
            let shift = match day.weekday() {
                Weekday::Sat => 2,
                Weekday::Sun => 1,
                _ => 0,
            };
            day = day.checked_add_days(Days::new(shift)).ok_or_else(overflow)?;
        }

        if self.is_closed(day) {
            return Err(CalendarError {
                timestamp,
                reason: format!("{} is a closed day", day),
            });
        }
        Ok(day)
    }
}
