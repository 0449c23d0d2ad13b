//! Trading-day boundary detection.

use crate::domain::error::EngineError;
use crate::ports::calendar_port::SessionCalendar;
use chrono::{NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTick {
    pub is_new_day: bool,
    pub trading_day: NaiveDate,
}

pub struct SessionBoundaryAdapter {
    calendar: Box<dyn SessionCalendar + Send>,
    last_day: Option<NaiveDate>,
}

impl std::fmt::Debug for SessionBoundaryAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBoundaryAdapter")
            .field("last_day", &self.last_day)
            .finish_non_exhaustive()
    }
}

impl SessionBoundaryAdapter {
    pub fn new(calendar: Box<dyn SessionCalendar + Send>) -> Self {
        Self {
            calendar,
            last_day: None,
        }
    }

    /// Resolves the bar's trading day and reports whether it opens a new one.
    /// On error the last seen day is left untouched.
    pub fn on_bar(&mut self, timestamp: NaiveDateTime) -> Result<SessionTick, EngineError> {
        let trading_day = self
            .calendar
            .trading_day_of(timestamp)
            .map_err(|e| EngineError::CalendarResolution {
                reason: e.to_string(),
            })?;

        let is_new_day = match self.last_day {
            None => true,
            Some(last) if trading_day < last => {
                return Err(EngineError::OutOfOrder {
                    day: trading_day,
                    last,
                });
            }
            Some(last) => trading_day > last,
        };

        self.last_day = Some(trading_day);
        Ok(SessionTick {
            is_new_day,
            trading_day,
        })
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        self.last_day
    }

    pub fn calendar(&self) -> &dyn SessionCalendar {
        self.calendar.as_ref()
    }

    pub fn reset(&mut self) {
        self.last_day = None;
    }
}
