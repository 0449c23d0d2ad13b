//! OHLCV bar representation.

use crate::domain::error::EngineError;
use chrono::{NaiveDateTime, NaiveTime};

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    pub fn time_of_day(&self) -> NaiveTime {
        self.timestamp.time()
    }

    /// high - low
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Rejects non-finite fields, non-positive prices, negative volume and high < low.
    pub fn validate(&self) -> Result<(), EngineError> {
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(EngineError::invalid_value(field, value));
            }
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(EngineError::invalid_value("volume", self.volume));
        }
        if self.high < self.low {
            return Err(EngineError::invalid_value("high", self.high));
        }
        Ok(())
    }
}
