//! Range anchors: the upper/lower/center prices every level is derived from.

use crate::domain::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeAnchors {
    q1: f64,
    q4: f64,
    nr2: f64,
    range: f64,
}

impl RangeAnchors {
    /// `nr2` defaults to the midpoint `q4 + range / 2` unless `center` is given.
    pub fn new(q1: f64, q4: f64, center: Option<f64>) -> Result<Self, EngineError> {
        if !q1.is_finite() {
            return Err(EngineError::invalid_value("q1", q1));
        }
        if !q4.is_finite() {
            return Err(EngineError::invalid_value("q4", q4));
        }
        let range = q1 - q4;
        if q1 <= q4 || range <= 0.0 {
            return Err(EngineError::InvalidRange { q1, q4 });
        }
        let nr2 = center.unwrap_or(q4 + range / 2.0);
        if !nr2.is_finite() {
            return Err(EngineError::invalid_value("nr2", nr2));
        }
        Ok(Self { q1, q4, nr2, range })
    }

    pub fn q1(&self) -> f64 {
        self.q1
    }

    pub fn q4(&self) -> f64 {
        self.q4
    }

    pub fn nr2(&self) -> f64 {
        self.nr2
    }

    pub fn range(&self) -> f64 {
        self.range
    }
}
