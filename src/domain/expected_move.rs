//! Expected move projection.
//!
//! Archived days are split into bullish (close > open) and bearish days. The
//! mean high-low range of each class, scaled by [`EXPECTED_MOVE_FACTOR`], is
//! added to / subtracted from today's open:
//!
//! expected_high = open + bull_avg * 0.682
//! expected_low  = open - bear_avg * 0.682

use crate::domain::day::DayRecord;

/// Roughly one standard deviation's share of the historical range.
pub const EXPECTED_MOVE_FACTOR: f64 = 0.682;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpectedMoveStats {
    pub today_open: f64,
    pub bullish_average_range: f64,
    pub bearish_average_range: f64,
    pub bullish_day_count: usize,
    pub bearish_day_count: usize,
    pub expected_high: f64,
    pub expected_low: f64,
}

impl ExpectedMoveStats {
    pub fn is_valid(&self) -> bool {
        self.today_open > 0.0 && self.expected_high > 0.0 && self.expected_low > 0.0
    }

    pub fn day_count(&self) -> usize {
        self.bullish_day_count + self.bearish_day_count
    }
}

/// Projects today's expected high/low from the `lookback` most recent days of
/// `history` (oldest first, all strictly before today). Uses every available
/// day when `lookback` exceeds the history; `None` when there are no days.
pub fn compute_expected_move(
    history: &[DayRecord],
    lookback: usize,
    today_open: f64,
) -> Option<ExpectedMoveStats> {
    let start = history.len().saturating_sub(lookback);
    let window = &history[start..];
    if window.is_empty() || !today_open.is_finite() {
        return None;
    }

    let mut bull_sum = 0.0;
    let mut bear_sum = 0.0;
    let mut bull_count = 0usize;
    let mut bear_count = 0usize;

    for day in window {
        if day.is_bullish() {
            bull_sum += day.range();
            bull_count += 1;
        } else {
            bear_sum += day.range();
            bear_count += 1;
        }
    }

    let bull_avg = if bull_count > 0 {
        bull_sum / bull_count as f64
    } else {
        0.0
    };
    let bear_avg = if bear_count > 0 {
        bear_sum / bear_count as f64
    } else {
        0.0
    };

    Some(ExpectedMoveStats {
        today_open,
        bullish_average_range: bull_avg,
        bearish_average_range: bear_avg,
        bullish_day_count: bull_count,
        bearish_day_count: bear_count,
        expected_high: today_open + bull_avg * EXPECTED_MOVE_FACTOR,
        expected_low: today_open - bear_avg * EXPECTED_MOVE_FACTOR,
    })
}

/// Holds the lookback length and the last computed stats for display.
#[derive(Debug, Clone)]
pub struct ExpectedMoveEngine {
    lookback: usize,
    last: Option<ExpectedMoveStats>,
}

impl ExpectedMoveEngine {
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback,
            last: None,
        }
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    pub fn compute(&mut self, history: &[DayRecord], today_open: f64) -> Option<ExpectedMoveStats> {
        self.last = compute_expected_move(history, self.lookback, today_open);
        self.last
    }

    pub fn last(&self) -> Option<ExpectedMoveStats> {
        self.last
    }

    pub fn clear(&mut self) {
        self.last = None;
    }
}
