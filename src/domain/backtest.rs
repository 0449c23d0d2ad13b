//! Expected-move backtest.
//!
//! Replays the expected-move projection over archived days. Each evaluated
//! day is projected from its own open using only the (up to `lookback`) days
//! strictly before it, then compared with what the day actually did.

use crate::domain::day::DayRecord;
use crate::domain::expected_move::compute_expected_move;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BacktestResult {
    pub total_days: usize,
    pub high_success_count: usize,
    pub low_success_count: usize,
}

impl BacktestResult {
    /// Percentage of days whose high reached the projected high.
    pub fn high_success_rate(&self) -> f64 {
        rate(self.high_success_count, self.total_days)
    }

    /// Percentage of days whose low reached the projected low.
    pub fn low_success_rate(&self) -> f64 {
        rate(self.low_success_count, self.total_days)
    }
}

fn rate(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

/// `history` holds resolved days only, oldest first. The first day has no
/// predecessor to project from and is never evaluated, so
/// `total_days = min(history.len() - 1, lookback)`.
pub fn evaluate_backtest(history: &[DayRecord], lookback: usize) -> BacktestResult {
    let mut result = BacktestResult::default();
    if history.len() < 2 || lookback == 0 {
        return result;
    }

    let first = history.len().saturating_sub(lookback).max(1);
    for i in first..history.len() {
        let day = &history[i];
        let Some(stats) = compute_expected_move(&history[..i], lookback, day.open) else {
            continue;
        };
        result.total_days += 1;
        if day.high >= stats.expected_high {
            result.high_success_count += 1;
        }
        if day.low <= stats.expected_low {
            result.low_success_count += 1;
        }
    }

    result
}
