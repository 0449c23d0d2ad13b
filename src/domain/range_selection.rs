//! Range selection strategies.
//!
//! Every strategy turns the archived history (plus today's open for the
//! expected-move variant) into a [`RangeAnchors`]. Unmet preconditions yield
//! `InsufficientHistory`; anchors that come out inverted yield `InvalidRange`.

use crate::domain::anchors::RangeAnchors;
use crate::domain::daily_series::{DailySeries, days_before, find_open_of};
use crate::domain::day::DayRecord;
use crate::domain::error::EngineError;
use crate::domain::expected_move::{ExpectedMoveStats, compute_expected_move};
use chrono::NaiveDate;
use std::fmt;

pub const DEFAULT_CENTER_HORIZON: usize = 30;

/// How NR2 is chosen for manually supplied anchors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ManualCenter {
    Midpoint,
    /// Open of `date`, looked up at most `horizon` days back.
    OpenOf { date: NaiveDate, horizon: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RangeSelectionStrategy {
    #[default]
    SingleDay,
    NDay { days: usize },
    Manual { q1: f64, q4: f64, center: ManualCenter },
    ManualCenter { center: f64 },
    ExpectedMove { lookback: usize },
}

impl fmt::Display for RangeSelectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeSelectionStrategy::SingleDay => write!(f, "single_day"),
            RangeSelectionStrategy::NDay { days } => write!(f, "n_day({})", days),
            RangeSelectionStrategy::Manual { q1, q4, .. } => write!(f, "manual({}, {})", q1, q4),
            RangeSelectionStrategy::ManualCenter { center } => {
                write!(f, "manual_center({})", center)
            }
            RangeSelectionStrategy::ExpectedMove { lookback } => {
                write!(f, "expected_move({})", lookback)
            }
        }
    }
}

/// Inputs available when a new day's anchors are selected.
#[derive(Debug, Clone, Copy)]
pub struct RangeContext<'a> {
    /// Archived days, oldest first, all strictly before today.
    pub history: &'a [DayRecord],
    /// The forming day. Named-day lookups only see days before it.
    pub today: Option<NaiveDate>,
    pub today_open: f64,
    /// External daily series; archived history is scanned when absent.
    pub daily: Option<&'a DailySeries>,
    /// Stats already computed for today, reused instead of recomputing.
    pub expected_move: Option<ExpectedMoveStats>,
}

impl<'a> RangeContext<'a> {
    pub fn new(history: &'a [DayRecord], today_open: f64) -> Self {
        Self {
            history,
            today: None,
            today_open,
            daily: None,
            expected_move: None,
        }
    }
}

impl RangeSelectionStrategy {
    /// Minimum archived days the strategy needs.
    pub fn required_history(&self) -> usize {
        match self {
            RangeSelectionStrategy::SingleDay
            | RangeSelectionStrategy::ManualCenter { .. }
            | RangeSelectionStrategy::ExpectedMove { .. } => 1,
            RangeSelectionStrategy::NDay { days } => *days,
            RangeSelectionStrategy::Manual { .. } => 0,
        }
    }

    pub fn select(&self, ctx: &RangeContext<'_>) -> Result<RangeAnchors, EngineError> {
        let available = ctx.history.len();
        let required = self.required_history();
        if available < required {
            return Err(EngineError::InsufficientHistory {
                required,
                available,
            });
        }

        match *self {
            RangeSelectionStrategy::SingleDay => {
                let prior = prior_day(ctx.history)?;
                RangeAnchors::new(prior.high, prior.low, None)
            }
            RangeSelectionStrategy::NDay { days } => {
                let window = &ctx.history[available - days..];
                let q1 = window.iter().map(|d| d.high).fold(f64::NEG_INFINITY, f64::max);
                let q4 = window.iter().map(|d| d.low).fold(f64::INFINITY, f64::min);
                RangeAnchors::new(q1, q4, None)
            }
            RangeSelectionStrategy::Manual { q1, q4, center } => {
                let nr2 = match center {
                    ManualCenter::Midpoint => None,
                    ManualCenter::OpenOf { date, horizon } => {
                        let mut days = ctx.daily.map(|s| s.days()).unwrap_or(ctx.history);
                        if let Some(today) = ctx.today {
                            days = days_before(days, today);
                        }
                        let found = find_open_of(days, date, horizon);
                        if found.is_none() {
                            tracing::debug!(%date, horizon, "center day not found, using midpoint");
                        }
                        found
                    }
                };
                RangeAnchors::new(q1, q4, nr2)
            }
            RangeSelectionStrategy::ManualCenter { center } => {
                let prior = prior_day(ctx.history)?;
                let half = prior.range() / 2.0;
                RangeAnchors::new(center + half, center - half, Some(center))
            }
            RangeSelectionStrategy::ExpectedMove { lookback } => {
                let stats = match ctx.expected_move {
                    Some(stats) => stats,
                    None => compute_expected_move(ctx.history, lookback, ctx.today_open).ok_or(
                        EngineError::InsufficientHistory {
                            required: 1,
                            available,
                        },
                    )?,
                };
                if !stats.is_valid() {
                    return Err(EngineError::InvalidRange {
                        q1: stats.expected_high,
                        q4: stats.expected_low,
                    });
                }
                RangeAnchors::new(stats.expected_high, stats.expected_low, Some(stats.today_open))
            }
        }
    }
}

fn prior_day(history: &[DayRecord]) -> Result<&DayRecord, EngineError> {
    history.last().ok_or(EngineError::InsufficientHistory {
        required: 1,
        available: 0,
    })
}
