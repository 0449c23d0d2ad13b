//! Level engine: the bar-by-bar calculation pipeline.
//!
//! Each bar is validated, assigned a trading day, and folded into the forming
//! day. When the day rolls, the forming day is archived, the expected move and
//! backtest are recomputed from the history window, and the selected range
//! strategy produces the anchors for the new day's level set. Relative volume
//! runs alongside off the same bars.
//!
//! Every [`EngineError`] is recovered here and kept as a [`Diagnostic`]; the
//! caller only ever sees `Option<BarOutput>`.

use crate::domain::anchors::RangeAnchors;
use crate::domain::backtest::{BacktestResult, evaluate_backtest};
use crate::domain::daily_series::DailySeries;
use crate::domain::day::{DayAccumulator, DayRecord};
use crate::domain::error::EngineError;
use crate::domain::expected_move::{ExpectedMoveEngine, ExpectedMoveStats};
use crate::domain::history::BoundedHistoryWindow;
use crate::domain::ladder::Ladder;
use crate::domain::levels::{Level, LevelDerivationEngine, LevelSet, PriceRounder, RoundingMode};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::range_selection::{RangeContext, RangeSelectionStrategy};
use crate::domain::relative_volume::{RelativeVolumeAggregator, VolumeResolution};
use crate::domain::session::SessionBoundaryAdapter;
use crate::ports::calendar_port::SessionCalendar;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;
pub const DEFAULT_LOOKBACK: usize = 20;
pub const DEFAULT_REFERENCE_PERIOD: usize = 10;
pub const DIAGNOSTIC_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub history_capacity: usize,
    pub strategy: RangeSelectionStrategy,
    /// Expected-move and backtest lookback in days.
    pub lookback: usize,
    pub ladder: Ladder,
    pub rounding: RoundingMode,
    pub volume_reference_period: usize,
    pub volume_resolution: VolumeResolution,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            strategy: RangeSelectionStrategy::default(),
            lookback: DEFAULT_LOOKBACK,
            ladder: Ladder::default(),
            rounding: RoundingMode::default(),
            volume_reference_period: DEFAULT_REFERENCE_PERIOD,
            volume_resolution: VolumeResolution::default(),
        }
    }
}

/// Scalar series for one bar. `None` stands in for "not enough input".
#[derive(Debug, Clone, PartialEq)]
pub struct BarOutput {
    pub timestamp: NaiveDateTime,
    pub trading_day: NaiveDate,
    pub is_new_day: bool,
    pub levels_changed: bool,
    pub expected_high: Option<f64>,
    pub expected_low: Option<f64>,
    pub relative_volume: Option<f64>,
    pub cumulated_ratio: Option<f64>,
    pub high_success_rate: Option<f64>,
    pub low_success_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishedLevels {
    pub day: NaiveDate,
    pub levels: LevelSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub timestamp: Option<NaiveDateTime>,
    pub error: EngineError,
}

#[derive(Debug, Clone, PartialEq)]
struct DayStats {
    day: NaiveDate,
    levels: Option<LevelSet>,
    expected_move: Option<ExpectedMoveStats>,
    backtest: Option<BacktestResult>,
}

/// One reported day: anchors, display-rounded levels and statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct DayLevelsRow {
    pub day: NaiveDate,
    pub anchors: Option<RangeAnchors>,
    pub levels: Vec<Level>,
    pub expected_move: Option<ExpectedMoveStats>,
    pub backtest: Option<BacktestResult>,
}

/// Copy of everything the rendering side reads.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub current_day: Option<DayAccumulator>,
    pub levels: Option<PublishedLevels>,
    pub display_levels: Vec<Level>,
    pub expected_move: Option<ExpectedMoveStats>,
    pub backtest: Option<BacktestResult>,
    pub last_output: Option<BarOutput>,
    pub layout_dirty: bool,
}

#[derive(Debug)]
pub struct LevelEngine {
    config: EngineConfig,
    strategy: RangeSelectionStrategy,
    session: SessionBoundaryAdapter,
    accumulator: Option<DayAccumulator>,
    history: BoundedHistoryWindow<DayRecord>,
    day_stats: BoundedHistoryWindow<DayStats>,
    published: Option<PublishedLevels>,
    deriver: LevelDerivationEngine,
    expected_move: ExpectedMoveEngine,
    backtest: Option<BacktestResult>,
    volume: RelativeVolumeAggregator,
    daily: Option<DailySeries>,
    diagnostics: BoundedHistoryWindow<Diagnostic>,
    last_output: Option<BarOutput>,
    layout_dirty: bool,
}

impl LevelEngine {
    /// `config` is expected to be validated already (history capacity ≥ 1).
    pub fn new(config: EngineConfig, calendar: Box<dyn SessionCalendar + Send>) -> Self {
        let deriver = LevelDerivationEngine::new(config.ladder.clone(), Box::new(config.rounding));
        Self {
            strategy: config.strategy,
            session: SessionBoundaryAdapter::new(calendar),
            accumulator: None,
            history: BoundedHistoryWindow::new(config.history_capacity),
            // The forming day plus every archived day.
            day_stats: BoundedHistoryWindow::new(config.history_capacity + 1),
            published: None,
            deriver,
            expected_move: ExpectedMoveEngine::new(expected_move_lookback(
                config.strategy,
                config.lookback,
            )),
            backtest: None,
            volume: RelativeVolumeAggregator::new(
                config.volume_reference_period,
                config.volume_resolution,
            ),
            daily: None,
            diagnostics: BoundedHistoryWindow::new(DIAGNOSTIC_CAPACITY),
            last_output: None,
            layout_dirty: false,
            config,
        }
    }

    /// Replaces the configured rounding with an arbitrary display rounder.
    pub fn with_rounder(mut self, rounder: Box<dyn PriceRounder + Send>) -> Self {
        self.deriver = LevelDerivationEngine::new(self.config.ladder.clone(), rounder);
        self
    }

    /// Daily series used for named-day center lookups.
    pub fn with_daily_series(mut self, daily: DailySeries) -> Self {
        self.daily = Some(daily);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn strategy(&self) -> RangeSelectionStrategy {
        self.strategy
    }

    pub fn advance(&mut self, bar: &OhlcvBar) -> Option<BarOutput> {
        if let Err(err) = bar.validate() {
            self.record(Some(bar.timestamp), err);
            return None;
        }

        let tick = match self.session.on_bar(bar.timestamp) {
            Ok(tick) => tick,
            Err(err) => {
                self.record(Some(bar.timestamp), err);
                return None;
            }
        };

        let levels_changed = if tick.is_new_day {
            self.roll_day(tick.trading_day, bar)
        } else {
            self.accumulator = self.accumulator.take().map(|acc| acc.advance(bar));
            false
        };

        let volume = self
            .volume
            .on_bar(bar.time_of_day(), bar.volume, tick.is_new_day);

        let expected = self.expected_move.last().filter(|s| s.is_valid());
        let backtest = self.backtest.filter(|b| b.total_days > 0);

        let output = BarOutput {
            timestamp: bar.timestamp,
            trading_day: tick.trading_day,
            is_new_day: tick.is_new_day,
            levels_changed,
            expected_high: expected.map(|s| s.expected_high),
            expected_low: expected.map(|s| s.expected_low),
            relative_volume: volume.relative_volume,
            cumulated_ratio: volume.cumulated_ratio,
            high_success_rate: backtest.map(|b| b.high_success_rate()),
            low_success_rate: backtest.map(|b| b.low_success_rate()),
        };
        self.last_output = Some(output.clone());
        Some(output)
    }

    fn roll_day(&mut self, day: NaiveDate, bar: &OhlcvBar) -> bool {
        if let Some(acc) = self.accumulator.take() {
            let record = acc.archive();
            tracing::debug!(day = %record.date, high = record.high, low = record.low, "archived day");
            self.history.archive(record);
        }
        self.accumulator = Some(DayAccumulator::start(day, bar));

        let history = self.history.to_vec();
        let expected_move = self.expected_move.compute(&history, bar.open);
        let backtest = evaluate_backtest(&history, self.config.lookback);
        self.backtest = Some(backtest);

        let evicted = self.day_stats.archive(DayStats {
            day,
            levels: None,
            expected_move,
            backtest: Some(backtest),
        });
        if let Some(evicted) = evicted {
            if self.published.as_ref().is_some_and(|p| p.day == evicted.day) {
                self.published = None;
            }
        }

        self.refresh_levels(&history, day, bar.open, Some(bar.timestamp))
    }

    /// Recomputes the forming day's level set. Failures keep whatever was
    /// published before.
    fn refresh_levels(
        &mut self,
        history: &[DayRecord],
        day: NaiveDate,
        today_open: f64,
        timestamp: Option<NaiveDateTime>,
    ) -> bool {
        let precomputed = match self.strategy {
            RangeSelectionStrategy::ExpectedMove { lookback }
                if lookback == self.expected_move.lookback() =>
            {
                self.expected_move.last()
            }
            _ => None,
        };
        let ctx = RangeContext {
            history,
            today: Some(day),
            today_open,
            daily: self.daily.as_ref(),
            expected_move: precomputed,
        };

        let derived = self
            .strategy
            .select(&ctx)
            .and_then(|anchors| self.deriver.derive(&anchors));

        match derived {
            Ok(levels) => {
                tracing::debug!(%day, q1 = levels.anchors().q1(), q4 = levels.anchors().q4(), "levels derived");
                if let Some(stats) = self.day_stats.latest_mut().filter(|s| s.day == day) {
                    stats.levels = Some(levels.clone());
                }
                self.published = Some(PublishedLevels { day, levels });
                self.layout_dirty = true;
                true
            }
            Err(err) => {
                self.record(timestamp, err);
                false
            }
        }
    }

    /// Swaps the range strategy (a manual-parameter change) and recomputes the
    /// forming day's levels. Returns whether a new level set was published.
    /// The expected-move series follows the lookback of an expected-move
    /// strategy, and the configured lookback otherwise.
    pub fn set_strategy(&mut self, strategy: RangeSelectionStrategy) -> bool {
        self.strategy = strategy;
        let lookback = expected_move_lookback(strategy, self.config.lookback);
        let forming = self.accumulator.as_ref().map(|a| (a.date(), a.open()));
        let history = self.history.to_vec();

        if lookback != self.expected_move.lookback() {
            self.expected_move = ExpectedMoveEngine::new(lookback);
            if let Some((day, open)) = forming {
                let stats = self.expected_move.compute(&history, open);
                if let Some(current) = self.day_stats.latest_mut().filter(|s| s.day == day) {
                    current.expected_move = stats;
                }
            }
        }

        let Some((day, open)) = forming else {
            return false;
        };
        self.refresh_levels(&history, day, open, None)
    }

    fn record(&mut self, timestamp: Option<NaiveDateTime>, error: EngineError) {
        if error.is_deferral() {
            tracing::debug!(?timestamp, %error, "deferred");
        } else {
            tracing::warn!(?timestamp, %error, "rejected");
        }
        self.diagnostics.archive(Diagnostic { timestamp, error });
    }

    pub fn current_day(&self) -> Option<&DayAccumulator> {
        self.accumulator.as_ref()
    }

    pub fn current_levels(&self) -> Option<&PublishedLevels> {
        self.published.as_ref()
    }

    pub fn display_levels(&self) -> Vec<Level> {
        self.published
            .as_ref()
            .map(|p| self.deriver.display(&p.levels))
            .unwrap_or_default()
    }

    pub fn expected_move(&self) -> Option<ExpectedMoveStats> {
        self.expected_move.last()
    }

    pub fn backtest(&self) -> Option<BacktestResult> {
        self.backtest
    }

    pub fn history(&self) -> &BoundedHistoryWindow<DayRecord> {
        &self.history
    }

    pub fn diagnostics(&self) -> &BoundedHistoryWindow<Diagnostic> {
        &self.diagnostics
    }

    pub fn ladder(&self) -> &Ladder {
        self.deriver.ladder()
    }

    /// Reads and clears the recompute-layout flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.layout_dirty)
    }

    /// Per-day rows for every day still held, oldest first.
    pub fn level_rows(&self) -> Vec<DayLevelsRow> {
        self.day_stats
            .iter()
            .map(|stats| DayLevelsRow {
                day: stats.day,
                anchors: stats.levels.as_ref().map(|l| *l.anchors()),
                levels: stats
                    .levels
                    .as_ref()
                    .map(|l| self.deriver.display(l))
                    .unwrap_or_default(),
                expected_move: stats.expected_move,
                backtest: stats.backtest,
            })
            .collect()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            current_day: self.accumulator.clone(),
            levels: self.published.clone(),
            display_levels: self.display_levels(),
            expected_move: self.expected_move.last(),
            backtest: self.backtest,
            last_output: self.last_output.clone(),
            layout_dirty: self.layout_dirty,
        }
    }

    /// Teardown: drops the forming day, every window and all cached results.
    pub fn reset(&mut self) {
        self.accumulator = None;
        self.history.clear();
        self.day_stats.clear();
        self.published = None;
        self.expected_move.clear();
        self.backtest = None;
        self.volume.clear();
        self.session.reset();
        self.diagnostics.clear();
        self.last_output = None;
        self.layout_dirty = false;
    }
}

fn expected_move_lookback(strategy: RangeSelectionStrategy, configured: usize) -> usize {
    match strategy {
        RangeSelectionStrategy::ExpectedMove { lookback } => lookback,
        _ => configured,
    }
}

/// One engine behind one lock. The producer calls [`advance`](Self::advance);
/// readers take [`snapshot`](Self::snapshot) copies and render without the lock.
#[derive(Debug, Clone)]
pub struct SharedLevelEngine {
    inner: Arc<Mutex<LevelEngine>>,
}

impl SharedLevelEngine {
    pub fn new(engine: LevelEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LevelEngine> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn advance(&self, bar: &OhlcvBar) -> Option<BarOutput> {
        self.lock().advance(bar)
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.lock().snapshot()
    }

    pub fn set_strategy(&self, strategy: RangeSelectionStrategy) -> bool {
        self.lock().set_strategy(strategy)
    }

    pub fn take_dirty(&self) -> bool {
        self.lock().take_dirty()
    }

    pub fn reset(&self) {
        self.lock().reset()
    }

    pub fn with_engine<R>(&self, f: impl FnOnce(&mut LevelEngine) -> R) -> R {
        f(&mut self.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::range_selection::ManualCenter;
    use crate::ports::calendar_port::CalendarError;
    use approx::assert_relative_eq;

    struct CalendarDay;

    impl SessionCalendar for CalendarDay {
        fn trading_day_of(&self, timestamp: NaiveDateTime) -> Result<NaiveDate, CalendarError> {
            Ok(timestamp.date())
        }
    }

    fn engine(config: EngineConfig) -> LevelEngine {
        LevelEngine::new(config, Box::new(CalendarDay))
    }

    fn bar(d: u32, h: u32, open: f64, high: f64, low: f64, close: f64) -> OhlcvBar {
        OhlcvBar {
            timestamp: NaiveDate::from_ymd_opt(2024, 6, d)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap(),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    /// Two bars per day; the day's extremes are `high` and `low`.
    fn feed_day(engine: &mut LevelEngine, d: u32, open: f64, high: f64, low: f64, close: f64) {
        engine.advance(&bar(d, 9, open, high, open.min(close), open));
        engine.advance(&bar(d, 15, open, open.max(close), low, close));
    }

    #[test]
    fn first_day_has_no_levels() {
        let mut engine = engine(EngineConfig::default());
        let out = engine.advance(&bar(3, 9, 100.0, 101.0, 99.0, 100.5)).unwrap();
        assert!(out.is_new_day);
        assert!(!out.levels_changed);
        assert!(engine.current_levels().is_none());
        assert!(engine.diagnostics().latest().unwrap().error.is_deferral());
    }

    #[test]
    fn day_roll_derives_levels_from_prior_day() {
        let mut engine = engine(EngineConfig::default());
        feed_day(&mut engine, 3, 102.0, 110.0, 100.0, 105.0);
        let out = engine.advance(&bar(4, 9, 105.0, 106.0, 104.0, 105.5)).unwrap();

        assert!(out.is_new_day);
        assert!(out.levels_changed);
        let published = engine.current_levels().unwrap();
        assert_eq!(published.day, NaiveDate::from_ymd_opt(2024, 6, 4).unwrap());
        assert_relative_eq!(published.levels.get("TCH").unwrap(), 108.75);
        assert_relative_eq!(published.levels.get("D1-").unwrap(), 95.0);
        assert!(engine.take_dirty());
        assert!(!engine.take_dirty());
    }

    #[test]
    fn intraday_bars_extend_current_day() {
        let mut engine = engine(EngineConfig::default());
        engine.advance(&bar(3, 9, 100.0, 101.0, 99.0, 100.5));
        let out = engine.advance(&bar(3, 10, 100.5, 104.0, 100.0, 103.0)).unwrap();
        assert!(!out.is_new_day);

        let day = engine.current_day().unwrap();
        assert_relative_eq!(day.high(), 104.0);
        assert_relative_eq!(day.low(), 99.0);
        assert_relative_eq!(day.close(), 103.0);
        assert_eq!(day.bar_count(), 2);
    }

    #[test]
    fn invalid_bar_is_skipped_without_mutation() {
        let mut engine = engine(EngineConfig::default());
        engine.advance(&bar(3, 9, 100.0, 101.0, 99.0, 100.5));
        let before = engine.snapshot();

        assert!(engine.advance(&bar(3, 10, f64::NAN, 101.0, 99.0, 100.0)).is_none());
        assert!(engine.advance(&bar(4, 10, 100.0, 99.0, 101.0, 100.0)).is_none());

        assert_eq!(engine.snapshot(), before);
        assert!(matches!(
            engine.diagnostics().latest().unwrap().error,
            EngineError::InvalidNumericValue { .. }
        ));
    }

    #[test]
    fn out_of_order_day_rejected() {
        let mut engine = engine(EngineConfig::default());
        feed_day(&mut engine, 5, 100.0, 101.0, 99.0, 100.0);
        assert!(engine.advance(&bar(4, 9, 100.0, 101.0, 99.0, 100.0)).is_none());
        assert!(engine.history().is_empty());
        assert!(matches!(
            engine.diagnostics().latest().unwrap().error,
            EngineError::OutOfOrder { .. }
        ));
    }

    #[test]
    fn invalid_anchors_keep_previous_levels() {
        let mut engine = engine(EngineConfig::default());
        feed_day(&mut engine, 3, 102.0, 110.0, 100.0, 105.0);
        engine.advance(&bar(4, 9, 105.0, 106.0, 104.0, 105.5));
        let before = engine.current_levels().cloned().unwrap();
        engine.take_dirty();

        let changed = engine.set_strategy(RangeSelectionStrategy::Manual {
            q1: 100.0,
            q4: 110.0,
            center: ManualCenter::Midpoint,
        });

        assert!(!changed);
        assert_eq!(engine.current_levels(), Some(&before));
        assert!(!engine.take_dirty());
        assert!(matches!(
            engine.diagnostics().latest().unwrap().error,
            EngineError::InvalidRange { .. }
        ));
    }

    #[test]
    fn set_strategy_recomputes_forming_day() {
        let mut engine = engine(EngineConfig::default());
        feed_day(&mut engine, 3, 102.0, 110.0, 100.0, 105.0);
        engine.advance(&bar(4, 9, 105.0, 106.0, 104.0, 105.5));

        let changed = engine.set_strategy(RangeSelectionStrategy::Manual {
            q1: 120.0,
            q4: 100.0,
            center: ManualCenter::Midpoint,
        });
        assert!(changed);
        let levels = &engine.current_levels().unwrap().levels;
        assert_relative_eq!(levels.anchors().range(), 20.0);
        assert_relative_eq!(levels.get("NR2").unwrap(), 110.0);

        let rows = engine.level_rows();
        let today = rows.last().unwrap();
        assert_relative_eq!(today.anchors.unwrap().q1(), 120.0);
    }

    #[test]
    fn n_day_mode_waits_for_window() {
        let config = EngineConfig {
            strategy: RangeSelectionStrategy::NDay { days: 3 },
            ..EngineConfig::default()
        };
        let mut engine = engine(config);
        feed_day(&mut engine, 3, 100.0, 105.0, 98.0, 101.0);
        feed_day(&mut engine, 4, 101.0, 107.0, 99.0, 102.0);
        feed_day(&mut engine, 5, 102.0, 104.0, 96.0, 103.0);
        assert!(engine.current_levels().is_none());

        engine.advance(&bar(6, 9, 103.0, 104.0, 102.0, 103.5));
        let levels = &engine.current_levels().unwrap().levels;
        assert_relative_eq!(levels.anchors().q1(), 107.0);
        assert_relative_eq!(levels.anchors().q4(), 96.0);
    }

    #[test]
    fn expected_move_mode_and_series() {
        let config = EngineConfig {
            strategy: RangeSelectionStrategy::ExpectedMove { lookback: 3 },
            lookback: 3,
            ..EngineConfig::default()
        };
        let mut engine = engine(config);
        feed_day(&mut engine, 3, 100.0, 104.0, 100.0, 103.0);
        feed_day(&mut engine, 4, 100.0, 106.0, 100.0, 103.0);
        feed_day(&mut engine, 5, 100.0, 108.0, 100.0, 103.0);

        let out = engine.advance(&bar(6, 9, 100.0, 100.5, 99.5, 100.2)).unwrap();
        assert_relative_eq!(out.expected_high.unwrap(), 104.092, epsilon = 1e-9);
        assert_relative_eq!(out.expected_low.unwrap(), 100.0);

        let levels = &engine.current_levels().unwrap().levels;
        assert_relative_eq!(levels.anchors().nr2(), 100.0);
        assert!(out.high_success_rate.is_some());
    }

    #[test]
    fn expected_move_strategy_lookback_drives_series() {
        let mut engine = engine(EngineConfig::default());
        feed_day(&mut engine, 3, 100.0, 110.0, 100.0, 103.0);
        feed_day(&mut engine, 4, 100.0, 104.0, 100.0, 103.0);
        engine.advance(&bar(5, 9, 100.0, 100.5, 99.5, 100.2));
        assert_eq!(engine.expected_move().unwrap().day_count(), 2);

        assert!(engine.set_strategy(RangeSelectionStrategy::ExpectedMove { lookback: 1 }));
        let stats = engine.expected_move().unwrap();
        assert_eq!(stats.day_count(), 1);
        assert_relative_eq!(stats.bullish_average_range, 4.0);

        let anchors = *engine.current_levels().unwrap().levels.anchors();
        assert_relative_eq!(anchors.q1(), stats.expected_high);
        assert_relative_eq!(anchors.q4(), stats.expected_low);

        let out = engine.advance(&bar(5, 10, 100.2, 100.6, 99.8, 100.4)).unwrap();
        assert_relative_eq!(out.expected_high.unwrap(), stats.expected_high);
        assert_relative_eq!(
            engine.level_rows().last().unwrap().expected_move.unwrap().expected_high,
            stats.expected_high
        );

        engine.set_strategy(RangeSelectionStrategy::SingleDay);
        assert_eq!(engine.expected_move().unwrap().day_count(), 2);
    }

    #[test]
    fn history_capacity_bounds_archive() {
        let config = EngineConfig {
            history_capacity: 3,
            ..EngineConfig::default()
        };
        let mut engine = engine(config);
        for d in 1..=5 {
            feed_day(&mut engine, d, 100.0, 101.0, 99.0, 100.0);
        }
        let days: Vec<u32> = engine
            .history()
            .iter()
            .map(|r| chrono::Datelike::day(&r.date))
            .collect();
        assert_eq!(days, vec![2, 3, 4]);
        assert_eq!(engine.level_rows().len(), 4);
    }

    #[test]
    fn relative_volume_flows_through() {
        let mut engine = engine(EngineConfig::default());
        engine.advance(&bar(3, 9, 100.0, 101.0, 99.0, 100.0));
        let out = engine.advance(&bar(4, 9, 100.0, 101.0, 99.0, 100.0)).unwrap();
        assert_relative_eq!(out.relative_volume.unwrap(), 100.0);
        assert_relative_eq!(out.cumulated_ratio.unwrap(), 100.0);
    }

    #[test]
    fn reset_clears_everything() {
        let mut engine = engine(EngineConfig::default());
        feed_day(&mut engine, 3, 102.0, 110.0, 100.0, 105.0);
        engine.advance(&bar(4, 9, 105.0, 106.0, 104.0, 105.5));
        engine.reset();

        assert!(engine.current_day().is_none());
        assert!(engine.current_levels().is_none());
        assert!(engine.history().is_empty());
        assert!(engine.level_rows().is_empty());
        assert!(engine.diagnostics().is_empty());
        assert!(engine.advance(&bar(1, 9, 100.0, 101.0, 99.0, 100.0)).unwrap().is_new_day);
    }

    #[test]
    fn closure_rounder_applies_to_display_only() {
        let mut engine = engine(EngineConfig::default()).with_rounder(Box::new(|p: f64| p.round()));
        feed_day(&mut engine, 3, 102.0, 110.0, 100.0, 105.0);
        engine.advance(&bar(4, 9, 105.0, 106.0, 104.0, 105.5));

        let display = engine.display_levels();
        let tch = display.iter().find(|l| l.name == "TCH").unwrap();
        assert_relative_eq!(tch.value, 109.0);
        assert_relative_eq!(engine.current_levels().unwrap().levels.get("TCH").unwrap(), 108.75);
    }

    #[test]
    fn shared_engine_snapshots_across_threads() {
        let shared = SharedLevelEngine::new(engine(EngineConfig::default()));
        let producer = shared.clone();

        let handle = std::thread::spawn(move || {
            for d in 1..=10 {
                producer.advance(&bar(d, 9, 100.0, 102.0, 98.0, 101.0));
                producer.advance(&bar(d, 15, 101.0, 103.0, 99.0, 100.0));
            }
        });
        let _ = shared.snapshot();
        handle.join().unwrap();

        let snapshot = shared.snapshot();
        assert!(snapshot.levels.is_some());
        assert_eq!(snapshot.display_levels.len(), Ladder::standard().len());
        assert_eq!(shared.with_engine(|e| e.history().len()), 9);

        shared.reset();
        assert!(shared.snapshot().levels.is_none());
    }
}
