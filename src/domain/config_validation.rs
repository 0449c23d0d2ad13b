//! Configuration resolution.
//!
//! Turns the INI surface into an [`EngineConfig`]. Nothing here fails: every
//! out-of-range number is clamped and every unusable value falls back to its
//! default, with one `Configuration` diagnostic per adjustment.

use crate::domain::engine::{
    DEFAULT_HISTORY_CAPACITY, DEFAULT_LOOKBACK, DEFAULT_REFERENCE_PERIOD, EngineConfig,
};
use crate::domain::error::EngineError;
use crate::domain::ladder::{Ladder, LadderProfile, LevelDefinition};
use crate::domain::levels::{DEFAULT_TICK_SIZE, RoundingKind, RoundingMode};
use crate::domain::range_selection::{DEFAULT_CENTER_HORIZON, ManualCenter, RangeSelectionStrategy};
use crate::domain::relative_volume::VolumeResolution;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::str::FromStr;

pub const MIN_BOUND: i64 = 1;
pub const MAX_BOUND: i64 = 1000;
pub const DEFAULT_N_DAYS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub config: EngineConfig,
    pub diagnostics: Vec<EngineError>,
}

impl ResolvedConfig {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

pub fn build_engine_config(config: &dyn ConfigPort) -> ResolvedConfig {
    let mut diagnostics = Vec::new();

    let mut history_capacity = bounded(
        config,
        "engine",
        "history_capacity",
        DEFAULT_HISTORY_CAPACITY,
        &mut diagnostics,
    );
    let lookback = bounded(config, "engine", "lookback", DEFAULT_LOOKBACK, &mut diagnostics);

    let strategy = resolve_strategy(config, lookback, &mut diagnostics);
    let required = strategy.required_history();
    if required > history_capacity {
        diagnostics.push(EngineError::configuration(
            "history_capacity",
            format!("raised from {history_capacity} to {required} to hold the n-day window"),
        ));
        history_capacity = required;
    }

    let ladder = resolve_ladder(config, &mut diagnostics);
    let rounding = resolve_rounding(config, &mut diagnostics);

    let volume_reference_period = bounded(
        config,
        "volume",
        "reference_period",
        DEFAULT_REFERENCE_PERIOD,
        &mut diagnostics,
    );
    let volume_resolution = parse_or_default(config, "volume", "resolution", &mut diagnostics);

    for diagnostic in &diagnostics {
        tracing::warn!(%diagnostic, "configuration adjusted");
    }

    ResolvedConfig {
        config: EngineConfig {
            history_capacity,
            strategy,
            lookback,
            ladder,
            rounding,
            volume_reference_period,
            volume_resolution,
        },
        diagnostics,
    }
}

/// Integer clamped to `MIN_BOUND..=MAX_BOUND`. Unparseable values use `default`.
fn bounded(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
    diagnostics: &mut Vec<EngineError>,
) -> usize {
    let Some(raw) = config.get_string(section, key) else {
        return default;
    };
    let value = match raw.trim().parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            diagnostics.push(EngineError::configuration(
                key,
                format!("'{raw}' is not an integer, using {default}"),
            ));
            return default;
        }
    };
    let clamped = value.clamp(MIN_BOUND, MAX_BOUND);
    if clamped != value {
        diagnostics.push(EngineError::configuration(
            key,
            format!("{value} clamped to {clamped}"),
        ));
    }
    clamped as usize
}

fn parse_or_default<T>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    diagnostics: &mut Vec<EngineError>,
) -> T
where
    T: FromStr<Err = EngineError> + Default,
{
    match config.get_string(section, key) {
        None => T::default(),
        Some(raw) => raw.parse().unwrap_or_else(|err| {
            diagnostics.push(err);
            T::default()
        }),
    }
}

/// Positive finite price, or `None` when absent or unusable.
fn price(
    config: &dyn ConfigPort,
    key: &str,
    diagnostics: &mut Vec<EngineError>,
) -> Option<f64> {
    let raw = config.get_string("engine", key)?;
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Some(v),
        _ => {
            diagnostics.push(EngineError::configuration(
                key,
                format!("'{raw}' is not a positive price"),
            ));
            None
        }
    }
}

fn resolve_strategy(
    config: &dyn ConfigPort,
    lookback: usize,
    diagnostics: &mut Vec<EngineError>,
) -> RangeSelectionStrategy {
    let mode = config
        .get_string("engine", "range_mode")
        .map(|m| m.trim().to_lowercase())
        .unwrap_or_else(|| "single_day".to_string());

    match mode.as_str() {
        "single_day" => RangeSelectionStrategy::SingleDay,
        "n_day" => RangeSelectionStrategy::NDay {
            days: bounded(config, "engine", "n_days", DEFAULT_N_DAYS, diagnostics),
        },
        "expected_move" => RangeSelectionStrategy::ExpectedMove { lookback },
        "manual" => resolve_manual(config, diagnostics),
        "manual_center" => match price(config, "manual_center", diagnostics) {
            Some(center) => RangeSelectionStrategy::ManualCenter { center },
            None => fall_back(diagnostics, "manual_center requires manual_center"),
        },
        other => {
            diagnostics.push(EngineError::configuration(
                "range_mode",
                format!("unknown range mode '{other}', using single_day"),
            ));
            RangeSelectionStrategy::SingleDay
        }
    }
}

fn resolve_manual(
    config: &dyn ConfigPort,
    diagnostics: &mut Vec<EngineError>,
) -> RangeSelectionStrategy {
    let q1 = price(config, "manual_q1", diagnostics);
    let q4 = price(config, "manual_q4", diagnostics);
    let (Some(mut q1), Some(mut q4)) = (q1, q4) else {
        return fall_back(diagnostics, "manual mode requires manual_q1 and manual_q4");
    };

    if q1 == q4 {
        return fall_back(diagnostics, "manual_q1 equals manual_q4");
    }
    if q1 < q4 {
        diagnostics.push(EngineError::configuration(
            "manual_q1",
            format!("manual_q1 {q1} below manual_q4 {q4}, swapped"),
        ));
        std::mem::swap(&mut q1, &mut q4);
    }

    let center = match config.get_string("engine", "center_date") {
        None => ManualCenter::Midpoint,
        Some(raw) => match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
            Ok(date) => ManualCenter::OpenOf {
                date,
                horizon: bounded(
                    config,
                    "engine",
                    "center_horizon",
                    DEFAULT_CENTER_HORIZON,
                    diagnostics,
                ),
            },
            Err(_) => {
                diagnostics.push(EngineError::configuration(
                    "center_date",
                    format!("'{raw}' is not YYYY-MM-DD, using midpoint"),
                ));
                ManualCenter::Midpoint
            }
        },
    };

    RangeSelectionStrategy::Manual { q1, q4, center }
}

fn fall_back(diagnostics: &mut Vec<EngineError>, reason: &str) -> RangeSelectionStrategy {
    diagnostics.push(EngineError::configuration(
        "range_mode",
        format!("{reason}, using single_day"),
    ));
    RangeSelectionStrategy::SingleDay
}

/// A non-empty `[ladder]` section replaces the profile. Bad entries are
/// dropped; a section with no usable entry falls back to the profile.
fn resolve_ladder(config: &dyn ConfigPort, diagnostics: &mut Vec<EngineError>) -> Ladder {
    let profile: LadderProfile = parse_or_default(config, "levels", "profile", diagnostics);

    let entries = config.get_section("ladder");
    if entries.is_empty() {
        return Ladder::from_profile(profile);
    }

    let mut levels = Vec::with_capacity(entries.len());
    for (name, value) in &entries {
        match LevelDefinition::parse(name, value) {
            Ok(level) => levels.push(level),
            Err(err) => diagnostics.push(err),
        }
    }

    if levels.is_empty() {
        diagnostics.push(EngineError::configuration(
            "ladder",
            format!("no usable entries, using {} profile", profile.name()),
        ));
        return Ladder::from_profile(profile);
    }
    Ladder::new("custom", levels)
}

fn resolve_rounding(config: &dyn ConfigPort, diagnostics: &mut Vec<EngineError>) -> RoundingMode {
    let kind: RoundingKind = parse_or_default(config, "levels", "rounding", diagnostics);
    let Some(raw) = config.get_string("levels", "tick_size") else {
        return RoundingMode::new(kind, DEFAULT_TICK_SIZE);
    };
    match raw.trim().parse::<f64>() {
        Ok(tick_size) if tick_size.is_finite() && tick_size > 0.0 => {
            RoundingMode::new(kind, tick_size)
        }
        _ => {
            diagnostics.push(EngineError::configuration(
                "tick_size",
                format!("'{raw}' is not a positive number, using {DEFAULT_TICK_SIZE}"),
            ));
            RoundingMode::new(kind, DEFAULT_TICK_SIZE)
        }
    }
}
