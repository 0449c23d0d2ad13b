//! Level derivation.
//!
//! value(level) = anchor(level) + sign × pct × range
//!
//! Values are kept unrounded; rounding to the instrument's price increment is
//! a display concern handled through [`PriceRounder`].

use crate::domain::anchors::RangeAnchors;
use crate::domain::error::EngineError;
use crate::domain::ladder::Ladder;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_TICK_SIZE: f64 = 0.25;

pub trait PriceRounder {
    fn round_price(&self, price: f64) -> f64;
}

impl<F: Fn(f64) -> f64> PriceRounder for F {
    fn round_price(&self, price: f64) -> f64 {
        self(price)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundingKind {
    None,
    Ceil,
    #[default]
    Nearest,
}

impl FromStr for RoundingKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(RoundingKind::None),
            "ceil" | "ceiling" => Ok(RoundingKind::Ceil),
            "nearest" | "round" => Ok(RoundingKind::Nearest),
            other => Err(EngineError::configuration(
                "rounding",
                format!("unknown rounding mode '{other}'"),
            )),
        }
    }
}

impl fmt::Display for RoundingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundingKind::None => write!(f, "none"),
            RoundingKind::Ceil => write!(f, "ceil"),
            RoundingKind::Nearest => write!(f, "nearest"),
        }
    }
}

/// Rounds to a multiple of `tick_size`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundingMode {
    pub kind: RoundingKind,
    pub tick_size: f64,
}

impl RoundingMode {
    pub fn new(kind: RoundingKind, tick_size: f64) -> Self {
        Self { kind, tick_size }
    }
}

impl Default for RoundingMode {
    fn default() -> Self {
        Self::new(RoundingKind::default(), DEFAULT_TICK_SIZE)
    }
}

impl PriceRounder for RoundingMode {
    fn round_price(&self, price: f64) -> f64 {
        if self.tick_size <= 0.0 || !price.is_finite() {
            return price;
        }
        match self.kind {
            RoundingKind::None => price,
            RoundingKind::Ceil => (price / self.tick_size).ceil() * self.tick_size,
            RoundingKind::Nearest => (price / self.tick_size).round() * self.tick_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    pub name: String,
    pub value: f64,
}

/// Computed levels for one trading day, in ladder order.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSet {
    anchors: RangeAnchors,
    levels: Vec<Level>,
}

impl LevelSet {
    pub fn anchors(&self) -> &RangeAnchors {
        &self.anchors
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.levels.iter().find(|l| l.name == name).map(|l| l.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Level> {
        self.levels.iter()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Display copy; the stored values are untouched.
    pub fn rounded(&self, rounder: &dyn PriceRounder) -> Vec<Level> {
        self.levels
            .iter()
            .map(|l| Level {
                name: l.name.clone(),
                value: rounder.round_price(l.value),
            })
            .collect()
    }
}

pub struct LevelDerivationEngine {
    ladder: Ladder,
    rounder: Box<dyn PriceRounder + Send>,
}

impl fmt::Debug for LevelDerivationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LevelDerivationEngine")
            .field("ladder", &self.ladder.name())
            .finish_non_exhaustive()
    }
}

impl LevelDerivationEngine {
    pub fn new(ladder: Ladder, rounder: Box<dyn PriceRounder + Send>) -> Self {
        Self { ladder, rounder }
    }

    pub fn ladder(&self) -> &Ladder {
        &self.ladder
    }

    pub fn rounder(&self) -> &dyn PriceRounder {
        self.rounder.as_ref()
    }

    /// Evaluates every ladder entry. A non-finite result rejects the whole set.
    pub fn derive(&self, anchors: &RangeAnchors) -> Result<LevelSet, EngineError> {
        let mut levels = Vec::with_capacity(self.ladder.len());
        for def in self.ladder.levels() {
            let value = def.value(anchors);
            if !value.is_finite() {
                return Err(EngineError::invalid_value(&def.name, value));
            }
            levels.push(Level {
                name: def.name.clone(),
                value,
            });
        }
        Ok(LevelSet {
            anchors: *anchors,
            levels,
        })
    }

    pub fn display(&self, levels: &LevelSet) -> Vec<Level> {
        levels.rounded(self.rounder.as_ref())
    }
}
