//! Percentage ladders.
//!
//! A ladder is an ordered list of named offsets. Each entry picks an anchor
//! (Q1, Q4 or NR2), a direction and a fraction of the range. Ladders are
//! configuration profiles; two built-ins ship with the crate and a custom one
//! can be read from the `[ladder]` section of the config file.

use crate::domain::anchors::RangeAnchors;
use crate::domain::error::EngineError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnchorRef {
    Q1,
    Q4,
    Nr2,
}

impl AnchorRef {
    pub fn price(&self, anchors: &RangeAnchors) -> f64 {
        match self {
            AnchorRef::Q1 => anchors.q1(),
            AnchorRef::Q4 => anchors.q4(),
            AnchorRef::Nr2 => anchors.nr2(),
        }
    }
}

impl fmt::Display for AnchorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorRef::Q1 => write!(f, "Q1"),
            AnchorRef::Q4 => write!(f, "Q4"),
            AnchorRef::Nr2 => write!(f, "NR2"),
        }
    }
}

impl FromStr for AnchorRef {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "Q1" => Ok(AnchorRef::Q1),
            "Q4" => Ok(AnchorRef::Q4),
            "NR2" => Ok(AnchorRef::Nr2),
            other => Err(EngineError::configuration(
                "ladder",
                format!("unknown anchor '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Plus,
    Minus,
}

impl Sign {
    pub fn factor(&self) -> f64 {
        match self {
            Sign::Plus => 1.0,
            Sign::Minus => -1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelDefinition {
    pub name: String,
    pub anchor: AnchorRef,
    pub pct: f64,
    pub sign: Sign,
}

impl LevelDefinition {
    pub fn new(name: &str, anchor: AnchorRef, sign: Sign, pct: f64) -> Self {
        Self {
            name: name.to_string(),
            anchor,
            pct,
            sign,
        }
    }

    /// anchor ± pct × range
    pub fn value(&self, anchors: &RangeAnchors) -> f64 {
        self.anchor.price(anchors) + self.sign.factor() * self.pct * anchors.range()
    }

    /// Parses a `[ladder]` entry of the form `ANCHOR,SIGN,PCT`, e.g. `Q1,-,0.125`.
    pub fn parse(name: &str, value: &str) -> Result<Self, EngineError> {
        let parts: Vec<&str> = value.split(',').map(str::trim).collect();
        let [anchor, sign, pct] = parts.as_slice() else {
            return Err(EngineError::configuration(
                "ladder",
                format!("{name}: expected ANCHOR,SIGN,PCT"),
            ));
        };
        let anchor: AnchorRef = anchor.parse()?;
        let sign = match *sign {
            "+" => Sign::Plus,
            "-" => Sign::Minus,
            other => {
                return Err(EngineError::configuration(
                    "ladder",
                    format!("{name}: sign must be + or -, got '{other}'"),
                ));
            }
        };
        let pct: f64 = pct.parse().map_err(|_| {
            EngineError::configuration("ladder", format!("{name}: invalid percentage '{pct}'"))
        })?;
        if !(0.0..=1.0).contains(&pct) {
            return Err(EngineError::configuration(
                "ladder",
                format!("{name}: percentage {pct} outside [0, 1]"),
            ));
        }
        Ok(Self::new(name, anchor, sign, pct))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LadderProfile {
    #[default]
    Standard,
    Alternate,
}

impl LadderProfile {
    pub fn name(&self) -> &'static str {
        match self {
            LadderProfile::Standard => "standard",
            LadderProfile::Alternate => "alternate",
        }
    }
}

impl FromStr for LadderProfile {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(LadderProfile::Standard),
            "alternate" => Ok(LadderProfile::Alternate),
            other => Err(EngineError::configuration(
                "profile",
                format!("unknown ladder profile '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ladder {
    name: String,
    levels: Vec<LevelDefinition>,
}

impl Ladder {
    pub fn new(name: &str, levels: Vec<LevelDefinition>) -> Self {
        Self {
            name: name.to_string(),
            levels,
        }
    }

    pub fn from_profile(profile: LadderProfile) -> Self {
        match profile {
            LadderProfile::Standard => Self::build(profile.name(), [0.125, 0.159, 0.25, 0.375]),
            LadderProfile::Alternate => Self::build(profile.name(), [0.0855, 0.171, 0.342, 0.513]),
        }
    }

    pub fn standard() -> Self {
        Self::from_profile(LadderProfile::Standard)
    }

    /// `steps` are the first through fourth rungs; the trigger/target zones use
    /// the first two, quartiles and the daily extension are fixed.
    fn build(name: &str, steps: [f64; 4]) -> Self {
        use AnchorRef::{Nr2, Q1, Q4};
        use Sign::{Minus, Plus};

        let [s1, s2, s3, s4] = steps;
        let levels = vec![
            LevelDefinition::new("Q1", Q1, Plus, 0.0),
            LevelDefinition::new("NR2", Nr2, Plus, 0.0),
            LevelDefinition::new("Q4", Q4, Plus, 0.0),
            LevelDefinition::new("TCH", Q1, Minus, s1),
            LevelDefinition::new("TCL", Q1, Minus, s2),
            LevelDefinition::new("TVH", Q4, Plus, s2),
            LevelDefinition::new("TVL", Q4, Plus, s1),
            LevelDefinition::new("Z2H", Nr2, Plus, s2),
            LevelDefinition::new("Z2L", Nr2, Plus, s1),
            LevelDefinition::new("Z3H", Nr2, Minus, s1),
            LevelDefinition::new("Z3L", Nr2, Minus, s2),
            LevelDefinition::new("Std1+", Q1, Plus, s1),
            LevelDefinition::new("Std2+", Q1, Plus, s2),
            LevelDefinition::new("Std3+", Q1, Plus, s3),
            LevelDefinition::new("Std4+", Q1, Plus, s4),
            LevelDefinition::new("Std1-", Q4, Minus, s1),
            LevelDefinition::new("Std2-", Q4, Minus, s2),
            LevelDefinition::new("Std3-", Q4, Minus, s3),
            LevelDefinition::new("Std4-", Q4, Minus, s4),
            LevelDefinition::new("Q2", Q1, Minus, 0.25),
            LevelDefinition::new("Q3", Q4, Plus, 0.25),
            LevelDefinition::new("D1+", Q1, Plus, 0.5),
            LevelDefinition::new("D1-", Q4, Minus, 0.5),
        ];
        Self::new(name, levels)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn levels(&self) -> &[LevelDefinition] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.levels.iter().map(|l| l.name.as_str())
    }
}

impl Default for Ladder {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(ladder: &'a Ladder, name: &str) -> &'a LevelDefinition {
        ladder.levels().iter().find(|l| l.name == name).unwrap()
    }

    #[test]
    fn standard_ladder_shape() {
        let ladder = Ladder::standard();
        assert_eq!(ladder.name(), "standard");
        assert_eq!(ladder.len(), 23);

        let tcl = find(&ladder, "TCL");
        assert_eq!(tcl.anchor, AnchorRef::Q1);
        assert_eq!(tcl.sign, Sign::Minus);
        assert!((tcl.pct - 0.159).abs() < f64::EPSILON);

        let std4 = find(&ladder, "Std4-");
        assert_eq!(std4.anchor, AnchorRef::Q4);
        assert!((std4.pct - 0.375).abs() < f64::EPSILON);
    }

    #[test]
    fn alternate_ladder_same_names() {
        let standard = Ladder::standard();
        let alternate = Ladder::from_profile(LadderProfile::Alternate);
        assert_eq!(
            standard.names().collect::<Vec<_>>(),
            alternate.names().collect::<Vec<_>>()
        );
        assert!((find(&alternate, "TCH").pct - 0.0855).abs() < f64::EPSILON);
        assert!((find(&alternate, "Std3+").pct - 0.342).abs() < f64::EPSILON);
        assert!((find(&alternate, "D1+").pct - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_entry() {
        let def = LevelDefinition::parse("X1", "nr2, +, 0.2").unwrap();
        assert_eq!(def.anchor, AnchorRef::Nr2);
        assert_eq!(def.sign, Sign::Plus);
        assert!((def.pct - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_entry_rejects_bad_input() {
        assert!(LevelDefinition::parse("X", "Q1,-").is_err());
        assert!(LevelDefinition::parse("X", "Q9,-,0.1").is_err());
        assert!(LevelDefinition::parse("X", "Q1,*,0.1").is_err());
        assert!(LevelDefinition::parse("X", "Q1,-,abc").is_err());
        assert!(LevelDefinition::parse("X", "Q1,-,1.5").is_err());
    }

    #[test]
    fn profile_from_str() {
        assert_eq!("Alternate".parse::<LadderProfile>().unwrap(), LadderProfile::Alternate);
        assert!("fib".parse::<LadderProfile>().is_err());
    }

    #[test]
    fn anchor_display_round_trips() {
        for anchor in [AnchorRef::Q1, AnchorRef::Q4, AnchorRef::Nr2] {
            assert_eq!(anchor.to_string().parse::<AnchorRef>().unwrap(), anchor);
        }
    }
}
