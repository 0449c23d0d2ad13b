//! Report output port trait.

use crate::domain::engine::{BarOutput, DayLevelsRow};
use crate::domain::error::DaylevelsError;

/// Port for writing per-day level sets and per-bar scalar series.
pub trait ReportPort {
    fn write_levels(&self, rows: &[DayLevelsRow], output_path: &str)
    -> Result<(), DaylevelsError>;

    fn write_series(&self, series: &[BarOutput], output_path: &str)
    -> Result<(), DaylevelsError>;
}
