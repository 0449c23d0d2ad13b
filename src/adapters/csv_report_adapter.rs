//! CSV report adapter implementing ReportPort.
//!
//! Two outputs: one row per trading day with the anchors, statistics and one
//! column per ladder entry, and one row per bar with the scalar series.
//! Unset values are written as empty cells.

use std::fs::File;
use std::path::Path;

use crate::domain::engine::{BarOutput, DayLevelsRow};
use crate::domain::error::DaylevelsError;
use crate::ports::report_port::ReportPort;

const LEVEL_FIXED_COLUMNS: [&str; 9] = [
    "day",
    "q1",
    "q4",
    "nr2",
    "range",
    "expected_high",
    "expected_low",
    "high_success_rate",
    "low_success_rate",
];

const SERIES_COLUMNS: [&str; 10] = [
    "timestamp",
    "trading_day",
    "is_new_day",
    "levels_changed",
    "expected_high",
    "expected_low",
    "relative_volume",
    "cumulated_ratio",
    "high_success_rate",
    "low_success_rate",
];

pub struct CsvReportAdapter {
    level_names: Vec<String>,
}

impl CsvReportAdapter {
    /// `level_names` fixes the level columns, usually the ladder's names.
    pub fn new(level_names: Vec<String>) -> Self {
        Self { level_names }
    }

    fn writer(output_path: &str) -> Result<csv::Writer<File>, DaylevelsError> {
        if let Some(parent) = Path::new(output_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        csv::Writer::from_path(output_path).map_err(report_error)
    }
}

fn report_error(e: csv::Error) -> DaylevelsError {
    DaylevelsError::Report {
        reason: e.to_string(),
    }
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl ReportPort for CsvReportAdapter {
    fn write_levels(&self, rows: &[DayLevelsRow], output_path: &str) -> Result<(), DaylevelsError> {
        let mut wtr = Self::writer(output_path)?;

        let header: Vec<&str> = LEVEL_FIXED_COLUMNS
            .iter()
            .copied()
            .chain(self.level_names.iter().map(String::as_str))
            .collect();
        wtr.write_record(&header).map_err(report_error)?;

        for row in rows {
            let expected = row.expected_move.filter(|s| s.is_valid());
            let backtest = row.backtest.filter(|b| b.total_days > 0);

            let mut record = vec![
                row.day.to_string(),
                cell(row.anchors.map(|a| a.q1())),
                cell(row.anchors.map(|a| a.q4())),
                cell(row.anchors.map(|a| a.nr2())),
                cell(row.anchors.map(|a| a.range())),
                cell(expected.map(|s| s.expected_high)),
                cell(expected.map(|s| s.expected_low)),
                cell(backtest.map(|b| b.high_success_rate())),
                cell(backtest.map(|b| b.low_success_rate())),
            ];
            record.extend(self.level_names.iter().map(|name| {
                cell(row.levels.iter().find(|l| &l.name == name).map(|l| l.value))
            }));
            wtr.write_record(&record).map_err(report_error)?;
        }

        wtr.flush()?;
        tracing::info!(path = output_path, rows = rows.len(), "levels report written");
        Ok(())
    }

    fn write_series(&self, series: &[BarOutput], output_path: &str) -> Result<(), DaylevelsError> {
        let mut wtr = Self::writer(output_path)?;
        wtr.write_record(SERIES_COLUMNS).map_err(report_error)?;

        for out in series {
            wtr.write_record([
                out.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                out.trading_day.to_string(),
                out.is_new_day.to_string(),
                out.levels_changed.to_string(),
                cell(out.expected_high),
                cell(out.expected_low),
                cell(out.relative_volume),
                cell(out.cumulated_ratio),
                cell(out.high_success_rate),
                cell(out.low_success_rate),
            ])
            .map_err(report_error)?;
        }

        wtr.flush()?;
        tracing::info!(path = output_path, rows = series.len(), "series report written");
        Ok(())
    }
}
