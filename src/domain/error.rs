//! Domain error types.
//!
//! [`EngineError`] is the calculation engine's taxonomy. Every variant is
//! recovered inside the engine and recorded as a diagnostic; none crosses
//! [`crate::domain::engine::LevelEngine::advance`]. [`DaylevelsError`] is the
//! application-level error returned by adapters and the CLI.

use chrono::NaiveDate;

/// Recoverable engine conditions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("invalid range: q1 {q1} must be above q4 {q4}")]
    InvalidRange { q1: f64, q4: f64 },

    #[error("insufficient history: need {required} days, have {available}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("invalid numeric value for {field}: {value}")]
    InvalidNumericValue { field: String, value: f64 },

    #[error("calendar could not resolve trading day: {reason}")]
    CalendarResolution { reason: String },

    #[error("configuration [{key}]: {reason}")]
    Configuration { key: String, reason: String },

    #[error("trading day {day} precedes last seen day {last}")]
    OutOfOrder { day: NaiveDate, last: NaiveDate },
}

impl EngineError {
    pub fn invalid_value(field: &str, value: f64) -> Self {
        EngineError::InvalidNumericValue {
            field: field.to_string(),
            value,
        }
    }

    pub fn configuration(key: &str, reason: impl Into<String>) -> Self {
        EngineError::Configuration {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Deferred computations are expected during warmup and only logged at debug level.
    pub fn is_deferral(&self) -> bool {
        matches!(self, EngineError::InsufficientHistory { .. })
    }
}

/// Top-level error type for daylevels.
#[derive(Debug, thiserror::Error)]
pub enum DaylevelsError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&DaylevelsError> for std::process::ExitCode {
    fn from(err: &DaylevelsError) -> Self {
        let code: u8 = match err {
            DaylevelsError::Io(_) | DaylevelsError::Report { .. } => 1,
            DaylevelsError::ConfigParse { .. }
            | DaylevelsError::ConfigMissing { .. }
            | DaylevelsError::ConfigInvalid { .. } => 2,
            DaylevelsError::Data { .. } => 3,
            DaylevelsError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
