//! Bar feed port trait.

use crate::domain::error::DaylevelsError;
use crate::domain::ohlcv::OhlcvBar;

pub trait DataPort {
    /// Bars for `symbol`, ordered by timestamp.
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<OhlcvBar>, DaylevelsError>;

    fn list_symbols(&self) -> Result<Vec<String>, DaylevelsError>;
}
