//! Core domain types and logic.

pub mod ohlcv;
pub mod day;
pub mod history;
pub mod session;
pub mod daily_series;
pub mod anchors;
pub mod range_selection;
pub mod expected_move;
pub mod ladder;
pub mod levels;
pub mod backtest;
pub mod relative_volume;
pub mod engine;
pub mod config_validation;
pub mod error;
