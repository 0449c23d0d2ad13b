//! Port traits: the boundary between the calculation engine and the platform.

pub mod calendar_port;
pub mod config_port;
pub mod data_port;
pub mod report_port;
