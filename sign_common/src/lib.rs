//! Pieces shared by the serving binary and the offline pipeline tools.

pub mod artifact;
pub mod config;
pub mod store;
pub mod telemetry;
