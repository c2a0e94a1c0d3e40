//! GateWatch Engine - Process monitoring and alerting
//!
//! Ties the collector, log-status tracker, stores, and alert channel into
//! one [`ProcessMonitorEngine`] driven by a periodic tick.

mod engine;
mod stopgate;

pub use engine::{OpResult, ProcessMonitorEngine};
pub use stopgate::StopTracker;
