//! GateWatch Metrics - Process discovery and resource sampling
//!
//! Wraps `sysinfo` into a [`MetricsCollector`] that finds processes by name,
//! tracks pid liveness, and turns raw counters into per-tick CPU, memory,
//! disk, and network figures. Also carries the low-level kill/spawn helpers
//! the remediation side uses.

pub mod collector;
pub mod ops;
pub mod rate;

pub use collector::{FoundProcess, MetricsCollector};
pub use ops::{kill_all_by_name, spawn_detached, window_title_for_pid};
pub use rate::{PidRates, RateTracker};
