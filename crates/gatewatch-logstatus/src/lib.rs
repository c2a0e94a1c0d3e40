//! GateWatch Log Status - derives gateway health from the gateway's own logs
//!
//! The monitored gateway application writes two date-rotated, line-oriented
//! log files per day: a system log (lifecycle events, heartbeats, worker
//! thread creation) and an error log (database connection failures,
//! reconnect outcomes, worker thread errors). This crate turns today's pair
//! of files into a structured [`GatewayStatus`] snapshot and tracks
//! connectivity state edges across snapshots.

mod parser;
mod patterns;
mod tracker;
mod window;

pub use parser::{heartbeat_stale, LogStatusParser};
pub use patterns::{classify, parse_line_time, LogEvent, ThreadKind};
pub use tracker::{DbTransition, LogStatusTracker};
pub use window::{is_gateway_process, parse_window_title};

pub use gatewatch_core::GatewayStatus;
