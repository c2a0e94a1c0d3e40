//! GateWatch Notify - Alert delivery
//!
//! Alerts produced by the monitoring engine flow through a bounded channel
//! into an [`AlertDispatcher`], which fans each one out to every configured
//! [`AlertSink`]. The engine never blocks on delivery: a full queue drops the
//! alert with a warning.

mod dispatcher;
mod log_sink;
#[cfg(test)]
pub mod mock;

pub use dispatcher::{alert_channel, AlertDispatcher, AlertSender};
pub use log_sink::LogSink;

use async_trait::async_trait;

use gatewatch_core::{Alert, Result};

/// A delivery channel for alerts.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Channel name used in dispatch logging
    fn name(&self) -> &str;

    /// Deliver one alert. Failures are logged by the dispatcher and do not
    /// stop delivery to other sinks.
    async fn deliver(&self, alert: &Alert) -> Result<()>;
}
