//! Structured-log delivery channel.

use async_trait::async_trait;
use tracing::{error, warn};

use gatewatch_core::{Alert, Result};

use crate::AlertSink;

/// Writes every alert to the tracing log. Disconnects are errors, everything
/// else is a warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AlertSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, alert: &Alert) -> Result<()> {
        if alert.kind.is_disconnect() {
            error!(
                kind = alert.kind.as_str(),
                process = %alert.process_name,
                value = alert.value,
                hospital = alert.hospital_name.as_deref().unwrap_or("-"),
                "{}",
                alert.message
            );
        } else {
            warn!(
                kind = alert.kind.as_str(),
                process = %alert.process_name,
                value = alert.value,
                threshold = alert.threshold.unwrap_or(0.0),
                "{}",
                alert.message
            );
        }
        Ok(())
    }
}
