//! Mock sink for testing

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use gatewatch_core::{Alert, AlertKind, Error, Result};

use crate::AlertSink;

/// Records every delivered alert.
#[derive(Default)]
pub struct MockSink {
    alerts: Arc<Mutex<Vec<Alert>>>,
    call_count: AtomicUsize,
    should_fail: bool,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that always fails delivery
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub async fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().await.clone()
    }

    pub async fn was_kind_delivered(&self, kind: AlertKind) -> bool {
        self.alerts.lock().await.iter().any(|a| a.kind == kind)
    }
}

#[async_trait]
impl AlertSink for MockSink {
    fn name(&self) -> &str {
        "mock"
    }

    async fn deliver(&self, alert: &Alert) -> Result<()> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(Error::store("mock delivery failure"));
        }
        self.alerts.lock().await.push(alert.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_sink_records_alerts() {
        let sink = MockSink::new();
        let alert = Alert::new("gw", AlertKind::Ram, "RAM usage 91.0%", 91.0, Some(80.0));
        sink.deliver(&alert).await.unwrap();

        assert_eq!(sink.call_count(), 1);
        assert!(sink.was_kind_delivered(AlertKind::Ram).await);
        assert!(!sink.was_kind_delivered(AlertKind::Cpu).await);
    }

    #[tokio::test]
    async fn test_mock_sink_failing() {
        let sink = MockSink::failing();
        let alert = Alert::new("gw", AlertKind::Cpu, "x", 1.0, None);
        assert!(sink.deliver(&alert).await.is_err());
        assert_eq!(sink.call_count(), 1);
    }
}
