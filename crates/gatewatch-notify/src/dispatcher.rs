//! Alert fan-out from the engine's bounded queue to delivery sinks.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use gatewatch_core::Alert;

use crate::AlertSink;

/// Non-blocking sending side of the alert queue, held by the engine.
#[derive(Clone)]
pub struct AlertSender {
    tx: mpsc::Sender<Alert>,
}

impl AlertSender {
    /// Queue an alert without waiting. Alerts are advisory, so when the
    /// queue is full the alert is dropped and the drop is logged.
    pub fn send(&self, alert: Alert) {
        if let Err(e) = self.tx.try_send(alert) {
            warn!(error = %e, "alert queue full, dropping alert");
        }
    }
}

/// Bounded alert queue of the given depth.
pub fn alert_channel(depth: usize) -> (AlertSender, mpsc::Receiver<Alert>) {
    let (tx, rx) = mpsc::channel(depth);
    (AlertSender { tx }, rx)
}

/// Fans alerts out to every configured sink.
#[derive(Default)]
pub struct AlertDispatcher {
    sinks: Vec<Arc<dyn AlertSink>>,
}

impl AlertDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink(&mut self, sink: Arc<dyn AlertSink>) {
        self.sinks.push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Deliver one alert to every sink. A failing sink is logged and the
    /// rest still receive the alert.
    pub async fn dispatch(&self, alert: &Alert) {
        for sink in &self.sinks {
            if let Err(e) = sink.deliver(alert).await {
                warn!(
                    sink = sink.name(),
                    kind = alert.kind.as_str(),
                    error = %e,
                    "alert delivery failed"
                );
            }
        }
    }

    /// Drain the queue until the sending side closes.
    pub async fn run(self, mut rx: mpsc::Receiver<Alert>) {
        while let Some(alert) = rx.recv().await {
            debug!(
                kind = alert.kind.as_str(),
                process = %alert.process_name,
                "dispatching alert"
            );
            self.dispatch(&alert).await;
        }
        debug!("alert queue closed, dispatcher stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSink;
    use gatewatch_core::AlertKind;

    fn cpu_alert(value: f64) -> Alert {
        Alert::new(
            "LISGateway.exe",
            AlertKind::Cpu,
            format!("CPU usage {:.1}%", value),
            value,
            Some(80.0),
        )
    }

    #[tokio::test]
    async fn test_dispatch_reaches_all_sinks() {
        let first = Arc::new(MockSink::new());
        let second = Arc::new(MockSink::new());
        let mut dispatcher = AlertDispatcher::new();
        dispatcher.add_sink(first.clone());
        dispatcher.add_sink(second.clone());

        dispatcher.dispatch(&cpu_alert(93.0)).await;
        assert_eq!(first.call_count(), 1);
        assert_eq!(second.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_block_others() {
        let failing = Arc::new(MockSink::failing());
        let healthy = Arc::new(MockSink::new());
        let mut dispatcher = AlertDispatcher::new();
        dispatcher.add_sink(failing.clone());
        dispatcher.add_sink(healthy.clone());

        dispatcher.dispatch(&cpu_alert(93.0)).await;
        assert_eq!(healthy.call_count(), 1);
        assert!(healthy.was_kind_delivered(AlertKind::Cpu).await);
    }

    #[tokio::test]
    async fn test_run_drains_queue_until_close() {
        let sink = Arc::new(MockSink::new());
        let mut dispatcher = AlertDispatcher::new();
        dispatcher.add_sink(sink.clone());

        let (sender, rx) = alert_channel(8);
        let task = tokio::spawn(dispatcher.run(rx));

        sender.send(cpu_alert(85.0));
        sender.send(cpu_alert(99.0));
        drop(sender);

        task.await.unwrap();
        assert_eq!(sink.call_count(), 2);
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let (sender, rx) = alert_channel(1);
        sender.send(cpu_alert(85.0));
        // Queue depth is 1, this one is dropped.
        sender.send(cpu_alert(99.0));

        let sink = Arc::new(MockSink::new());
        let mut dispatcher = AlertDispatcher::new();
        dispatcher.add_sink(sink.clone());
        drop(sender);
        dispatcher.run(rx).await;

        assert_eq!(sink.call_count(), 1);
        let delivered = sink.alerts().await;
        assert_eq!(delivered[0].value, 85.0);
    }
}
