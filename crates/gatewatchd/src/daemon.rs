//! Daemon wiring: engine and scheduler tick loops, alert dispatch.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{error, info};

use gatewatch_core::constants::DEFAULT_ALERT_QUEUE_DEPTH;
use gatewatch_core::MonitorConfig;
use gatewatch_engine::ProcessMonitorEngine;
use gatewatch_notify::{alert_channel, AlertDispatcher, LogSink};
use gatewatch_scheduler::RemediationScheduler;
use gatewatch_store::{NameListStore, ScheduleStore};

pub struct Daemon {
    engine: Arc<ProcessMonitorEngine>,
    scheduler: Arc<RemediationScheduler>,
    shutdown_tx: broadcast::Sender<()>,
    update_interval: Duration,
    scheduler_interval: Duration,
}

impl Daemon {
    /// Build the daemon from the on-disk config and spawn the alert
    /// dispatcher. Must run inside a tokio runtime.
    pub fn new(config: MonitorConfig) -> Self {
        let (alert_tx, alert_rx) = alert_channel(DEFAULT_ALERT_QUEUE_DEPTH);

        let mut dispatcher = AlertDispatcher::new();
        dispatcher.add_sink(Arc::new(LogSink::new()));
        tokio::spawn(dispatcher.run(alert_rx));

        let update_interval = Duration::from_secs(config.update_interval_secs.max(1));
        let scheduler_interval = Duration::from_secs(config.scheduler_interval_secs.max(1));

        let engine = Arc::new(ProcessMonitorEngine::new(
            config,
            NameListStore::new(),
            Some(alert_tx),
        ));
        let scheduler = Arc::new(RemediationScheduler::new(
            ScheduleStore::restart(),
            ScheduleStore::auto_start(),
        ));
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            engine,
            scheduler,
            shutdown_tx,
            update_interval,
            scheduler_interval,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Run the two tick loops until shutdown. The monitoring tick blocks on
    /// process sampling, so each pass runs on a blocking thread.
    pub async fn run(&self) -> Result<()> {
        let restored = {
            let engine = Arc::clone(&self.engine);
            tokio::task::spawn_blocking(move || engine.restore_persisted()).await?
        };
        if restored > 0 {
            info!(restored, "restored monitored processes");
        }

        let mut monitor_tick = tokio::time::interval(self.update_interval);
        let mut scheduler_tick = tokio::time::interval(self.scheduler_interval);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                _ = monitor_tick.tick() => {
                    let engine = Arc::clone(&self.engine);
                    if let Err(e) = tokio::task::spawn_blocking(move || engine.refresh_all()).await {
                        error!(error = %e, "monitoring tick panicked");
                    }
                }
                _ = scheduler_tick.tick() => {
                    let engine = Arc::clone(&self.engine);
                    let scheduler = Arc::clone(&self.scheduler);
                    if let Err(e) =
                        tokio::task::spawn_blocking(move || scheduler.tick(&*engine)).await
                    {
                        error!(error = %e, "scheduler tick panicked");
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("shutdown requested, stopping tick loops");
                    break;
                }
            }
        }

        Ok(())
    }
}
