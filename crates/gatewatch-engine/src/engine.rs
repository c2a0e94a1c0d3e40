//! The monitoring engine.
//!
//! One [`ProcessMonitorEngine`] owns everything derived from a tick: the
//! monitored-process table, per-process metric history, current snapshots,
//! the alert ring, and one log-status tracker per gateway process. All state
//! sits behind its own lock so ticks can run on a blocking thread while
//! other threads read snapshots.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::time::{Duration, Instant};

use chrono::Local;
use parking_lot::{Mutex, RwLock};
use sysinfo::{Pid, System};
use tracing::{debug, info, warn};

use gatewatch_core::constants::{
    DEFAULT_ALERT_HISTORY, RESTART_KILL_GRACE_SECS, SPAWN_SETTLE_SECS,
};
use gatewatch_core::{
    Alert, AlertKind, AlertSettings, DbKey, Error, MetricSample, MonitorConfig, MonitoredProcess,
    ProcessState, ProcessStatusSnapshot, Result, Thresholds, WindowInfo,
};
use gatewatch_logstatus::{
    is_gateway_process, parse_window_title, DbTransition, LogStatusParser, LogStatusTracker,
};
use gatewatch_metrics::{kill_all_by_name, spawn_detached, window_title_for_pid, MetricsCollector};
use gatewatch_notify::AlertSender;
use gatewatch_store::NameListStore;

use crate::stopgate::StopTracker;

/// Outcome of an explicit stop/start/restart request.
#[derive(Debug, Clone)]
pub struct OpResult {
    pub success: bool,
    pub message: String,
}

impl OpResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

struct Registered {
    info: MonitoredProcess,
    is_gateway: bool,
    window_title: Option<String>,
    window_info: Option<WindowInfo>,
}

/// Registers processes by name, samples them every tick, and raises alerts
/// for threshold breaches, down periods, and gateway database transitions.
pub struct ProcessMonitorEngine {
    config: RwLock<MonitorConfig>,
    collector: Mutex<MetricsCollector>,
    monitored: RwLock<HashMap<String, Registered>>,
    history: RwLock<HashMap<String, VecDeque<MetricSample>>>,
    snapshots: RwLock<HashMap<String, ProcessStatusSnapshot>>,
    alerts: RwLock<VecDeque<Alert>>,
    trackers: Mutex<HashMap<String, LogStatusTracker>>,
    stop_gate: Mutex<StopTracker>,
    alert_tx: Option<AlertSender>,
    name_store: NameListStore,
    hostname: Option<String>,
}

impl ProcessMonitorEngine {
    pub fn new(
        config: MonitorConfig,
        name_store: NameListStore,
        alert_tx: Option<AlertSender>,
    ) -> Self {
        Self {
            config: RwLock::new(config),
            collector: Mutex::new(MetricsCollector::new()),
            monitored: RwLock::new(HashMap::new()),
            history: RwLock::new(HashMap::new()),
            snapshots: RwLock::new(HashMap::new()),
            alerts: RwLock::new(VecDeque::new()),
            trackers: Mutex::new(HashMap::new()),
            stop_gate: Mutex::new(StopTracker::new()),
            alert_tx,
            name_store,
            hostname: System::host_name(),
        }
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    pub fn config(&self) -> MonitorConfig {
        self.config.read().clone()
    }

    pub fn set_thresholds(&self, thresholds: Thresholds) {
        let snapshot = {
            let mut config = self.config.write();
            config.thresholds = thresholds;
            config.clone()
        };
        self.persist_config(&snapshot);
    }

    pub fn set_alert_settings(&self, settings: AlertSettings) {
        let snapshot = {
            let mut config = self.config.write();
            config.alerts = settings;
            config.clone()
        };
        self.persist_config(&snapshot);
    }

    fn persist_config(&self, config: &MonitorConfig) {
        // In-memory settings stay authoritative when the save fails.
        if let Err(e) = config.save() {
            warn!(error = %e, "failed to persist monitor config");
        }
    }

    /// Re-register every name persisted from a previous run. Names whose
    /// process is not currently running are left unregistered; a later
    /// explicit add or scheduled start brings them back.
    pub fn restore_persisted(&self) -> usize {
        let names = self.name_store.load();
        let mut restored = 0;
        for name in &names {
            // Never write the store back while loading it: a name whose
            // process is down at startup must survive for a later start.
            if self.add_with_persist(name, false) {
                restored += 1;
            } else {
                warn!(name, "persisted process not running, skipped");
            }
        }
        restored
    }

    /// Register a process by name. The first process whose name matches
    /// case-insensitively is monitored. Returns false when no such process
    /// is running.
    pub fn add(&self, name: &str) -> bool {
        self.add_with_persist(name, true)
    }

    fn add_with_persist(&self, name: &str, persist: bool) -> bool {
        let found = {
            let mut collector = self.collector.lock();
            collector.system_mut().refresh_processes();
            collector.find_process(name)
        };
        let found = match found {
            Some(found) => found,
            None => {
                debug!(name, "no running process with that name");
                return false;
            }
        };

        let window_title = window_title_for_pid(found.pid);
        let window_info = window_title.as_deref().and_then(parse_window_title);
        let is_gateway = is_gateway_process(&found.name, window_title.as_deref());

        if is_gateway {
            let config = self.config.read();
            let parser =
                LogStatusParser::new(config.gateway_log_dir(), config.heartbeat_timeout_secs);
            self.trackers
                .lock()
                .entry(name.to_string())
                .or_insert_with(|| LogStatusTracker::new(parser));
        }

        info!(name, pid = found.pid, is_gateway, "registered process");
        self.monitored.write().insert(
            name.to_string(),
            Registered {
                info: MonitoredProcess {
                    name: name.to_string(),
                    pid: found.pid,
                    create_time: found.create_time,
                    registered_at: Local::now(),
                },
                is_gateway,
                window_title,
                window_info,
            },
        );
        if persist {
            self.persist_names();
        }
        true
    }

    /// Deregister a process. When a pid is given it must match the monitored
    /// one, so a stale caller cannot remove a process that was re-registered
    /// under a new pid.
    pub fn remove(&self, name: &str, pid: Option<u32>) -> Result<MonitoredProcess> {
        let registered = {
            let mut monitored = self.monitored.write();
            let entry = monitored
                .get(name)
                .ok_or_else(|| Error::ProcessNotMonitored(name.to_string()))?;
            if let Some(requested) = pid {
                if requested != entry.info.pid {
                    return Err(Error::PidMismatch {
                        name: name.to_string(),
                        monitored: entry.info.pid,
                        requested,
                    });
                }
            }
            monitored
                .remove(name)
                .ok_or_else(|| Error::ProcessNotMonitored(name.to_string()))?
        };

        self.history.write().remove(name);
        self.snapshots.write().remove(name);
        self.trackers.lock().remove(name);
        self.stop_gate.lock().clear(name);
        self.collector.lock().forget(registered.info.pid);
        self.persist_names();
        info!(name, pid = registered.info.pid, "deregistered process");
        Ok(registered.info)
    }

    pub fn monitored(&self) -> Vec<MonitoredProcess> {
        let mut list: Vec<MonitoredProcess> = self
            .monitored
            .read()
            .values()
            .map(|r| r.info.clone())
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    pub fn is_monitored(&self, name: &str) -> bool {
        self.monitored.read().contains_key(name)
    }

    /// Metric history for one process, oldest first.
    pub fn history(&self, name: &str) -> Vec<MetricSample> {
        self.history
            .read()
            .get(name)
            .map(|d| d.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn snapshot(&self, name: &str) -> Option<ProcessStatusSnapshot> {
        self.snapshots.read().get(name).cloned()
    }

    pub fn snapshots(&self) -> HashMap<String, ProcessStatusSnapshot> {
        self.snapshots.read().clone()
    }

    /// Recent alerts, oldest first.
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.read().iter().cloned().collect()
    }

    /// The `limit` most recent alerts, oldest of them first.
    pub fn recent_alerts(&self, limit: usize) -> Vec<Alert> {
        let alerts = self.alerts.read();
        let skip = alerts.len().saturating_sub(limit);
        alerts.iter().skip(skip).cloned().collect()
    }

    /// Log-derived gateway status from the last tick, if the process is a
    /// gateway.
    pub fn gateway_status(&self, name: &str) -> Option<gatewatch_core::GatewayStatus> {
        self.snapshots
            .read()
            .get(name)
            .and_then(|s| s.gateway.clone())
    }

    /// Whether the named process is a gateway with live worker threads.
    /// Non-gateway processes are never busy.
    pub fn is_busy(&self, name: &str) -> bool {
        self.trackers
            .lock()
            .get(name)
            .map(|t| t.is_busy(name))
            .unwrap_or(false)
    }

    /// Whether any process with the name is currently running, monitored or
    /// not.
    pub fn is_running(&self, name: &str) -> bool {
        let mut collector = self.collector.lock();
        collector.system_mut().refresh_processes();
        collector.find_process(name).is_some()
    }

    /// One monitoring tick over all registered processes. Blocks for the CPU
    /// sample interval; run it on a blocking thread.
    pub fn refresh_all(&self) {
        self.collector.lock().refresh();
        let names: Vec<String> = self.monitored.read().keys().cloned().collect();
        for name in names {
            self.refresh_one(&name);
        }
    }

    fn refresh_one(&self, name: &str) {
        let (mut pid, mut create_time, is_gateway) = match self.monitored.read().get(name) {
            Some(r) => (r.info.pid, r.info.create_time, r.is_gateway),
            None => return,
        };

        let (thresholds, settings, history_len) = {
            let config = self.config.read();
            (
                config.thresholds,
                config.alerts.clone(),
                config.history_length,
            )
        };

        let mut alive = self.collector.lock().is_alive(pid, create_time);
        if !alive {
            // The process may have been restarted under a new pid.
            let found = self.collector.lock().find_process(name);
            if let Some(found) = found {
                info!(name, old_pid = pid, new_pid = found.pid, "re-acquired process");
                if let Some(reg) = self.monitored.write().get_mut(name) {
                    reg.info.pid = found.pid;
                    reg.info.create_time = found.create_time;
                }
                self.collector.lock().forget(pid);
                pid = found.pid;
                create_time = found.create_time;
                alive = true;
            }
        }

        if !alive {
            self.snapshots
                .write()
                .insert(name.to_string(), ProcessStatusSnapshot::stopped(name, pid));
            self.record_sample(name, MetricSample::not_running(name, pid), history_len);
            if settings.process_stopped_enabled {
                let fire = self.stop_gate.lock().observe_stopped(
                    name,
                    Instant::now(),
                    settings.stopped_wait(),
                );
                if fire {
                    let wait = settings.stopped_wait().as_secs();
                    self.push_alert(Alert::new(
                        name,
                        AlertKind::ProcessStopped,
                        format!("{} has been down for at least {}s", name, wait),
                        0.0,
                        None,
                    ));
                }
            }
            return;
        }

        if self.stop_gate.lock().observe_running(name) {
            self.push_alert(Alert::new(
                name,
                AlertKind::ProcessStarted,
                format!("{} is running again", name),
                0.0,
                None,
            ));
        }

        let sample = self.collector.lock().sample(name, pid);

        for alert in threshold_alerts(&sample, &thresholds, &settings) {
            self.push_alert(alert);
        }

        let (window_title, window_info) = {
            let fresh_title = window_title_for_pid(pid);
            let mut monitored = self.monitored.write();
            match monitored.get_mut(name) {
                Some(reg) => {
                    if fresh_title.is_some() {
                        reg.window_info = fresh_title.as_deref().and_then(parse_window_title);
                        reg.window_title = fresh_title;
                    }
                    (reg.window_title.clone(), reg.window_info.clone())
                }
                None => (None, None),
            }
        };

        let gateway = if is_gateway {
            let checked = {
                let mut trackers = self.trackers.lock();
                trackers.get_mut(name).map(|t| t.check(name))
            };
            checked.map(|(status, transitions)| {
                for transition in &transitions {
                    let mut alert = db_transition_alert(name, transition);
                    if let Some(info) = &window_info {
                        alert = alert.with_hospital(info);
                    }
                    self.push_alert(alert);
                }
                status
            })
        } else {
            None
        };

        let uptime_secs = (Local::now().timestamp().max(0) as u64).saturating_sub(create_time);
        let snapshot = ProcessStatusSnapshot {
            state: ProcessState::Running,
            sample: sample.clone(),
            uptime: format_uptime(uptime_secs),
            uptime_secs,
            window_title,
            window_info,
            gateway,
        };
        self.snapshots.write().insert(name.to_string(), snapshot);
        self.record_sample(name, sample, history_len);
    }

    /// Kill the monitored process by pid.
    pub fn stop_process(&self, name: &str) -> Result<OpResult> {
        let pid = self
            .monitored
            .read()
            .get(name)
            .map(|r| r.info.pid)
            .ok_or_else(|| Error::ProcessNotMonitored(name.to_string()))?;

        let mut collector = self.collector.lock();
        collector.system_mut().refresh_processes();
        match collector.system().process(Pid::from_u32(pid)) {
            Some(process) => {
                if process.kill() {
                    info!(name, pid, "stopped process");
                    Ok(OpResult::ok(format!("{} (pid {}) stopped", name, pid)))
                } else {
                    Err(Error::AccessDenied(name.to_string()))
                }
            }
            None => Err(Error::ProcessNotRunning(name.to_string())),
        }
    }

    /// Spawn the executable unless a process with the name is already
    /// running, then register it.
    pub fn start_process(&self, name: &str, program_path: &Path) -> Result<OpResult> {
        if self.is_running(name) {
            return Ok(OpResult::fail(format!("{} is already running", name)));
        }

        spawn_detached(program_path)?;
        std::thread::sleep(Duration::from_secs(SPAWN_SETTLE_SECS));
        if self.add(name) {
            Ok(OpResult::ok(format!("{} started and registered", name)))
        } else {
            Ok(OpResult::fail(format!(
                "{} was spawned but is not running",
                name
            )))
        }
    }

    /// Kill every instance of the name, then start it fresh if a program
    /// path is known.
    pub fn restart_process(&self, name: &str, program_path: Option<&Path>) -> Result<OpResult> {
        let killed = {
            let mut collector = self.collector.lock();
            kill_all_by_name(collector.system_mut(), name)
        };
        if killed > 0 {
            std::thread::sleep(Duration::from_secs(RESTART_KILL_GRACE_SECS));
        }

        match program_path {
            Some(path) => {
                spawn_detached(path)?;
                std::thread::sleep(Duration::from_secs(SPAWN_SETTLE_SECS));
                let registered = self.add(name);
                Ok(OpResult::ok(format!(
                    "{} restarted, {} old instance(s) stopped, registered={}",
                    name, killed, registered
                )))
            }
            None => Ok(OpResult::fail(format!(
                "no program path for {}, {} instance(s) stopped",
                name, killed
            ))),
        }
    }

    fn record_sample(&self, name: &str, sample: MetricSample, capacity: usize) {
        let mut history = self.history.write();
        let deque = history.entry(name.to_string()).or_default();
        while deque.len() >= capacity && !deque.is_empty() {
            deque.pop_front();
        }
        if capacity > 0 {
            deque.push_back(sample);
        }
    }

    fn push_alert(&self, alert: Alert) {
        let alert = if alert.hostname.is_none() {
            alert.with_hostname(self.hostname.clone())
        } else {
            alert
        };
        info!(
            kind = alert.kind.as_str(),
            process = %alert.process_name,
            "{}",
            alert.message
        );
        {
            let mut alerts = self.alerts.write();
            while alerts.len() >= DEFAULT_ALERT_HISTORY {
                alerts.pop_front();
            }
            alerts.push_back(alert.clone());
        }
        if let Some(tx) = &self.alert_tx {
            tx.send(alert);
        }
    }

    fn persist_names(&self) {
        let mut names: Vec<String> = self.monitored.read().keys().cloned().collect();
        names.sort();
        if let Err(e) = self.name_store.save(&names) {
            warn!(error = %e, "failed to persist monitored list");
        }
    }
}

/// Threshold evaluation for one sample. Every breaching tick produces an
/// alert; suppression is left to delivery channels.
fn threshold_alerts(
    sample: &MetricSample,
    thresholds: &Thresholds,
    settings: &AlertSettings,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if settings.cpu_enabled && sample.cpu_percent > thresholds.cpu_percent {
        alerts.push(Alert::new(
            &sample.name,
            AlertKind::Cpu,
            format!(
                "CPU usage {:.1}% exceeds {:.1}%",
                sample.cpu_percent, thresholds.cpu_percent
            ),
            sample.cpu_percent,
            Some(thresholds.cpu_percent),
        ));
    }

    if settings.ram_enabled && sample.memory_percent > thresholds.ram_percent {
        alerts.push(Alert::new(
            &sample.name,
            AlertKind::Ram,
            format!(
                "RAM usage {:.1}% exceeds {:.1}%",
                sample.memory_percent, thresholds.ram_percent
            ),
            sample.memory_percent,
            Some(thresholds.ram_percent),
        ));
    }

    let disk_total = sample.disk_read_mb_s + sample.disk_write_mb_s;
    if settings.disk_io_enabled && disk_total > thresholds.disk_io_mb_s {
        alerts.push(Alert::new(
            &sample.name,
            AlertKind::DiskIo,
            format!(
                "Disk I/O {:.2} MB/s exceeds {:.2} MB/s",
                disk_total, thresholds.disk_io_mb_s
            ),
            disk_total,
            Some(thresholds.disk_io_mb_s),
        ));
    }

    let net_total = sample.net_sent_mb_s + sample.net_recv_mb_s;
    if settings.network_enabled && net_total > thresholds.network_mb_s {
        alerts.push(Alert::new(
            &sample.name,
            AlertKind::Network,
            format!(
                "Network I/O {:.2} MB/s exceeds {:.2} MB/s",
                net_total, thresholds.network_mb_s
            ),
            net_total,
            Some(thresholds.network_mb_s),
        ));
    }

    alerts
}

fn db_transition_alert(process_name: &str, transition: &DbTransition) -> Alert {
    let kind = match (transition.key, transition.connected) {
        (DbKey::HisDb, false) => AlertKind::HisDbDisconnected,
        (DbKey::HisDb, true) => AlertKind::HisDbReconnected,
        (DbKey::GatewayDb, false) => AlertKind::GatewayDbDisconnected,
        (DbKey::GatewayDb, true) => AlertKind::GatewayDbReconnected,
    };
    let mut message = if transition.connected {
        format!("{} connection restored", transition.key.as_str())
    } else {
        transition
            .last_error
            .clone()
            .unwrap_or_else(|| "Connection lost".to_string())
    };
    if let Some(host) = &transition.host {
        message.push_str(&format!(" (host {})", host));
    }
    Alert::new(process_name, kind, message, 0.0, None)
}

fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    let seconds = secs % 60;
    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
