//! GateWatch Scheduler - Scheduled restarts and auto-starts
//!
//! Two schedule tables drive remediation: restart schedules kill and
//! relaunch a process on an interval or at a daily time, auto-start
//! schedules only launch it when it is not running. Both tables persist to
//! disk on every mutation and after every attempted action.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Local};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use gatewatch_core::{Result, ScheduleEntry, ScheduleSpec};
use gatewatch_engine::{OpResult, ProcessMonitorEngine};
use gatewatch_store::ScheduleStore;

/// Process actions the scheduler needs from the monitoring side. Split out
/// so ticks can be tested without touching real processes.
pub trait ProcessControl: Send + Sync {
    fn is_running(&self, name: &str) -> bool;

    /// Whether the process is a gateway with in-flight work. Busy gateways
    /// are never restarted; the schedule retries on the next tick.
    fn is_busy(&self, name: &str) -> bool;

    fn restart(&self, name: &str, program_path: Option<&Path>) -> Result<OpResult>;

    fn start(&self, name: &str, program_path: &Path) -> Result<OpResult>;
}

impl ProcessControl for ProcessMonitorEngine {
    fn is_running(&self, name: &str) -> bool {
        ProcessMonitorEngine::is_running(self, name)
    }

    fn is_busy(&self, name: &str) -> bool {
        ProcessMonitorEngine::is_busy(self, name)
    }

    fn restart(&self, name: &str, program_path: Option<&Path>) -> Result<OpResult> {
        self.restart_process(name, program_path)
    }

    fn start(&self, name: &str, program_path: &Path) -> Result<OpResult> {
        self.start_process(name, program_path)
    }
}

/// Holds both schedule tables and performs due actions on each tick.
pub struct RemediationScheduler {
    restart_store: ScheduleStore,
    auto_start_store: ScheduleStore,
    restarts: RwLock<HashMap<String, ScheduleEntry>>,
    auto_starts: RwLock<HashMap<String, ScheduleEntry>>,
}

impl RemediationScheduler {
    pub fn new(restart_store: ScheduleStore, auto_start_store: ScheduleStore) -> Self {
        let restarts = restart_store.load();
        let auto_starts = auto_start_store.load();
        if !restarts.is_empty() || !auto_starts.is_empty() {
            info!(
                restarts = restarts.len(),
                auto_starts = auto_starts.len(),
                "loaded persisted schedules"
            );
        }
        Self {
            restart_store,
            auto_start_store,
            restarts: RwLock::new(restarts),
            auto_starts: RwLock::new(auto_starts),
        }
    }

    /// Create or replace the restart schedule for a process on a host. A
    /// disabled or kind-less spec deletes the entry instead.
    pub fn set_restart_schedule(&self, entry: ScheduleEntry) {
        Self::upsert(&self.restarts, &self.restart_store, entry);
    }

    pub fn set_auto_start_schedule(&self, entry: ScheduleEntry) {
        Self::upsert(&self.auto_starts, &self.auto_start_store, entry);
    }

    fn upsert(
        table: &RwLock<HashMap<String, ScheduleEntry>>,
        store: &ScheduleStore,
        entry: ScheduleEntry,
    ) {
        let key = entry.key();
        {
            let mut entries = table.write();
            if entry.spec.is_active() {
                info!(key = %key, kind = %entry.spec.kind, "schedule set");
                entries.insert(key, entry);
            } else {
                info!(key = %key, "schedule removed");
                entries.remove(&key);
            }
        }
        Self::persist(table, store);
    }

    pub fn remove_restart_schedule(&self, process_name: &str, hostname: &str) -> bool {
        Self::remove(&self.restarts, &self.restart_store, process_name, hostname)
    }

    pub fn remove_auto_start_schedule(&self, process_name: &str, hostname: &str) -> bool {
        Self::remove(
            &self.auto_starts,
            &self.auto_start_store,
            process_name,
            hostname,
        )
    }

    fn remove(
        table: &RwLock<HashMap<String, ScheduleEntry>>,
        store: &ScheduleStore,
        process_name: &str,
        hostname: &str,
    ) -> bool {
        let key = gatewatch_core::schedule_key(process_name, hostname);
        let removed = table.write().remove(&key).is_some();
        if removed {
            Self::persist(table, store);
        }
        removed
    }

    pub fn restart_schedules(&self) -> Vec<ScheduleEntry> {
        Self::sorted(&self.restarts)
    }

    pub fn auto_start_schedules(&self) -> Vec<ScheduleEntry> {
        Self::sorted(&self.auto_starts)
    }

    fn sorted(table: &RwLock<HashMap<String, ScheduleEntry>>) -> Vec<ScheduleEntry> {
        let mut entries: Vec<ScheduleEntry> = table.read().values().cloned().collect();
        entries.sort_by(|a, b| a.key().cmp(&b.key()));
        entries
    }

    /// One scheduler pass: perform every due restart and auto-start.
    pub fn tick(&self, control: &dyn ProcessControl) {
        self.tick_at(control, Local::now());
    }

    pub fn tick_at(&self, control: &dyn ProcessControl, now: DateTime<Local>) {
        self.run_due_restarts(control, now);
        self.run_due_auto_starts(control, now);
    }

    fn run_due_restarts(&self, control: &dyn ProcessControl, now: DateTime<Local>) {
        let due: Vec<ScheduleEntry> = self
            .restarts
            .read()
            .values()
            .filter(|e| e.is_due(now))
            .cloned()
            .collect();

        for entry in due {
            if control.is_busy(&entry.process_name) {
                // Not advanced: the restart stays due and retries next tick.
                info!(
                    process = %entry.process_name,
                    "gateway busy, scheduled restart deferred"
                );
                continue;
            }

            match control.restart(&entry.process_name, entry.program_path.as_deref()) {
                Ok(outcome) if outcome.success => {
                    info!(process = %entry.process_name, "{}", outcome.message);
                }
                Ok(outcome) => {
                    warn!(process = %entry.process_name, "{}", outcome.message);
                }
                Err(e) => {
                    warn!(process = %entry.process_name, error = %e, "scheduled restart failed");
                }
            }

            self.advance(&self.restarts, &self.restart_store, &entry.key(), now);
        }
    }

    fn run_due_auto_starts(&self, control: &dyn ProcessControl, now: DateTime<Local>) {
        let due: Vec<ScheduleEntry> = self
            .auto_starts
            .read()
            .values()
            .filter(|e| e.is_due(now))
            .cloned()
            .collect();

        for entry in due {
            if control.is_running(&entry.process_name) {
                debug!(process = %entry.process_name, "already running, auto-start skipped");
            } else {
                match &entry.program_path {
                    Some(path) => match control.start(&entry.process_name, path) {
                        Ok(outcome) if outcome.success => {
                            info!(process = %entry.process_name, "{}", outcome.message);
                        }
                        Ok(outcome) => {
                            warn!(process = %entry.process_name, "{}", outcome.message);
                        }
                        Err(e) => {
                            warn!(process = %entry.process_name, error = %e, "auto-start failed");
                        }
                    },
                    None => {
                        warn!(process = %entry.process_name, "auto-start has no program path");
                    }
                }
            }

            // Auto-starts advance even when the process was already running.
            self.advance(&self.auto_starts, &self.auto_start_store, &entry.key(), now);
        }
    }

    fn advance(
        &self,
        table: &RwLock<HashMap<String, ScheduleEntry>>,
        store: &ScheduleStore,
        key: &str,
        now: DateTime<Local>,
    ) {
        if let Some(entry) = table.write().get_mut(key) {
            entry.advance(now);
        }
        Self::persist(table, store);
    }

    fn persist(table: &RwLock<HashMap<String, ScheduleEntry>>, store: &ScheduleStore) {
        let snapshot = table.read().clone();
        if let Err(e) = store.save(&snapshot) {
            warn!(error = %e, "failed to persist schedules");
        }
    }
}

/// Convenience constructor for a spec from its loose parts, as user input
/// arrives from configuration surfaces.
pub fn build_spec(
    kind: &str,
    interval_minutes: u32,
    interval_seconds: u32,
    daily_time: Option<String>,
    enabled: bool,
) -> Result<ScheduleSpec> {
    let kind = kind.parse()?;
    Ok(ScheduleSpec {
        kind,
        interval_minutes,
        interval_seconds,
        daily_time,
        enabled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use gatewatch_core::ScheduleKind;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 10, h, m, s).unwrap()
    }

    #[derive(Default)]
    struct MockControl {
        busy: HashSet<String>,
        running: HashSet<String>,
        restarts: Mutex<Vec<String>>,
        starts: Mutex<Vec<String>>,
    }

    impl ProcessControl for MockControl {
        fn is_running(&self, name: &str) -> bool {
            self.running.contains(name)
        }

        fn is_busy(&self, name: &str) -> bool {
            self.busy.contains(name)
        }

        fn restart(&self, name: &str, _program_path: Option<&Path>) -> Result<OpResult> {
            self.restarts.lock().push(name.to_string());
            Ok(OpResult {
                success: true,
                message: format!("{} restarted", name),
            })
        }

        fn start(&self, name: &str, _program_path: &Path) -> Result<OpResult> {
            self.starts.lock().push(name.to_string());
            Ok(OpResult {
                success: true,
                message: format!("{} started", name),
            })
        }
    }

    fn scheduler(dir: &TempDir) -> RemediationScheduler {
        RemediationScheduler::new(
            ScheduleStore::with_path(dir.path().join("restart_schedules.json")),
            ScheduleStore::with_path(dir.path().join("auto_start_schedules.json")),
        )
    }

    fn entry_due_at(name: &str, path: Option<&str>, due: DateTime<Local>) -> ScheduleEntry {
        let mut entry = ScheduleEntry::new(
            name,
            "host-1",
            path.map(Into::into),
            ScheduleSpec::interval(30, 0),
        );
        entry.next_action = Some(due);
        entry
    }

    #[test]
    fn test_due_restart_runs_and_advances() {
        let dir = TempDir::new().unwrap();
        let sched = scheduler(&dir);
        let control = MockControl::default();
        sched.set_restart_schedule(entry_due_at("gw", Some("/opt/gw"), at(10, 0, 0)));

        sched.tick_at(&control, at(10, 0, 5));
        assert_eq!(control.restarts.lock().as_slice(), ["gw".to_string()]);

        let entries = sched.restart_schedules();
        assert_eq!(entries[0].last_action, Some(at(10, 0, 5)));
        assert_eq!(entries[0].next_action, Some(at(10, 30, 5)));

        // Not due again immediately.
        sched.tick_at(&control, at(10, 0, 6));
        assert_eq!(control.restarts.lock().len(), 1);
    }

    #[test]
    fn test_busy_gateway_defers_without_advancing() {
        let dir = TempDir::new().unwrap();
        let sched = scheduler(&dir);
        let mut control = MockControl::default();
        control.busy.insert("gw".to_string());
        sched.set_restart_schedule(entry_due_at("gw", Some("/opt/gw"), at(10, 0, 0)));

        sched.tick_at(&control, at(10, 0, 5));
        assert!(control.restarts.lock().is_empty());
        assert_eq!(
            sched.restart_schedules()[0].next_action,
            Some(at(10, 0, 0))
        );

        // The gateway drains and the retry fires on a later tick.
        control.busy.clear();
        sched.tick_at(&control, at(10, 0, 15));
        assert_eq!(control.restarts.lock().len(), 1);
    }

    #[test]
    fn test_zero_interval_never_fires() {
        let dir = TempDir::new().unwrap();
        let sched = scheduler(&dir);
        let control = MockControl::default();
        let entry = ScheduleEntry::new(
            "gw",
            "host-1",
            Some("/opt/gw".into()),
            ScheduleSpec::interval(0, 0),
        );
        assert!(entry.next_action.is_none());
        sched.set_restart_schedule(entry);

        sched.tick_at(&control, at(23, 59, 59));
        assert!(control.restarts.lock().is_empty());
    }

    #[test]
    fn test_disabled_spec_deletes_entry() {
        let dir = TempDir::new().unwrap();
        let sched = scheduler(&dir);
        sched.set_restart_schedule(entry_due_at("gw", Some("/opt/gw"), at(10, 0, 0)));
        assert_eq!(sched.restart_schedules().len(), 1);

        let mut spec = ScheduleSpec::interval(30, 0);
        spec.enabled = false;
        sched.set_restart_schedule(ScheduleEntry::new("gw", "host-1", None, spec));
        assert!(sched.restart_schedules().is_empty());
    }

    #[test]
    fn test_auto_start_skips_running_but_advances() {
        let dir = TempDir::new().unwrap();
        let sched = scheduler(&dir);
        let mut control = MockControl::default();
        control.running.insert("gw".to_string());
        sched.set_auto_start_schedule(entry_due_at("gw", Some("/opt/gw"), at(10, 0, 0)));

        sched.tick_at(&control, at(10, 0, 5));
        assert!(control.starts.lock().is_empty());
        assert_eq!(
            sched.auto_start_schedules()[0].next_action,
            Some(at(10, 30, 5))
        );
    }

    #[test]
    fn test_auto_start_launches_stopped_process() {
        let dir = TempDir::new().unwrap();
        let sched = scheduler(&dir);
        let control = MockControl::default();
        sched.set_auto_start_schedule(entry_due_at("gw", Some("/opt/gw"), at(10, 0, 0)));

        sched.tick_at(&control, at(10, 0, 5));
        assert_eq!(control.starts.lock().as_slice(), ["gw".to_string()]);
    }

    #[test]
    fn test_schedules_persist_across_instances() {
        let dir = TempDir::new().unwrap();
        {
            let sched = scheduler(&dir);
            sched.set_restart_schedule(entry_due_at("gw", Some("/opt/gw"), at(10, 0, 0)));
        }
        let reloaded = scheduler(&dir);
        let entries = reloaded.restart_schedules();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].process_name, "gw");
        assert_eq!(entries[0].hostname, "host-1");
    }

    #[test]
    fn test_daily_schedule_advances_to_next_day() {
        let dir = TempDir::new().unwrap();
        let sched = scheduler(&dir);
        let control = MockControl::default();
        let mut entry = ScheduleEntry::new(
            "gw",
            "host-1",
            Some("/opt/gw".into()),
            ScheduleSpec::daily("03:00"),
        );
        entry.next_action = Some(at(3, 0, 0));
        sched.set_restart_schedule(entry);

        sched.tick_at(&control, at(3, 0, 9));
        assert_eq!(control.restarts.lock().len(), 1);
        let next = sched.restart_schedules()[0].next_action.unwrap();
        assert_eq!(next, Local.with_ymd_and_hms(2024, 5, 11, 3, 0, 0).unwrap());
    }

    #[test]
    fn test_build_spec_rejects_unknown_kind() {
        assert!(build_spec("hourly", 0, 0, None, true).is_err());
        let spec = build_spec("interval", 15, 30, None, true).unwrap();
        assert_eq!(spec.kind, ScheduleKind::Interval);
        assert_eq!(spec.total_interval_secs(), 930);
    }
}
