//! Core types for GateWatch

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::constants::*;
use crate::error::{Error, Result};

/// Observed state of a monitored OS process
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    Running,
    Stopped,
}

impl ProcessState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessState::Running => "running",
            ProcessState::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Gateway lifecycle state derived from its own log output
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayState {
    Running,
    Stopped,
    #[default]
    Unknown,
}

impl GatewayState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayState::Running => "running",
            GatewayState::Stopped => "stopped",
            GatewayState::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Last gateway lifecycle event seen in the system log
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GatewayEvent {
    Start,
    Stop,
}

impl GatewayEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayEvent::Start => "Start Gateway",
            GatewayEvent::Stop => "Stop Gateway",
        }
    }
}

/// Database connectivity state derived from the error log
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbState {
    Connected,
    Disconnected,
    #[default]
    Unknown,
}

impl DbState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbState::Connected => "connected",
            DbState::Disconnected => "disconnected",
            DbState::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for DbState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The two logical databases the gateway talks to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DbKey {
    /// Upstream hospital-information-system database
    HisDb,
    /// The gateway's own database
    GatewayDb,
}

impl DbKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbKey::HisDb => "his_db",
            DbKey::GatewayDb => "gateway_db",
        }
    }
}

impl std::fmt::Display for DbKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Connectivity status of one logical database
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DbLink {
    pub state: DbState,
    pub host: Option<String>,
    pub last_error: Option<String>,
}

impl DbLink {
    pub fn connected() -> Self {
        Self {
            state: DbState::Connected,
            host: None,
            last_error: None,
        }
    }
}

/// Snapshot of gateway health derived from today's log files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayStatus {
    pub process_name: String,
    pub log_dir: PathBuf,
    pub gateway_state: GatewayState,
    pub last_event: Option<GatewayEvent>,
    pub last_event_time: Option<DateTime<Local>>,
    pub last_heartbeat: Option<DateTime<Local>>,
    pub heartbeat_stale: bool,
    pub his_db: DbLink,
    pub gateway_db: DbLink,
    pub active_threads: usize,
    pub thread_errors: Vec<String>,
    pub last_check: DateTime<Local>,
    pub last_error_time: Option<DateTime<Local>>,
}

impl GatewayStatus {
    pub fn unknown(process_name: impl Into<String>, log_dir: PathBuf) -> Self {
        Self {
            process_name: process_name.into(),
            log_dir,
            gateway_state: GatewayState::Unknown,
            last_event: None,
            last_event_time: None,
            last_heartbeat: None,
            heartbeat_stale: true,
            his_db: DbLink::default(),
            gateway_db: DbLink::default(),
            active_threads: 0,
            thread_errors: Vec::new(),
            last_check: Local::now(),
            last_error_time: None,
        }
    }

    pub fn db(&self, key: DbKey) -> &DbLink {
        match key {
            DbKey::HisDb => &self.his_db,
            DbKey::GatewayDb => &self.gateway_db,
        }
    }
}

/// A registered process under monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoredProcess {
    pub name: String,
    pub pid: u32,
    /// Process creation time, seconds since the unix epoch
    pub create_time: u64,
    pub registered_at: DateTime<Local>,
}

/// One immutable metric observation for a process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp: DateTime<Local>,
    pub name: String,
    pub pid: u32,
    pub cpu_percent: f64,
    pub memory_mb: f64,
    pub memory_percent: f64,
    pub disk_read_mb_s: f64,
    pub disk_write_mb_s: f64,
    pub net_sent_mb_s: f64,
    pub net_recv_mb_s: f64,
}

impl MetricSample {
    /// Zeroed sample for a process that is not currently running
    pub fn not_running(name: impl Into<String>, pid: u32) -> Self {
        Self {
            timestamp: Local::now(),
            name: name.into(),
            pid,
            cpu_percent: 0.0,
            memory_mb: 0.0,
            memory_percent: 0.0,
            disk_read_mb_s: 0.0,
            disk_write_mb_s: 0.0,
            net_sent_mb_s: 0.0,
            net_recv_mb_s: 0.0,
        }
    }
}

/// Metadata parsed from a gateway window title
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct WindowInfo {
    pub version: Option<String>,
    pub hospital_code: Option<String>,
    pub hospital_name: Option<String>,
    pub company: Option<String>,
    pub window_title: Option<String>,
}

/// Current-state view of one monitored process, recomputed every tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessStatusSnapshot {
    pub state: ProcessState,
    pub sample: MetricSample,
    pub uptime: String,
    pub uptime_secs: u64,
    pub window_title: Option<String>,
    pub window_info: Option<WindowInfo>,
    pub gateway: Option<GatewayStatus>,
}

impl ProcessStatusSnapshot {
    pub fn stopped(name: impl Into<String>, pid: u32) -> Self {
        Self {
            state: ProcessState::Stopped,
            sample: MetricSample::not_running(name, pid),
            uptime: "Not Running".to_string(),
            uptime_secs: 0,
            window_title: None,
            window_info: None,
            gateway: None,
        }
    }
}

/// Alert classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Cpu,
    Ram,
    DiskIo,
    Network,
    ProcessStopped,
    ProcessStarted,
    HisDbDisconnected,
    HisDbReconnected,
    GatewayDbDisconnected,
    GatewayDbReconnected,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Cpu => "CPU",
            AlertKind::Ram => "RAM",
            AlertKind::DiskIo => "DISK_IO",
            AlertKind::Network => "NETWORK",
            AlertKind::ProcessStopped => "PROCESS_STOPPED",
            AlertKind::ProcessStarted => "PROCESS_STARTED",
            AlertKind::HisDbDisconnected => "HIS_DB_DISCONNECTED",
            AlertKind::HisDbReconnected => "HIS_DB_RECONNECTED",
            AlertKind::GatewayDbDisconnected => "GATEWAY_DB_DISCONNECTED",
            AlertKind::GatewayDbReconnected => "GATEWAY_DB_RECONNECTED",
        }
    }

    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            AlertKind::HisDbDisconnected | AlertKind::GatewayDbDisconnected
        )
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One alert record; append-only, never mutated after creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub timestamp: DateTime<Local>,
    pub process_name: String,
    pub kind: AlertKind,
    pub message: String,
    pub value: f64,
    pub threshold: Option<f64>,
    pub hostname: Option<String>,
    pub hospital_code: Option<String>,
    pub hospital_name: Option<String>,
}

impl Alert {
    pub fn new(
        process_name: impl Into<String>,
        kind: AlertKind,
        message: impl Into<String>,
        value: f64,
        threshold: Option<f64>,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            process_name: process_name.into(),
            kind,
            message: message.into(),
            value,
            threshold,
            hostname: None,
            hospital_code: None,
            hospital_name: None,
        }
    }

    pub fn with_hostname(mut self, hostname: Option<String>) -> Self {
        self.hostname = hostname;
        self
    }

    pub fn with_hospital(mut self, info: &WindowInfo) -> Self {
        self.hospital_code = info.hospital_code.clone();
        self.hospital_name = info.hospital_name.clone();
        self
    }
}

/// Metric thresholds evaluated on every tick
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Thresholds {
    pub cpu_percent: f64,
    pub ram_percent: f64,
    pub disk_io_mb_s: f64,
    pub network_mb_s: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_percent: DEFAULT_CPU_THRESHOLD,
            ram_percent: DEFAULT_RAM_THRESHOLD,
            disk_io_mb_s: DEFAULT_DISK_IO_THRESHOLD,
            network_mb_s: DEFAULT_NETWORK_THRESHOLD,
        }
    }
}

/// Per-class alert toggles and the stopped-alert duration gate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertSettings {
    pub cpu_enabled: bool,
    pub ram_enabled: bool,
    pub disk_io_enabled: bool,
    pub network_enabled: bool,
    pub process_stopped_enabled: bool,
    pub stopped_minutes: u32,
    pub stopped_seconds: u32,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            cpu_enabled: true,
            ram_enabled: true,
            disk_io_enabled: true,
            network_enabled: true,
            process_stopped_enabled: true,
            stopped_minutes: DEFAULT_STOPPED_ALERT_MINUTES,
            stopped_seconds: DEFAULT_STOPPED_ALERT_SECONDS,
        }
    }
}

impl AlertSettings {
    /// Minimum continuous down-duration before a stopped alert fires
    pub fn stopped_wait(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.stopped_minutes) * 60 + u64::from(self.stopped_seconds))
    }
}

/// Schedule kind for restart and auto-start actions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    #[default]
    None,
    Interval,
    Daily,
}

impl ScheduleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleKind::None => "none",
            ScheduleKind::Interval => "interval",
            ScheduleKind::Daily => "daily",
        }
    }
}

impl FromStr for ScheduleKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(ScheduleKind::None),
            "interval" => Ok(ScheduleKind::Interval),
            "daily" => Ok(ScheduleKind::Daily),
            _ => Err(Error::schedule(format!("unknown schedule kind: {}", s))),
        }
    }
}

impl std::fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User-facing schedule configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ScheduleSpec {
    #[serde(default)]
    pub kind: ScheduleKind,
    #[serde(default)]
    pub interval_minutes: u32,
    #[serde(default)]
    pub interval_seconds: u32,
    /// Local wall-clock time "HH:MM" for daily schedules
    #[serde(default)]
    pub daily_time: Option<String>,
    #[serde(default)]
    pub enabled: bool,
}

impl ScheduleSpec {
    pub fn interval(minutes: u32, seconds: u32) -> Self {
        Self {
            kind: ScheduleKind::Interval,
            interval_minutes: minutes,
            interval_seconds: seconds,
            enabled: true,
            ..Default::default()
        }
    }

    pub fn daily(time: impl Into<String>) -> Self {
        Self {
            kind: ScheduleKind::Daily,
            daily_time: Some(time.into()),
            enabled: true,
            ..Default::default()
        }
    }

    pub fn total_interval_secs(&self) -> u64 {
        u64::from(self.interval_minutes) * 60 + u64::from(self.interval_seconds)
    }

    /// Whether this spec describes a live schedule at all
    pub fn is_active(&self) -> bool {
        self.enabled && self.kind != ScheduleKind::None
    }

    /// Next due time after `now`, or None if the schedule can never fire
    /// (interval with zero total seconds, unparsable daily time).
    pub fn next_after(&self, now: DateTime<Local>) -> Option<DateTime<Local>> {
        match self.kind {
            ScheduleKind::None => None,
            ScheduleKind::Interval => {
                let secs = self.total_interval_secs();
                if secs == 0 {
                    return None;
                }
                Some(now + ChronoDuration::seconds(secs as i64))
            }
            ScheduleKind::Daily => {
                let time = self.daily_time.as_deref()?;
                let at = NaiveTime::parse_from_str(time, "%H:%M").ok()?;
                let today = now
                    .with_hour(at.hour())
                    .and_then(|t| t.with_minute(at.minute()))
                    .and_then(|t| t.with_second(0))
                    .and_then(|t| t.with_nanosecond(0))?;
                if today > now {
                    Some(today)
                } else {
                    Some(today + ChronoDuration::days(1))
                }
            }
        }
    }
}

/// Key identifying a schedule entry: `process_name:hostname`
pub fn schedule_key(process_name: &str, hostname: &str) -> String {
    format!("{}:{}", process_name, hostname)
}

/// One persisted schedule table entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub process_name: String,
    pub hostname: String,
    pub program_path: Option<PathBuf>,
    pub spec: ScheduleSpec,
    pub last_action: Option<DateTime<Local>>,
    pub next_action: Option<DateTime<Local>>,
}

impl ScheduleEntry {
    pub fn new(
        process_name: impl Into<String>,
        hostname: impl Into<String>,
        program_path: Option<PathBuf>,
        spec: ScheduleSpec,
    ) -> Self {
        let next_action = spec.next_after(Local::now());
        Self {
            process_name: process_name.into(),
            hostname: hostname.into(),
            program_path,
            spec,
            last_action: None,
            next_action,
        }
    }

    pub fn key(&self) -> String {
        schedule_key(&self.process_name, &self.hostname)
    }

    /// Whether this entry is due at `now`
    pub fn is_due(&self, now: DateTime<Local>) -> bool {
        self.spec.is_active()
            && self.next_action.map(|next| now >= next).unwrap_or(false)
    }

    /// Record the action and recompute the next due time
    pub fn advance(&mut self, now: DateTime<Local>) {
        self.last_action = Some(now);
        self.next_action = self.spec.next_after(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 10, h, m, s).unwrap()
    }

    #[test]
    fn test_schedule_kind_from_str() {
        assert_eq!("interval".parse::<ScheduleKind>().unwrap(), ScheduleKind::Interval);
        assert_eq!("DAILY".parse::<ScheduleKind>().unwrap(), ScheduleKind::Daily);
        assert!("hourly".parse::<ScheduleKind>().is_err());
    }

    #[test]
    fn test_interval_next_after() {
        let spec = ScheduleSpec::interval(5, 30);
        let now = at(12, 0, 0);
        assert_eq!(spec.next_after(now), Some(at(12, 5, 30)));
    }

    #[test]
    fn test_zero_interval_never_schedules() {
        let spec = ScheduleSpec::interval(0, 0);
        assert_eq!(spec.next_after(at(12, 0, 0)), None);

        let entry = ScheduleEntry::new("gw", "host-1", None, spec);
        assert!(entry.next_action.is_none());
        assert!(!entry.is_due(at(23, 59, 59)));
    }

    #[test]
    fn test_daily_next_after_today() {
        let spec = ScheduleSpec::daily("18:30");
        let next = spec.next_after(at(12, 0, 0)).unwrap();
        assert_eq!(next, at(18, 30, 0));
    }

    #[test]
    fn test_daily_next_after_rolls_to_tomorrow() {
        let spec = ScheduleSpec::daily("06:00");
        let next = spec.next_after(at(12, 0, 0)).unwrap();
        assert_eq!(next, at(6, 0, 0) + ChronoDuration::days(1));
    }

    #[test]
    fn test_daily_bad_time_never_schedules() {
        let spec = ScheduleSpec::daily("6 o'clock");
        assert_eq!(spec.next_after(at(12, 0, 0)), None);
    }

    #[test]
    fn test_entry_due_and_advance() {
        let spec = ScheduleSpec::interval(1, 0);
        let mut entry = ScheduleEntry::new("gw", "host-1", None, spec);
        entry.next_action = Some(at(12, 0, 0));

        assert!(!entry.is_due(at(11, 59, 59)));
        assert!(entry.is_due(at(12, 0, 0)));

        entry.advance(at(12, 0, 3));
        assert_eq!(entry.last_action, Some(at(12, 0, 3)));
        assert_eq!(entry.next_action, Some(at(12, 1, 3)));
    }

    #[test]
    fn test_disabled_entry_never_due() {
        let mut spec = ScheduleSpec::interval(1, 0);
        spec.enabled = false;
        let mut entry = ScheduleEntry::new("gw", "host-1", None, spec);
        entry.next_action = Some(at(12, 0, 0));
        assert!(!entry.is_due(at(13, 0, 0)));
    }

    #[test]
    fn test_alert_settings_stopped_wait() {
        let settings = AlertSettings {
            stopped_minutes: 5,
            stopped_seconds: 30,
            ..Default::default()
        };
        assert_eq!(settings.stopped_wait().as_secs(), 330);
    }

    #[test]
    fn test_alert_builder() {
        let info = WindowInfo {
            hospital_code: Some("11304".to_string()),
            hospital_name: Some("Central Hospital".to_string()),
            ..Default::default()
        };
        let alert = Alert::new("gw.exe", AlertKind::Cpu, "CPU usage is 92%", 92.0, Some(80.0))
            .with_hostname(Some("host-1".to_string()))
            .with_hospital(&info);

        assert_eq!(alert.kind, AlertKind::Cpu);
        assert_eq!(alert.threshold, Some(80.0));
        assert_eq!(alert.hospital_code.as_deref(), Some("11304"));
        assert_eq!(alert.hostname.as_deref(), Some("host-1"));
    }

    #[test]
    fn test_alert_kind_strings() {
        assert_eq!(AlertKind::ProcessStopped.as_str(), "PROCESS_STOPPED");
        assert_eq!(AlertKind::HisDbDisconnected.as_str(), "HIS_DB_DISCONNECTED");
        assert!(AlertKind::HisDbDisconnected.is_disconnect());
        assert!(!AlertKind::HisDbReconnected.is_disconnect());
    }

    #[test]
    fn test_schedule_key() {
        assert_eq!(schedule_key("gw.exe", "ward-pc"), "gw.exe:ward-pc");
    }

    #[test]
    fn test_gateway_status_unknown() {
        let status = GatewayStatus::unknown("gw.exe", PathBuf::from("/tmp/log"));
        assert_eq!(status.gateway_state, GatewayState::Unknown);
        assert!(status.heartbeat_stale);
        assert_eq!(status.db(DbKey::HisDb).state, DbState::Unknown);
    }

    #[test]
    fn test_not_running_sample_is_zeroed() {
        let sample = MetricSample::not_running("gw.exe", 4242);
        assert_eq!(sample.pid, 4242);
        assert_eq!(sample.cpu_percent, 0.0);
        assert_eq!(sample.disk_read_mb_s, 0.0);
    }
}
