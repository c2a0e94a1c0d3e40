//! Constants and default values for GateWatch

use std::path::PathBuf;

/// Default GateWatch home directory name
pub const GATEWATCH_DIR: &str = ".gatewatch";

/// Persisted monitored process name list
pub const MONITORED_FILE: &str = "monitored.json";

/// Persisted restart schedule table
pub const RESTART_SCHEDULES_FILE: &str = "restart_schedules.json";

/// Persisted auto-start schedule table
pub const AUTO_START_SCHEDULES_FILE: &str = "auto_start_schedules.json";

/// Monitor configuration file (thresholds, alert settings)
pub const CONFIG_FILE: &str = "gatewatch.toml";

/// Metrics/alert tick period in seconds
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 2;

/// Scheduler tick period in seconds
pub const DEFAULT_SCHEDULER_INTERVAL_SECS: u64 = 10;

/// Metric samples retained per process (FIFO ring)
pub const DEFAULT_HISTORY_LENGTH: usize = 60;

/// Alerts retained in the ring buffer (FIFO)
pub const DEFAULT_ALERT_HISTORY: usize = 100;

/// Bounded alert dispatch queue depth
pub const DEFAULT_ALERT_QUEUE_DEPTH: usize = 256;

/// Default CPU threshold (percent)
pub const DEFAULT_CPU_THRESHOLD: f64 = 80.0;

/// Default RAM threshold (percent)
pub const DEFAULT_RAM_THRESHOLD: f64 = 80.0;

/// Default disk I/O threshold (MB/s, read + write)
pub const DEFAULT_DISK_IO_THRESHOLD: f64 = 100.0;

/// Default network threshold (MB/s, sent + received)
pub const DEFAULT_NETWORK_THRESHOLD: f64 = 50.0;

/// Minimum continuous down-duration before a stopped alert fires
pub const DEFAULT_STOPPED_ALERT_MINUTES: u32 = 5;
pub const DEFAULT_STOPPED_ALERT_SECONDS: u32 = 0;

/// CPU sampling interval; two refreshes this far apart avoid a spurious 0.0
pub const CPU_SAMPLE_INTERVAL_MS: u64 = 100;

/// Heartbeat staleness timeout in seconds
pub const DEFAULT_HEARTBEAT_TIMEOUT_SECS: i64 = 30;

/// Lines scanned from the tail of the system log
pub const SYSTEM_LOG_SCAN_LINES: usize = 100;

/// Lines from the tail of the system log used for thread counting
pub const THREAD_COUNT_SCAN_LINES: usize = 50;

/// Retained thread-error entries in a GatewayStatus
pub const MAX_THREAD_ERRORS: usize = 5;

/// Recorded DB error text is truncated to this many characters
pub const MAX_ERROR_TEXT_LEN: usize = 200;

/// Thread-error message text is truncated to this many characters
pub const MAX_THREAD_ERROR_TEXT_LEN: usize = 100;

/// Grace period between kill and respawn during a scheduled restart
pub const RESTART_KILL_GRACE_SECS: u64 = 2;

/// Settle time after spawning before re-registering with the engine
pub const SPAWN_SETTLE_SECS: u64 = 1;

/// Get the GateWatch home directory
pub fn gatewatch_home() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(GATEWATCH_DIR))
        .unwrap_or_else(|| PathBuf::from(GATEWATCH_DIR))
}

/// Path of the persisted monitored process list
pub fn monitored_path() -> PathBuf {
    gatewatch_home().join(MONITORED_FILE)
}

/// Path of the persisted restart schedule table
pub fn restart_schedules_path() -> PathBuf {
    gatewatch_home().join(RESTART_SCHEDULES_FILE)
}

/// Path of the persisted auto-start schedule table
pub fn auto_start_schedules_path() -> PathBuf {
    gatewatch_home().join(AUTO_START_SCHEDULES_FILE)
}

/// Path of the monitor configuration file
pub fn config_path() -> PathBuf {
    gatewatch_home().join(CONFIG_FILE)
}

/// Default gateway log directory (the monitored application's own logs)
pub fn default_gateway_log_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("LISGatewayServices")
        .join("Log")
}
