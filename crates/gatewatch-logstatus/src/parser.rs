//! Derives a [`GatewayStatus`] snapshot from today's gateway log files.
//!
//! The gateway writes two date-rotated files per day: `System_YY.MM.DD.txt`
//! with lifecycle markers, heartbeats, and thread creation lines, and
//! `Error_YY.MM.DD.txt` with database and worker thread failures. Both carry
//! time-of-day timestamps only, so every parse is pinned to a reference date.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local, NaiveDate};
use tracing::debug;

use gatewatch_core::constants::{
    MAX_ERROR_TEXT_LEN, MAX_THREAD_ERRORS, MAX_THREAD_ERROR_TEXT_LEN, SYSTEM_LOG_SCAN_LINES,
    THREAD_COUNT_SCAN_LINES,
};
use gatewatch_core::{DbState, GatewayEvent, GatewayState, GatewayStatus};

use crate::patterns::{
    classify, host_from_error, host_from_reconnect_target, parse_line_time, LogEvent,
};

/// A heartbeat is stale when it is absent or older than the timeout.
pub fn heartbeat_stale(
    last_heartbeat: Option<DateTime<Local>>,
    now: DateTime<Local>,
    timeout_secs: i64,
) -> bool {
    match last_heartbeat {
        Some(hb) => now.signed_duration_since(hb) > Duration::seconds(timeout_secs),
        None => true,
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}

/// Parses the gateway's daily log pair into a status snapshot.
#[derive(Debug, Clone)]
pub struct LogStatusParser {
    log_dir: PathBuf,
    heartbeat_timeout_secs: i64,
}

impl LogStatusParser {
    pub fn new(log_dir: impl Into<PathBuf>, heartbeat_timeout_secs: i64) -> Self {
        Self {
            log_dir: log_dir.into(),
            heartbeat_timeout_secs,
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn system_log_path(&self, date: NaiveDate) -> PathBuf {
        self.log_dir
            .join(format!("System_{}.txt", date.format("%y.%m.%d")))
    }

    pub fn error_log_path(&self, date: NaiveDate) -> PathBuf {
        self.log_dir
            .join(format!("Error_{}.txt", date.format("%y.%m.%d")))
    }

    /// Parse today's logs for the named gateway process.
    pub fn parse(&self, process_name: &str) -> GatewayStatus {
        self.parse_at(process_name, Local::now())
    }

    /// Parse relative to an explicit reference time. Split out from
    /// [`parse`](Self::parse) so tests can pin the clock.
    pub fn parse_at(&self, process_name: &str, now: DateTime<Local>) -> GatewayStatus {
        let date = now.date_naive();
        let mut status = GatewayStatus::unknown(process_name, self.log_dir.clone());
        status.last_check = now;

        self.scan_system_log(&mut status, date);
        self.scan_error_log(&mut status, date);

        // A start marker newer than the last recorded error means the gateway
        // has been restarted since the failure; old error lines in the daily
        // file no longer describe the live connections.
        if status.gateway_state == GatewayState::Running
            && status.last_event == Some(GatewayEvent::Start)
        {
            if let (Some(event_time), Some(error_time)) =
                (status.last_event_time, status.last_error_time)
            {
                if event_time > error_time {
                    status.his_db.state = DbState::Connected;
                    status.his_db.last_error = None;
                    status.gateway_db.state = DbState::Connected;
                    status.gateway_db.last_error = None;
                }
            }
        }

        status.heartbeat_stale =
            heartbeat_stale(status.last_heartbeat, now, self.heartbeat_timeout_secs);
        if status.heartbeat_stale && status.gateway_state == GatewayState::Running {
            status.gateway_state = GatewayState::Unknown;
        }

        status
    }

    fn scan_system_log(&self, status: &mut GatewayStatus, date: NaiveDate) {
        let path = self.system_log_path(date);
        let lines = match read_tail(&path, SYSTEM_LOG_SCAN_LINES) {
            Some(lines) => lines,
            None => {
                debug!(path = %path.display(), "system log not readable");
                return;
            }
        };

        // Newest first: the first lifecycle marker seen is the current one,
        // and the first heartbeat seen is the most recent.
        for line in lines.iter().rev() {
            match classify(line) {
                Some(LogEvent::GatewayStarted) => {
                    status.gateway_state = GatewayState::Running;
                    status.last_event = Some(GatewayEvent::Start);
                    status.last_event_time = parse_line_time(line, date);
                    break;
                }
                Some(LogEvent::GatewayStopped) => {
                    status.gateway_state = GatewayState::Stopped;
                    status.last_event = Some(GatewayEvent::Stop);
                    status.last_event_time = parse_line_time(line, date);
                    break;
                }
                Some(LogEvent::Heartbeat) => {
                    if status.last_heartbeat.is_none() {
                        status.last_heartbeat = parse_line_time(line, date);
                        if status.gateway_state == GatewayState::Unknown {
                            status.gateway_state = GatewayState::Running;
                        }
                    }
                }
                _ => {}
            }
        }

        let mut threads = std::collections::HashSet::new();
        let start = lines.len().saturating_sub(THREAD_COUNT_SCAN_LINES);
        for line in &lines[start..] {
            if let Some(LogEvent::CreateThread { kind, id }) = classify(line) {
                threads.insert((kind, id));
            }
        }
        status.active_threads = threads.len();
    }

    fn scan_error_log(&self, status: &mut GatewayStatus, date: NaiveDate) {
        // Missing or empty error log means nothing has gone wrong today.
        status.his_db.state = DbState::Connected;
        status.gateway_db.state = DbState::Connected;

        let lines = match read_tail(&self.error_log_path(date), SYSTEM_LOG_SCAN_LINES) {
            Some(lines) if !lines.is_empty() => lines,
            _ => return,
        };

        let mut his_ok = true;
        let mut gateway_ok = true;
        let mut thread_errors: Vec<String> = Vec::new();

        for line in &lines {
            match classify(line) {
                Some(LogEvent::ConnectionError { message }) => {
                    // A bare "HIS" would match words like "This"; only the
                    // LIS token and the HOSXP product name mark HIS-side
                    // errors.
                    let link = if line.contains("LIS")
                        || line.to_uppercase().contains("HOSXP")
                    {
                        his_ok = false;
                        &mut status.his_db
                    } else {
                        gateway_ok = false;
                        &mut status.gateway_db
                    };
                    link.state = DbState::Disconnected;
                    // Host always reflects the latest error, parsable or not.
                    link.host = host_from_error(&message);
                    link.last_error = Some(truncate(&message, MAX_ERROR_TEXT_LEN));
                    status.last_error_time = parse_line_time(line, date);
                }
                Some(LogEvent::ReconnectError { target, message }) => {
                    // Reconnect lines name the connection string, not the
                    // database role. Gateway-named connection strings belong
                    // to the HIS side in this deployment.
                    let link = if target.to_lowercase().contains("gateway") {
                        his_ok = false;
                        &mut status.his_db
                    } else {
                        gateway_ok = false;
                        &mut status.gateway_db
                    };
                    link.state = DbState::Disconnected;
                    link.host = Some(host_from_reconnect_target(&target));
                    link.last_error = Some(truncate(&message, MAX_ERROR_TEXT_LEN));
                    status.last_error_time = parse_line_time(line, date);
                }
                Some(LogEvent::ReconnectOk) => {
                    his_ok = true;
                    gateway_ok = true;
                    status.his_db.state = DbState::Connected;
                    status.his_db.last_error = None;
                    status.gateway_db.state = DbState::Connected;
                    status.gateway_db.last_error = None;
                }
                Some(LogEvent::ThreadError { kind, id, message }) => {
                    let entry = format!(
                        "{}[{}]: {}",
                        kind,
                        id,
                        truncate(&message, MAX_THREAD_ERROR_TEXT_LEN)
                    );
                    thread_errors.push(entry);
                }
                _ => {}
            }
        }

        if !his_ok {
            status.his_db.state = DbState::Disconnected;
        }
        if !gateway_ok {
            status.gateway_db.state = DbState::Disconnected;
        }

        // Deduplicate preserving order, then keep only the most recent few.
        let mut seen = std::collections::HashSet::new();
        let mut unique: Vec<String> = Vec::new();
        for entry in thread_errors {
            if seen.insert(entry.clone()) {
                unique.push(entry);
            }
        }
        if unique.len() > MAX_THREAD_ERRORS {
            unique = unique.split_off(unique.len() - MAX_THREAD_ERRORS);
        }
        status.thread_errors = unique;
    }
}

/// Last `count` lines of a file, or None when it cannot be read.
fn read_tail(path: &Path, count: usize) -> Option<Vec<String>> {
    let content = fs::read_to_string(path).ok()?;
    let lines: Vec<String> = content.lines().map(|l| l.to_string()).collect();
    let start = lines.len().saturating_sub(count);
    Some(lines[start..].to_vec())
}
