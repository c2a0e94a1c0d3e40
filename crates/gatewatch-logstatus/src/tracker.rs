//! Edge detection over successive gateway status snapshots.

use chrono::{DateTime, Local};
use tracing::info;

use gatewatch_core::{DbKey, DbState, GatewayStatus};

use crate::parser::LogStatusParser;

/// A database link changing state between two consecutive checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbTransition {
    pub key: DbKey,
    pub connected: bool,
    pub host: Option<String>,
    pub last_error: Option<String>,
}

/// Wraps a [`LogStatusParser`] and remembers the last seen database states so
/// callers get change notifications rather than raw snapshots.
#[derive(Debug)]
pub struct LogStatusTracker {
    parser: LogStatusParser,
    prev_his: DbState,
    prev_gateway: DbState,
}

impl LogStatusTracker {
    pub fn new(parser: LogStatusParser) -> Self {
        Self {
            parser,
            prev_his: DbState::Unknown,
            prev_gateway: DbState::Unknown,
        }
    }

    pub fn parser(&self) -> &LogStatusParser {
        &self.parser
    }

    /// Parse today's logs and report database links that changed state since
    /// the previous check. The first check establishes a baseline and never
    /// reports transitions.
    pub fn check(&mut self, process_name: &str) -> (GatewayStatus, Vec<DbTransition>) {
        self.check_at(process_name, Local::now())
    }

    pub fn check_at(
        &mut self,
        process_name: &str,
        now: DateTime<Local>,
    ) -> (GatewayStatus, Vec<DbTransition>) {
        let status = self.parser.parse_at(process_name, now);
        let mut transitions = Vec::new();

        for key in [DbKey::HisDb, DbKey::GatewayDb] {
            let prev = match key {
                DbKey::HisDb => self.prev_his,
                DbKey::GatewayDb => self.prev_gateway,
            };
            let link = status.db(key);
            if prev != DbState::Unknown && link.state != prev && link.state != DbState::Unknown {
                info!(
                    db = key.as_str(),
                    state = link.state.as_str(),
                    "database link changed state"
                );
                transitions.push(DbTransition {
                    key,
                    connected: link.state == DbState::Connected,
                    host: link.host.clone(),
                    last_error: link.last_error.clone(),
                });
            }
            match key {
                DbKey::HisDb => self.prev_his = link.state,
                DbKey::GatewayDb => self.prev_gateway = link.state,
            }
        }

        (status, transitions)
    }

    /// Whether the gateway currently has live worker threads, judged from a
    /// fresh parse of today's system log.
    pub fn is_busy(&self, process_name: &str) -> bool {
        self.parser.parse(process_name).active_threads > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 10, h, m, s).unwrap()
    }

    fn write_error_log(dir: &TempDir, lines: &[&str]) {
        let mut f = fs::File::create(dir.path().join("Error_24.05.10.txt")).unwrap();
        for line in lines {
            writeln!(f, "{}", line).unwrap();
        }
    }

    fn tracker(dir: &TempDir) -> LogStatusTracker {
        LogStatusTracker::new(LogStatusParser::new(dir.path(), 30))
    }

    #[test]
    fn test_first_check_is_baseline() {
        let dir = TempDir::new().unwrap();
        write_error_log(&dir, &["09:10:00 : Connection Error => Lost connection"]);
        let mut t = tracker(&dir);
        let (_, transitions) = t.check_at("gw", at(10, 0, 0));
        assert!(transitions.is_empty());
    }

    #[test]
    fn test_disconnect_then_reconnect_edges() {
        let dir = TempDir::new().unwrap();
        let mut t = tracker(&dir);

        // Baseline: no error log, both links connected.
        let (_, transitions) = t.check_at("gw", at(10, 0, 0));
        assert!(transitions.is_empty());

        write_error_log(&dir, &["10:01:00 : Connection Error => Lost connection"]);
        let (_, transitions) = t.check_at("gw", at(10, 2, 0));
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].key, DbKey::GatewayDb);
        assert!(!transitions[0].connected);
        assert_eq!(
            transitions[0].last_error.as_deref(),
            Some("Lost connection")
        );

        write_error_log(
            &dir,
            &[
                "10:01:00 : Connection Error => Lost connection",
                "10:03:00 : ReConnect DB OK.",
            ],
        );
        let (_, transitions) = t.check_at("gw", at(10, 4, 0));
        assert_eq!(transitions.len(), 1);
        assert!(transitions[0].connected);
    }

    #[test]
    fn test_steady_state_reports_nothing() {
        let dir = TempDir::new().unwrap();
        write_error_log(&dir, &["10:01:00 : Connection Error => Lost connection"]);
        let mut t = tracker(&dir);
        t.check_at("gw", at(10, 2, 0));
        let (_, transitions) = t.check_at("gw", at(10, 3, 0));
        assert!(transitions.is_empty());
    }

    #[test]
    fn test_is_busy_reflects_thread_count() {
        let dir = TempDir::new().unwrap();
        let t = tracker(&dir);
        assert!(!t.is_busy("gw"));

        // is_busy parses at the real current date, so name the file for today.
        let today = Local::now().date_naive();
        let name = format!("System_{}.txt", today.format("%y.%m.%d"));
        let mut f = fs::File::create(dir.path().join(name)).unwrap();
        writeln!(f, "08:00:00 : Create Thread Import[1]").unwrap();
        assert!(t.is_busy("gw"));
    }
}
