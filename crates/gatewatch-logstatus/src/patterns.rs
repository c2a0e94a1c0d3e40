//! Ordered pattern table for gateway log lines
//!
//! Each log line is matched against a fixed rule list, first hit wins. The
//! rules are kept as data so each one can be tested on its own instead of
//! being buried inline in the parser.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Worker thread direction as named in the gateway's logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadKind {
    Import,
    Export,
}

impl ThreadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreadKind::Import => "Import",
            ThreadKind::Export => "Export",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "Import" => Some(ThreadKind::Import),
            "Export" => Some(ThreadKind::Export),
            _ => None,
        }
    }
}

impl std::fmt::Display for ThreadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recognized gateway log event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    GatewayStarted,
    GatewayStopped,
    Heartbeat,
    CreateThread {
        kind: ThreadKind,
        id: u32,
    },
    /// Initial connection failure; which database is inferred from the line text
    ConnectionError {
        message: String,
    },
    /// Reconnect failure carrying the connection string it targeted
    ReconnectError {
        target: String,
        message: String,
    },
    ReconnectOk,
    ThreadError {
        kind: ThreadKind,
        id: u32,
        message: String,
    },
}

struct Rule {
    pattern: Regex,
    build: fn(&Captures) -> Option<LogEvent>,
}

impl Rule {
    fn new(pattern: &str, build: fn(&Captures) -> Option<LogEvent>) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("invalid log rule pattern"),
            build,
        }
    }
}

/// Rule order matters: lifecycle and specific markers come before the
/// generic connection-error rule.
static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(r"Start Gateway\.", |_| Some(LogEvent::GatewayStarted)),
        Rule::new(r"Stop Gateway\.", |_| Some(LogEvent::GatewayStopped)),
        Rule::new(r"1-{18} = \d+", |_| Some(LogEvent::Heartbeat)),
        Rule::new(r"Create Thread (Import|Export)\[(\d+)\]", |caps| {
            Some(LogEvent::CreateThread {
                kind: ThreadKind::parse(&caps[1])?,
                id: caps[2].parse().ok()?,
            })
        }),
        Rule::new(r"ReConnect DB OK\.", |_| Some(LogEvent::ReconnectOk)),
        Rule::new(r"Error Reconnect\s+(\S+)\s*=>\s*(.+)", |caps| {
            Some(LogEvent::ReconnectError {
                target: caps[1].to_string(),
                message: caps[2].trim().to_string(),
            })
        }),
        Rule::new(
            r"Thread (Export|Import)\[(\d+)\]\s+(?:Execute\s+)?Error\s*=>\s*(.+)",
            |caps| {
                Some(LogEvent::ThreadError {
                    kind: ThreadKind::parse(&caps[1])?,
                    id: caps[2].parse().ok()?,
                    message: caps[3].trim().to_string(),
                })
            },
        ),
        Rule::new(r"(?:Init LIS )?Connection Error\s*=>\s*(.+)", |caps| {
            Some(LogEvent::ConnectionError {
                message: caps[1].trim().to_string(),
            })
        }),
    ]
});

static LINE_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2}:\d{2}:\d{2})\s*:").expect("invalid line time pattern"));

static HOST_IN_ERROR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)host\s*['"]?([^'":\s]+)"#).expect("invalid host pattern")
});

/// Classify a log line against the rule table; first matching rule wins.
pub fn classify(line: &str) -> Option<LogEvent> {
    for rule in RULES.iter() {
        if let Some(caps) = rule.pattern.captures(line) {
            return (rule.build)(&caps);
        }
    }
    None
}

/// Extract the leading `HH:MM:SS :` timestamp of a log line, pinned to the
/// given date (log files rotate daily and carry time-of-day only).
pub fn parse_line_time(line: &str, date: NaiveDate) -> Option<DateTime<Local>> {
    let caps = LINE_TIME.captures(line)?;
    let time = NaiveTime::parse_from_str(&caps[1], "%H:%M:%S").ok()?;
    Local.from_local_datetime(&date.and_time(time)).single()
}

/// Pull a `host ...` token out of a connection error message, if present.
pub fn host_from_error(message: &str) -> Option<String> {
    HOST_IN_ERROR
        .captures(message)
        .map(|caps| caps[1].to_string())
}

/// Host portion of a reconnect target such as `127.0.0.1.lis_gateway`:
/// the first four dot-separated parts if there are at least four, else the
/// first part alone.
pub fn host_from_reconnect_target(target: &str) -> String {
    let parts: Vec<&str> = target.split('.').collect();
    if parts.len() >= 4 {
        parts[..4].join(".")
    } else {
        parts[0].to_string()
    }
}
