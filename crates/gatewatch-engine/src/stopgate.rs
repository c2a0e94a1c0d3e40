//! Down-period tracking for process-stopped alerts.
//!
//! A stopped process should produce one alert per continuous down period,
//! and only after it has been down for the configured wait. Observations
//! carry an explicit `Instant` so the gating is clock-independent in tests.

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct DownState {
    since: Instant,
    alerted: bool,
}

/// Per-process down-period state machine.
#[derive(Debug, Default)]
pub struct StopTracker {
    down: HashMap<String, DownState>,
}

impl StopTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the process was observed down at `now`. Returns true
    /// exactly once per down period, the first time the down duration
    /// reaches `wait`.
    pub fn observe_stopped(&mut self, name: &str, now: Instant, wait: Duration) -> bool {
        let state = self
            .down
            .entry(name.to_string())
            .or_insert(DownState { since: now, alerted: false });
        if !state.alerted && now.duration_since(state.since) >= wait {
            state.alerted = true;
            return true;
        }
        false
    }

    /// Record that the process was observed running. Returns true when a
    /// down period had been recorded, meaning a started alert is owed.
    /// Recovery within the wait still owes one; the wait gates only the
    /// stopped alert.
    pub fn observe_running(&mut self, name: &str) -> bool {
        self.down.remove(name).is_some()
    }

    /// Forget any state for a deregistered process.
    pub fn clear(&mut self, name: &str) {
        self.down.remove(name);
    }
}
