//! Byte-counter to throughput conversion.

use std::collections::HashMap;
use std::time::Instant;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Turns a pair of monotonically increasing byte counters into MB/s rates.
///
/// The first observation only establishes a baseline and reports 0.0. A
/// counter that goes backwards (process restart, counter reset) also resets
/// the baseline rather than reporting a negative rate.
#[derive(Debug, Default)]
pub struct RateTracker {
    prev: Option<(u64, u64, Instant)>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, a_total: u64, b_total: u64, now: Instant) -> (f64, f64) {
        let rates = match self.prev {
            Some((prev_a, prev_b, prev_at)) if a_total >= prev_a && b_total >= prev_b => {
                let elapsed = now.duration_since(prev_at).as_secs_f64();
                if elapsed > 0.0 {
                    (
                        (a_total - prev_a) as f64 / BYTES_PER_MB / elapsed,
                        (b_total - prev_b) as f64 / BYTES_PER_MB / elapsed,
                    )
                } else {
                    (0.0, 0.0)
                }
            }
            _ => (0.0, 0.0),
        };
        self.prev = Some((a_total, b_total, now));
        rates
    }
}

/// Per-pid [`RateTracker`] table for disk I/O counters.
#[derive(Debug, Default)]
pub struct PidRates {
    trackers: HashMap<u32, RateTracker>,
}

impl PidRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(
        &mut self,
        pid: u32,
        read_total: u64,
        write_total: u64,
        now: Instant,
    ) -> (f64, f64) {
        self.trackers
            .entry(pid)
            .or_default()
            .update(read_total, write_total, now)
    }

    /// Drop the baseline for a pid that is no longer monitored.
    pub fn forget(&mut self, pid: u32) {
        self.trackers.remove(&pid);
    }
}
