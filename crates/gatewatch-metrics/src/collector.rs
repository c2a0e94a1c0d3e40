//! Process metric sampling on top of `sysinfo`.

use std::time::{Duration, Instant};

use chrono::Local;
use sysinfo::{Networks, Pid, ProcessRefreshKind, System};
use tracing::{debug, warn};

use gatewatch_core::constants::CPU_SAMPLE_INTERVAL_MS;
use gatewatch_core::MetricSample;

use crate::rate::{PidRates, RateTracker};

/// A process located by name during registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundProcess {
    pub name: String,
    pub pid: u32,
    /// Process creation time, seconds since the unix epoch
    pub create_time: u64,
}

/// Samples CPU, memory, disk, and network figures for monitored processes.
///
/// CPU usage needs two process-table refreshes a short interval apart, so
/// [`refresh`](Self::refresh) blocks for roughly [`CPU_SAMPLE_INTERVAL_MS`].
/// Callers on an async runtime should run a tick inside `spawn_blocking`.
///
/// Network throughput is sampled from the host's interface counters, not per
/// process; the OS offers no portable per-process attribution.
pub struct MetricsCollector {
    system: System,
    networks: Networks,
    disk_rates: PidRates,
    net_rate: RateTracker,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            system: System::new_all(),
            networks: Networks::new_with_refreshed_list(),
            disk_rates: PidRates::new(),
            net_rate: RateTracker::new(),
        }
    }

    fn process_refresh_kind() -> ProcessRefreshKind {
        ProcessRefreshKind::new()
            .with_cpu()
            .with_memory()
            .with_disk_usage()
    }

    /// Refresh the process table twice so per-process CPU deltas are valid,
    /// then refresh interface counters. Blocks for the CPU sample interval.
    pub fn refresh(&mut self) {
        self.system
            .refresh_processes_specifics(Self::process_refresh_kind());
        std::thread::sleep(Duration::from_millis(CPU_SAMPLE_INTERVAL_MS));
        self.system
            .refresh_processes_specifics(Self::process_refresh_kind());
        self.networks.refresh();
    }

    /// First process whose name matches case-insensitively.
    pub fn find_process(&self, name: &str) -> Option<FoundProcess> {
        let wanted = name.to_lowercase();
        self.system
            .processes()
            .values()
            .find(|p| p.name().to_lowercase() == wanted)
            .map(|p| FoundProcess {
                name: p.name().to_string(),
                pid: p.pid().as_u32(),
                create_time: p.start_time(),
            })
    }

    /// Whether the pid is still the same process it was at registration. A
    /// matching pid with a different start time is pid reuse, not liveness.
    pub fn is_alive(&self, pid: u32, create_time: u64) -> bool {
        match self.system.process(Pid::from_u32(pid)) {
            Some(p) => p.start_time() == create_time,
            None => false,
        }
    }

    /// Sample the process as of the last [`refresh`](Self::refresh). A pid
    /// that has vanished, or one the OS refuses to report on, degrades to a
    /// zeroed sample rather than an error.
    pub fn sample(&mut self, name: &str, pid: u32) -> MetricSample {
        let now = Instant::now();
        let process = match self.system.process(Pid::from_u32(pid)) {
            Some(p) => p,
            None => {
                debug!(name, pid, "process vanished between refresh and sample");
                self.disk_rates.forget(pid);
                return MetricSample::not_running(name, pid);
            }
        };

        let total_memory = self.system.total_memory();
        let memory_bytes = process.memory();
        let memory_percent = if total_memory > 0 {
            memory_bytes as f64 / total_memory as f64 * 100.0
        } else {
            warn!(name, pid, "total memory reported as zero");
            0.0
        };

        let disk = process.disk_usage();
        let (disk_read_mb_s, disk_write_mb_s) =
            self.disk_rates
                .update(pid, disk.total_read_bytes, disk.total_written_bytes, now);

        let (mut sent_total, mut recv_total) = (0u64, 0u64);
        for (_, data) in &self.networks {
            sent_total += data.total_transmitted();
            recv_total += data.total_received();
        }
        let (net_sent_mb_s, net_recv_mb_s) = self.net_rate.update(sent_total, recv_total, now);

        MetricSample {
            timestamp: Local::now(),
            name: name.to_string(),
            pid,
            cpu_percent: process.cpu_usage() as f64,
            memory_mb: memory_bytes as f64 / 1024.0 / 1024.0,
            memory_percent,
            disk_read_mb_s,
            disk_write_mb_s,
            net_sent_mb_s,
            net_recv_mb_s,
        }
    }

    /// Drop per-pid rate baselines for a deregistered process.
    pub fn forget(&mut self, pid: u32) {
        self.disk_rates.forget(pid);
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut System {
        &mut self.system
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
