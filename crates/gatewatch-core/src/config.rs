//! Monitor configuration file handling
//!
//! A single TOML file in the GateWatch home directory carries the tick
//! intervals, metric thresholds, and alert settings. Missing file means
//! defaults; the file is written back whenever settings are updated through
//! the engine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::{self, DEFAULT_HEARTBEAT_TIMEOUT_SECS, DEFAULT_HISTORY_LENGTH,
    DEFAULT_SCHEDULER_INTERVAL_SECS, DEFAULT_UPDATE_INTERVAL_SECS};
use crate::error::Result;
use crate::types::{AlertSettings, Thresholds};

fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL_SECS
}

fn default_scheduler_interval() -> u64 {
    DEFAULT_SCHEDULER_INTERVAL_SECS
}

fn default_history_length() -> usize {
    DEFAULT_HISTORY_LENGTH
}

fn default_heartbeat_timeout() -> i64 {
    DEFAULT_HEARTBEAT_TIMEOUT_SECS
}

/// Monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Metrics/alert tick period in seconds
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,

    /// Scheduler tick period in seconds
    #[serde(default = "default_scheduler_interval")]
    pub scheduler_interval_secs: u64,

    /// Metric samples retained per process
    #[serde(default = "default_history_length")]
    pub history_length: usize,

    /// Gateway heartbeat staleness timeout in seconds
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_secs: i64,

    /// Override for the gateway application's log directory
    #[serde(default)]
    pub gateway_log_dir: Option<PathBuf>,

    #[serde(default)]
    pub thresholds: Thresholds,

    #[serde(default)]
    pub alerts: AlertSettings,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            scheduler_interval_secs: DEFAULT_SCHEDULER_INTERVAL_SECS,
            history_length: DEFAULT_HISTORY_LENGTH,
            heartbeat_timeout_secs: DEFAULT_HEARTBEAT_TIMEOUT_SECS,
            gateway_log_dir: None,
            thresholds: Thresholds::default(),
            alerts: AlertSettings::default(),
        }
    }
}

impl MonitorConfig {
    /// Load config from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(&constants::config_path())
    }

    /// Load config from a specific path; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: MonitorConfig = toml::from_str(&content)?;

        debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&constants::config_path())
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, &content)?;

        info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Gateway log directory, falling back to the platform default
    pub fn gateway_log_dir(&self) -> PathBuf {
        self.gateway_log_dir
            .clone()
            .unwrap_or_else(constants::default_gateway_log_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.update_interval_secs, 2);
        assert_eq!(config.scheduler_interval_secs, 10);
        assert_eq!(config.history_length, 60);
        assert_eq!(config.thresholds.cpu_percent, 80.0);
        assert!(config.alerts.process_stopped_enabled);
    }

    #[test]
    fn test_load_missing_config() {
        let config = MonitorConfig::load_from(Path::new("/nonexistent/gatewatch.toml")).unwrap();
        assert_eq!(config.history_length, 60);
    }

    #[test]
    fn test_load_partial_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gatewatch.toml");
        std::fs::write(
            &path,
            r#"
history_length = 10

[thresholds]
cpu_percent = 95.0
ram_percent = 80.0
disk_io_mb_s = 100.0
network_mb_s = 50.0
"#,
        )
        .unwrap();

        let config = MonitorConfig::load_from(&path).unwrap();
        assert_eq!(config.history_length, 10);
        assert_eq!(config.thresholds.cpu_percent, 95.0);
        // Unspecified fields keep defaults
        assert_eq!(config.update_interval_secs, 2);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gatewatch.toml");

        let mut config = MonitorConfig::default();
        config.thresholds.network_mb_s = 25.0;
        config.alerts.stopped_minutes = 2;
        config.save_to(&path).unwrap();

        let loaded = MonitorConfig::load_from(&path).unwrap();
        assert_eq!(loaded.thresholds.network_mb_s, 25.0);
        assert_eq!(loaded.alerts.stopped_minutes, 2);
    }
}
