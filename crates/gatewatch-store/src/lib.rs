//! GateWatch Store - JSON persistence for monitoring state
//!
//! Two small on-disk documents survive daemon restarts: the list of
//! monitored process names, and the two schedule tables (restart and
//! auto-start). Both are plain JSON files under the GateWatch home
//! directory, loaded once at startup and rewritten on every mutation.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use gatewatch_core::constants::{
    auto_start_schedules_path, monitored_path, restart_schedules_path,
};
use gatewatch_core::{Result, ScheduleEntry};

fn load_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        debug!(path = %path.display(), "store file absent, starting empty");
        return Ok(T::default());
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(&content)?)
}

fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content)?;
    Ok(())
}

/// Persisted list of monitored process names, restored at startup so
/// registrations survive a daemon restart.
#[derive(Debug, Clone)]
pub struct NameListStore {
    path: PathBuf,
}

impl NameListStore {
    pub fn new() -> Self {
        Self {
            path: monitored_path(),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Names on disk. A corrupt file is reported as empty so monitoring can
    /// still start; the warning points at the file.
    pub fn load(&self) -> Vec<String> {
        match load_json::<Vec<String>>(&self.path) {
            Ok(names) => names,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "monitored list unreadable");
                Vec::new()
            }
        }
    }

    pub fn save(&self, names: &[String]) -> Result<()> {
        save_json(&self.path, &names)
    }
}

impl Default for NameListStore {
    fn default() -> Self {
        Self::new()
    }
}

/// One schedule table, keyed by `process_name:hostname`.
#[derive(Debug, Clone)]
pub struct ScheduleStore {
    path: PathBuf,
}

impl ScheduleStore {
    pub fn restart() -> Self {
        Self {
            path: restart_schedules_path(),
        }
    }

    pub fn auto_start() -> Self {
        Self {
            path: auto_start_schedules_path(),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> HashMap<String, ScheduleEntry> {
        match load_json(&self.path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "schedule table unreadable");
                HashMap::new()
            }
        }
    }

    pub fn save(&self, entries: &HashMap<String, ScheduleEntry>) -> Result<()> {
        save_json(&self.path, entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatewatch_core::ScheduleSpec;
    use tempfile::TempDir;

    #[test]
    fn test_name_list_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = NameListStore::with_path(dir.path().join("monitored.json"));
        assert!(store.load().is_empty());

        let names = vec!["LISGateway.exe".to_string(), "hl7router".to_string()];
        store.save(&names).unwrap();
        assert_eq!(store.load(), names);
    }

    #[test]
    fn test_name_list_corrupt_file_reports_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("monitored.json");
        fs::write(&path, "{not json").unwrap();
        let store = NameListStore::with_path(&path);
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_schedule_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = ScheduleStore::with_path(dir.path().join("restart_schedules.json"));
        assert!(store.load().is_empty());

        let entry = ScheduleEntry::new(
            "LISGateway.exe",
            "ward-3-pc",
            Some("C:/Gateway/LISGateway.exe".into()),
            ScheduleSpec::interval(30, 0),
        );
        let mut table = HashMap::new();
        table.insert(entry.key(), entry.clone());
        store.save(&table).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.len(), 1);
        let got = &loaded[&entry.key()];
        assert_eq!(got.process_name, "LISGateway.exe");
        assert_eq!(got.hostname, "ward-3-pc");
        assert_eq!(got.next_action, entry.next_action);
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deep").join("monitored.json");
        let store = NameListStore::with_path(&path);
        store.save(&["a".to_string()]).unwrap();
        assert!(path.exists());
    }
}
