//! Direct process control: kill by name, detached spawn.

use std::path::Path;
use std::process::{Command, Stdio};

use sysinfo::System;
use tracing::{info, warn};

use gatewatch_core::{Error, Result};

/// Kill every process matching the name, case-insensitively. Best effort:
/// processes the OS refuses to signal are logged and skipped. Returns the
/// number of processes signalled.
pub fn kill_all_by_name(system: &mut System, name: &str) -> usize {
    system.refresh_processes();
    let wanted = name.to_lowercase();
    let mut killed = 0;
    for process in system.processes().values() {
        if process.name().to_lowercase() == wanted {
            if process.kill() {
                info!(name, pid = process.pid().as_u32(), "killed process");
                killed += 1;
            } else {
                warn!(
                    name,
                    pid = process.pid().as_u32(),
                    "failed to signal process"
                );
            }
        }
    }
    killed
}

/// Spawn the executable detached from our stdio, in its own directory.
/// Returns the child pid.
pub fn spawn_detached(program_path: &Path) -> Result<u32> {
    if !program_path.exists() {
        return Err(Error::ExecutableNotFound(program_path.to_path_buf()));
    }

    let mut command = Command::new(program_path);
    if let Some(parent) = program_path.parent() {
        command.current_dir(parent);
    }
    let child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| Error::spawn(format!("{}: {}", program_path.display(), e)))?;

    let pid = child.id();
    info!(path = %program_path.display(), pid, "spawned process");
    Ok(pid)
}

/// Title of the process's main window. Window enumeration is a GUI-platform
/// facility we do not bind to, so this always reports no title; the title
/// parser in the log-status crate is exercised with captured titles instead.
pub fn window_title_for_pid(_pid: u32) -> Option<String> {
    None
}
