use std::path::PathBuf;

use super::{Signal, run_silent_with_output};
use crate::stats::TrafficStats;

pub fn find_openconnect_binary() -> (String, bool) {
    let binary_name = "openconnect.exe";

    let (found, stdout) = run_silent_with_output("where", &[binary_name]);
    if found {
        let path = stdout.lines().next().unwrap_or("").trim().to_string();
        if !path.is_empty() {
            log::info!("[binary] found via where: {path}");
            return (path, true);
        }
    }

    let mut candidates: Vec<PathBuf> = Vec::new();
    for variable in ["ProgramFiles", "ProgramFiles(x86)", "LOCALAPPDATA"] {
        if let Ok(root) = std::env::var(variable) {
            candidates.push(PathBuf::from(root).join("OpenConnect").join(binary_name));
        }
    }
    if let Ok(exe_path) = std::env::current_exe()
        && let Some(directory) = exe_path.parent()
    {
        candidates.push(directory.join(binary_name));
    }

    for candidate in &candidates {
        if candidate.exists() {
            let path = candidate.to_string_lossy().to_string();
            log::info!("[binary] found on disk: {path}");
            return (path, true);
        }
    }

    log::warn!("[binary] {binary_name} not found in search paths");
    (binary_name.to_string(), false)
}

pub fn is_root() -> bool {
    run_silent_with_output("net", &["session"]).0
}

/// The application is expected to run elevated on Windows; nothing is wrapped.
pub fn elevation_program() -> Option<&'static str> {
    if !is_root() {
        log::warn!("[elevation] not running as administrator; openconnect may fail to open the TAP device");
    }
    None
}

/// Console processes cannot receive POSIX signals; callers fall back to killing the child.
pub fn send_signal(process_id: u32, signal: Signal, _elevated: bool) -> bool {
    log::debug!(
        "[signal] {} not deliverable to pid={process_id} on Windows",
        signal.kill_argument()
    );
    false
}

pub fn interface_counters(_interface: &str) -> Option<TrafficStats> {
    None
}
