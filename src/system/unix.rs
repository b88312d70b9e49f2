use std::path::Path;

use super::{Signal, run_silent, run_silent_with_output};
use crate::stats::TrafficStats;

pub fn find_openconnect_binary() -> (String, bool) {
    let candidates = [
        "openconnect",
        "/usr/sbin/openconnect",
        "/usr/bin/openconnect",
        "/usr/local/sbin/openconnect",
        "/usr/local/bin/openconnect",
        "/opt/homebrew/bin/openconnect",
    ];

    for candidate in &candidates {
        let (found, stdout) = run_silent_with_output("which", &[candidate]);
        if found {
            let path = stdout.trim().to_string();
            if !path.is_empty() {
                log::info!("[binary] found via which: {candidate} -> {path}");
                return (path, true);
            }
        }
        if Path::new(candidate).exists() {
            log::info!("[binary] found on disk: {candidate}");
            return (candidate.to_string(), true);
        }
    }

    log::warn!("[binary] openconnect not found in search paths");
    ("openconnect".to_string(), false)
}

pub fn is_root() -> bool {
    let (success, stdout) = run_silent_with_output("id", &["-u"]);
    success && stdout.trim() == "0"
}

/// Program used to start openconnect with root privileges, if one is needed and present.
pub fn elevation_program() -> Option<&'static str> {
    if is_root() {
        return None;
    }
    if cfg!(target_os = "linux") && run_silent("which", &["pkexec"]) {
        return Some("pkexec");
    }
    log::warn!("[elevation] not running as root and pkexec is unavailable");
    None
}

pub fn send_signal(process_id: u32, signal: Signal, elevated: bool) -> bool {
    let process_id_string = process_id.to_string();
    let argument = signal.kill_argument();
    if run_silent("kill", &[argument, &process_id_string]) {
        log::info!("[signal] sent {argument} to pid={process_id_string}");
        return true;
    }
    if !elevated {
        log::warn!("[signal] {argument} failed for pid={process_id_string}");
        return false;
    }

    log::info!("[signal] {argument} failed for pid={process_id_string}, trying pkexec");
    std::thread::spawn(move || {
        if !run_silent("pkexec", &["kill", argument, &process_id_string]) {
            log::warn!("[signal] pkexec kill {argument} failed for pid={process_id_string}");
        }
    });
    true
}

/// Byte counters of a network interface, readable without privileges on Linux.
pub fn interface_counters(interface: &str) -> Option<TrafficStats> {
    if !cfg!(target_os = "linux") {
        return None;
    }
    let directory = Path::new("/sys/class/net").join(interface).join("statistics");
    let read = |name: &str| -> Option<u64> {
        std::fs::read_to_string(directory.join(name))
            .ok()?
            .trim()
            .parse()
            .ok()
    };
    Some(TrafficStats {
        tx_bytes: read("tx_bytes")?,
        rx_bytes: read("rx_bytes")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_interface_has_no_counters() {
        assert_eq!(interface_counters("no-such-interface-0"), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_loopback_counters_readable() {
        if Path::new("/sys/class/net/lo/statistics/rx_bytes").exists() {
            assert!(interface_counters("lo").is_some());
        }
    }
}
