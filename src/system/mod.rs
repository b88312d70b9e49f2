use std::process::{Command, Stdio};

pub mod proxy;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::*;

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
pub use windows::*;

#[cfg(target_os = "windows")]
pub(crate) const CREATE_NO_WINDOW: u32 = 0x08000000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Hangup,
    User1,
}

impl Signal {
    pub fn kill_argument(self) -> &'static str {
        match self {
            Self::Interrupt => "-INT",
            Self::Hangup => "-HUP",
            Self::User1 => "-USR1",
        }
    }
}

pub fn hidden_command(program: &str) -> Command {
    #[allow(unused_mut)]
    let mut command = Command::new(program);

    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        command.creation_flags(CREATE_NO_WINDOW);
    }

    command
}

pub fn run_silent_with_output(program: &str, arguments: &[&str]) -> (bool, String) {
    log::debug!("[cmd] {} {}", program, arguments.join(" "));
    let mut command = hidden_command(program);
    command
        .args(arguments)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    match command.output() {
        Ok(output) => {
            let success = output.status.success();
            let stdout = String::from_utf8_lossy(&output.stdout).to_string();
            if !success {
                log::debug!(
                    "[cmd] FAILED (exit {}): {} {}\n  stdout: {}\n  stderr: {}",
                    output.status.code().unwrap_or(-1),
                    program,
                    arguments.join(" "),
                    stdout.trim(),
                    String::from_utf8_lossy(&output.stderr).trim(),
                );
            } else {
                log::trace!(
                    "[cmd] OK: {} {} -> stdout={}",
                    program,
                    arguments.join(" "),
                    stdout.trim(),
                );
            }
            (success, stdout)
        }
        Err(error) => {
            log::debug!("[cmd] spawn error for {program}: {error}");
            (false, error.to_string())
        }
    }
}

pub fn run_silent(program: &str, arguments: &[&str]) -> bool {
    run_silent_with_output(program, arguments).0
}

/// First line of `openconnect --version`, used for the version label.
pub fn openconnect_version(binary: &str) -> Option<String> {
    let (_, output) = run_silent_with_output(binary, &["--version"]);
    let line = output.lines().next()?.trim().to_string();
    if line.is_empty() {
        log::warn!("[preflight] {binary} --version produced no output");
        return None;
    }
    log::info!("[preflight] {line}");
    Some(line)
}

pub fn version_label(version_line: Option<&str>) -> String {
    match version_line {
        Some(line) => format!("Based on {line}"),
        None => "openconnect binary not found".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kill_arguments() {
        assert_eq!(Signal::Interrupt.kill_argument(), "-INT");
        assert_eq!(Signal::Hangup.kill_argument(), "-HUP");
        assert_eq!(Signal::User1.kill_argument(), "-USR1");
    }

    #[test]
    fn test_version_label() {
        assert_eq!(
            version_label(Some("OpenConnect version v9.12")),
            "Based on OpenConnect version v9.12"
        );
        assert_eq!(version_label(None), "openconnect binary not found");
    }

    #[test]
    fn test_missing_program_reports_failure() {
        let (success, _) = run_silent_with_output("definitely-not-a-real-binary-42", &[]);
        assert!(!success);
    }
}
