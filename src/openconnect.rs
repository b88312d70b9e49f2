//! [`VpnSession`] backed by the `openconnect` command-line client.

use std::{
    io::{BufRead, BufReader, Read, Write},
    process::{Child, ExitStatus, Stdio},
    sync::mpsc,
    time::{Duration, Instant},
};

use crate::{
    bridge::{EventSender, NetworkInfo},
    control::{self, CommandReceiver, CommandSender, ControlCommand, Poll},
    error::{Error, Result},
    session::{Attempt, Gateway, SessionFactory, VpnSession},
    settings::ServerProfile,
    stats::TrafficStats,
    system::{self, Signal},
};

/// Tunnel device name requested on Linux so traffic counters can be read from sysfs.
pub const INTERFACE_NAME: &str = "oc-ui0";

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const DTLS_TIMEOUT: Duration = Duration::from_secs(5);
const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputLine {
    Connected { ip: String, ip6: String },
    DtlsEstablished,
    DtlsFailed,
    AuthenticationFailed,
    Dns(String),
    Traffic(TrafficStats),
    CertificatePin(String),
    Other,
}

pub fn classify(line: &str) -> OutputLine {
    let line = line.trim();
    let lower = line.to_lowercase();

    if let Some(addresses) = connected_addresses(line) {
        let (ip, ip6) = match addresses.split_once(" + ") {
            Some((ip, ip6)) => (ip.trim(), ip6.trim()),
            None if addresses.contains(':') => ("", addresses),
            None => (addresses, ""),
        };
        return OutputLine::Connected {
            ip: ip.to_string(),
            ip6: ip6.to_string(),
        };
    }
    if lower.contains("established dtls connection") {
        return OutputLine::DtlsEstablished;
    }
    if lower.contains("dtls handshake failed") {
        return OutputLine::DtlsFailed;
    }
    if lower.contains("failed to authenticate")
        || lower.contains("login failed")
        || lower.contains("authentication failed")
    {
        return OutputLine::AuthenticationFailed;
    }
    if let Some(dns) = line.strip_prefix("X-CSTP-DNS:") {
        return OutputLine::Dns(dns.trim().to_string());
    }
    if let Some(stats) = parse_traffic(line) {
        return OutputLine::Traffic(stats);
    }
    if let Some(pin) = line.strip_prefix("--servercert") {
        let pin = pin.trim_start_matches('=').trim();
        if !pin.is_empty() {
            return OutputLine::CertificatePin(pin.to_string());
        }
    }
    OutputLine::Other
}

/// Address part of "Connected as …" / "Connected tun0 as …" / "Configured as …".
fn connected_addresses(line: &str) -> Option<&str> {
    let rest = line
        .strip_prefix("Connected ")
        .or_else(|| line.strip_prefix("Configured "))?;
    let addresses = match rest.strip_prefix("as ") {
        Some(addresses) => addresses,
        None => {
            let (device, addresses) = rest.split_once(" as ")?;
            if device.contains(char::is_whitespace) {
                return None;
            }
            addresses
        }
    };
    let addresses = addresses.split(',').next()?.trim();
    (!addresses.is_empty()).then_some(addresses)
}

/// "RX: 10 packets (2048 B); TX: 5 packets (512 B)"
fn parse_traffic(line: &str) -> Option<TrafficStats> {
    let (rx, tx) = line.split_once(';')?;
    let byte_count = |part: &str, label: &str| -> Option<u64> {
        let part = part.trim().strip_prefix(label)?;
        let (_, bytes) = part.split_once('(')?;
        bytes.trim_end_matches(')').trim().strip_suffix('B')?.trim().parse().ok()
    };
    Some(TrafficStats {
        rx_bytes: byte_count(rx, "RX:")?,
        tx_bytes: byte_count(tx, "TX:")?,
    })
}

pub fn exit_message(status: ExitStatus, program: &str) -> String {
    match status.code() {
        Some(126) => "pkexec authentication was dismissed, try again and authenticate when prompted"
            .to_string(),
        Some(127) => format!("Binary '{program}' not found. Install openconnect and try again"),
        Some(code) => format!("openconnect exited with code {code}"),
        None => "openconnect was terminated by a signal".to_string(),
    }
}

pub struct LaunchOptions<'a> {
    pub url: &'a str,
    pub proxy: Option<&'a str>,
    pub interface: Option<&'a str>,
    pub batch: bool,
}

pub fn build_arguments(profile: &ServerProfile, options: &LaunchOptions) -> Vec<String> {
    let mut arguments = vec![format!("--protocol={}", profile.protocol.cli_name())];
    if !profile.username.is_empty() {
        arguments.push(format!("--user={}", profile.username));
    }
    if !profile.group.is_empty() {
        arguments.push(format!("--authgroup={}", profile.group));
    }
    if profile.has_password() {
        arguments.push("--passwd-on-stdin".into());
    }
    if options.batch {
        arguments.push("--non-inter".into());
    }
    if !profile.server_certificate.is_empty() {
        arguments.push(format!("--servercert={}", profile.server_certificate));
    }
    if let Some(proxy) = options.proxy {
        arguments.push(format!("--proxy={proxy}"));
    }
    if profile.disable_dtls {
        arguments.push("--no-dtls".into());
    }
    if let Some(interface) = options.interface {
        arguments.push(format!("--interface={interface}"));
    }
    arguments.push("-v".into());
    arguments.push(options.url.to_string());
    arguments
}

#[derive(Default)]
struct TunnelState {
    connected: bool,
    info: NetworkInfo,
    dtls: Option<bool>,
    authentication_failed: bool,
    stop: Option<(ControlCommand, Instant)>,
}

pub struct CliSession {
    binary: String,
    elevation: Option<&'static str>,
    profile: ServerProfile,
    events: EventSender,
    gateway: Option<Gateway>,
    proxy: Option<String>,
    commands: Option<CommandReceiver>,
    child: Option<Child>,
    lines: Option<mpsc::Receiver<String>>,
    tunnel: TunnelState,
    last_error: String,
}

impl CliSession {
    pub fn new(
        binary: &str,
        elevation: Option<&'static str>,
        profile: ServerProfile,
        events: EventSender,
    ) -> Self {
        Self {
            binary: binary.to_string(),
            elevation,
            profile,
            events,
            gateway: None,
            proxy: None,
            commands: None,
            child: None,
            lines: None,
            tunnel: TunnelState::default(),
            last_error: String::new(),
        }
    }

    fn interface(&self) -> Option<&'static str> {
        cfg!(target_os = "linux").then_some(INTERFACE_NAME)
    }

    fn spawn(&mut self, attempt: Attempt) -> Result<()> {
        let Some(gateway) = &self.gateway else {
            return Err(Error::Session("No server URL configured".into()));
        };
        let url = gateway.url();
        let arguments = build_arguments(
            &self.profile,
            &LaunchOptions {
                url: &url,
                proxy: self.proxy.as_deref(),
                interface: self.interface(),
                batch: attempt == Attempt::Batch,
            },
        );

        let (program, arguments) = match self.elevation {
            Some(elevation) => {
                let mut wrapped = vec![self.binary.clone()];
                wrapped.extend(arguments);
                (elevation.to_string(), wrapped)
            }
            None => (self.binary.clone(), arguments),
        };
        log::info!(
            "[connect] spawning: {program} {}",
            arguments
                .iter()
                .map(|argument| if argument.starts_with("--proxy=") {
                    "--proxy=…"
                } else {
                    argument.as_str()
                })
                .collect::<Vec<_>>()
                .join(" ")
        );

        let mut child = system::hidden_command(&program)
            .args(&arguments)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| Error::Session(format!("Failed to start {program}: {error}")))?;

        if let Some(mut stdin) = child.stdin.take()
            && self.profile.has_password()
            && let Err(error) = writeln!(stdin, "{}", self.profile.password)
        {
            log::warn!("[connect] failed to pass the password to openconnect: {error}");
        }

        let (sender, receiver) = mpsc::channel();
        if let Some(stdout) = child.stdout.take() {
            start_line_pump("stdout", stdout, sender.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            start_line_pump("stderr", stderr, sender);
        } else {
            log::warn!("[connect] no stderr pipe from openconnect");
        }

        self.child = Some(child);
        self.lines = Some(receiver);
        self.tunnel = TunnelState::default();
        self.last_error.clear();
        Ok(())
    }

    fn handle_line(&mut self, line: &str) {
        let classified = classify(line);
        if let OutputLine::Traffic(stats) = classified {
            self.events.stats(stats);
            return;
        }
        self.events.log(line);

        match classified {
            OutputLine::Connected { ip, ip6 } => {
                log::info!("[detect] connection confirmed: {line}");
                self.tunnel.connected = true;
                self.tunnel.info.ip = ip;
                self.tunnel.info.ip6 = ip6;
            }
            OutputLine::DtlsEstablished => self.tunnel.dtls = Some(true),
            OutputLine::DtlsFailed => {
                self.tunnel.dtls = Some(false);
                self.last_error = line.trim().to_string();
            }
            OutputLine::AuthenticationFailed => {
                log::warn!("[detect] authentication failure: {line}");
                self.tunnel.authentication_failed = true;
                self.last_error = line.trim().to_string();
            }
            OutputLine::Dns(server) => {
                if !self.tunnel.info.dns.is_empty() {
                    self.tunnel.info.dns.push_str(", ");
                }
                self.tunnel.info.dns.push_str(&server);
            }
            OutputLine::CertificatePin(pin) => {
                self.events.log(&format!(
                    "Server certificate pin: {pin} (add it to the server entry to trust this gateway)"
                ));
            }
            OutputLine::Traffic(_) => {}
            OutputLine::Other => {
                let lower = line.to_lowercase();
                if lower.contains("failed") || lower.contains("error") {
                    self.last_error = line.trim().to_string();
                }
            }
        }
    }

    /// Processes every line already read from the child.
    fn drain_lines(&mut self) {
        let Some(lines) = self.lines.take() else {
            return;
        };
        while let Ok(line) = lines.try_recv() {
            self.handle_line(&line);
        }
        self.lines = Some(lines);
    }

    /// Collects output still in flight after the child exited.
    fn drain_remaining(&mut self) {
        let Some(lines) = self.lines.take() else {
            return;
        };
        while let Ok(line) = lines.recv_timeout(OUTPUT_DRAIN_TIMEOUT) {
            self.handle_line(&line);
        }
    }

    fn poll_commands(&mut self, timeout: Duration) {
        let Some(commands) = self.commands.as_mut() else {
            std::thread::sleep(timeout);
            return;
        };
        match commands.poll(timeout) {
            Ok(Poll::Command(command)) => self.handle_command(command),
            Ok(Poll::Idle) => {}
            Ok(Poll::Closed) => {
                log::debug!("[control] command channel closed");
                self.commands = None;
            }
            Err(error) => {
                log::warn!("[control] command channel error: {error}");
                self.commands = None;
            }
        }
    }

    fn handle_command(&mut self, command: ControlCommand) {
        let Some(child) = self.child.as_mut() else {
            log::debug!("[control] {command:?} ignored, openconnect not running");
            return;
        };
        let process_id = child.id();
        let elevated = self.elevation.is_some();

        match command {
            ControlCommand::Stats => {
                if let Some(interface) = self.interface()
                    && let Some(stats) = system::interface_counters(interface)
                {
                    self.events.stats(stats);
                } else {
                    system::send_signal(process_id, Signal::User1, elevated);
                }
            }
            ControlCommand::Cancel | ControlCommand::Detach => {
                if self.tunnel.stop.is_some() {
                    return;
                }
                let signal = if command == ControlCommand::Cancel {
                    Signal::Interrupt
                } else {
                    Signal::Hangup
                };
                if !system::send_signal(process_id, signal, elevated)
                    && let Err(error) = child.kill()
                {
                    log::warn!("[control] failed to stop openconnect: {error}");
                }
                self.tunnel.stop = Some((command, Instant::now()));
            }
        }
    }

    fn try_exit(&mut self) -> Option<ExitStatus> {
        let child = self.child.as_mut()?;
        match child.try_wait() {
            Ok(Some(status)) => {
                log::info!("[session] openconnect exited: {status}");
                self.child = None;
                self.drain_remaining();
                Some(status)
            }
            Ok(None) => None,
            Err(error) => {
                log::warn!("[session] failed to query openconnect status: {error}");
                None
            }
        }
    }

    fn force_stop_if_overdue(&mut self) {
        let Some((_, since)) = self.tunnel.stop else {
            return;
        };
        if since.elapsed() < GRACEFUL_SHUTDOWN_TIMEOUT {
            return;
        }
        if let Some(child) = self.child.as_mut() {
            log::warn!("[session] graceful shutdown timed out, killing openconnect");
            force_kill(child, self.elevation.is_some());
            self.tunnel.stop = Some((ControlCommand::Cancel, Instant::now()));
        }
    }

    fn failure(&self, status: ExitStatus) -> Error {
        if self.last_error.is_empty() || matches!(status.code(), Some(126 | 127)) {
            Error::Session(exit_message(status, &self.binary))
        } else {
            Error::Session(self.last_error.clone())
        }
    }

    fn stop_requested(&self) -> bool {
        self.tunnel.stop.is_some()
    }

    /// Lets a signalled openconnect log off, killing it once the grace period runs out.
    fn wait_for_exit(&mut self) {
        while self.child.is_some() {
            if self.try_exit().is_some() {
                return;
            }
            self.drain_lines();
            self.force_stop_if_overdue();
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    fn terminate(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        force_kill(&mut child, self.elevation.is_some());
        if let Err(error) = child.wait() {
            log::warn!("[session] openconnect wait error: {error}");
        }
        self.lines = None;
    }
}

fn start_line_pump(name: &'static str, stream: impl Read + Send + 'static, lines: mpsc::Sender<String>) {
    std::thread::spawn(move || {
        for line in BufReader::new(stream).lines() {
            match line {
                Ok(line) => {
                    if lines.send(line).is_err() {
                        break;
                    }
                }
                Err(error) => {
                    log::trace!("[child {name}] reader ended: {error}");
                    break;
                }
            }
        }
    });
}

fn force_kill(child: &mut Child, elevated: bool) {
    if child.kill().is_err() && elevated {
        let process_id = child.id().to_string();
        system::run_silent("pkexec", &["kill", "-KILL", &process_id]);
    }
}

impl VpnSession for CliSession {
    fn parse_url(&mut self, url: &str) -> Result<()> {
        self.gateway = Some(Gateway::parse(url)?);
        Ok(())
    }

    fn gateway(&self) -> Option<&Gateway> {
        self.gateway.as_ref()
    }

    fn set_proxy(&mut self, proxy_url: &str) -> Result<()> {
        if proxy_url.trim().is_empty() {
            return Err(Error::Setup("Empty proxy URL".into()));
        }
        self.proxy = Some(proxy_url.trim().to_string());
        Ok(())
    }

    fn command_channel(&mut self) -> Result<CommandSender> {
        let (sender, receiver) = control::channel().map_err(Error::Ipc)?;
        self.commands = Some(receiver);
        Ok(sender)
    }

    fn profile(&self) -> &ServerProfile {
        &self.profile
    }

    fn profile_mut(&mut self) -> &mut ServerProfile {
        &mut self.profile
    }

    fn connect(&mut self, attempt: Attempt) -> Result<()> {
        self.spawn(attempt)?;
        loop {
            self.poll_commands(POLL_INTERVAL);
            self.drain_lines();
            if self.tunnel.connected {
                return Ok(());
            }
            if let Some(status) = self.try_exit() {
                if self.stop_requested() {
                    return Err(Error::Session("Connection cancelled".into()));
                }
                return Err(self.failure(status));
            }
            if self.tunnel.authentication_failed && attempt == Attempt::Batch {
                self.terminate();
                return Err(Error::Session(self.last_error.clone()));
            }
            self.force_stop_if_overdue();
        }
    }

    fn dtls_connect(&mut self) -> Result<()> {
        if self.profile.disable_dtls {
            return Ok(());
        }
        let started = Instant::now();
        while started.elapsed() < DTLS_TIMEOUT {
            self.drain_lines();
            match self.tunnel.dtls {
                Some(true) => return Ok(()),
                Some(false) => return Err(Error::Session(self.last_error.clone())),
                None => {}
            }
            if self.stop_requested() {
                self.wait_for_exit();
                return Err(Error::Closed(String::new()));
            }
            if let Some(status) = self.try_exit() {
                let message = if status.success() {
                    String::new()
                } else {
                    self.failure(status).to_string()
                };
                return Err(Error::Closed(message));
            }
            if self.child.is_none() {
                return Err(Error::Closed(String::new()));
            }
            self.poll_commands(POLL_INTERVAL);
        }
        Err(Error::Session(
            "DTLS connection not established, continuing over TLS".into(),
        ))
    }

    fn info(&self) -> NetworkInfo {
        self.tunnel.info.clone()
    }

    fn mainloop(&mut self) -> Result<()> {
        if self.child.is_none() {
            return Err(Error::Session("Not connected".into()));
        }
        loop {
            self.poll_commands(POLL_INTERVAL);
            self.drain_lines();
            if let Some(status) = self.try_exit() {
                if self.stop_requested() || status.success() {
                    return Ok(());
                }
                return Err(self.failure(status));
            }
            self.force_stop_if_overdue();
        }
    }

    fn last_error(&self) -> String {
        self.last_error.clone()
    }

    fn reset(&mut self) {
        self.terminate();
        self.tunnel = TunnelState::default();
        self.last_error.clear();
    }
}

impl Drop for CliSession {
    fn drop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Ok(Some(_)) = child.try_wait() {
            return;
        }
        let elevated = self.elevation.is_some();
        std::thread::spawn(move || {
            let process_id = child.id();
            system::send_signal(process_id, Signal::Hangup, elevated);

            let poll_count = GRACEFUL_SHUTDOWN_TIMEOUT.as_millis() / POLL_INTERVAL.as_millis();
            for _ in 0..poll_count {
                if let Ok(Some(status)) = child.try_wait() {
                    log::info!("[terminate] openconnect exited: {status}");
                    return;
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            log::warn!("[terminate] openconnect pid={process_id} ignored SIGHUP, killing");
            force_kill(&mut child, elevated);
            if let Err(error) = child.wait() {
                log::warn!("[terminate] wait error: {error}");
            }
        });
    }
}

pub struct CliSessionFactory {
    binary: String,
    elevation: Option<&'static str>,
}

impl CliSessionFactory {
    pub fn new(binary: String) -> Self {
        Self {
            binary,
            elevation: system::elevation_program(),
        }
    }
}

impl SessionFactory for CliSessionFactory {
    fn create(
        &self,
        profile: ServerProfile,
        events: EventSender,
    ) -> Result<Box<dyn VpnSession + Send>> {
        Ok(Box::new(CliSession::new(
            &self.binary,
            self.elevation,
            profile,
            events,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bridge::{BridgeMessage, SessionLog, bridge},
        settings::Protocol,
    };

    #[test]
    fn test_classify_connected() {
        assert_eq!(
            classify("Connected as 10.0.0.2 + 2001:db8::2/64, using SSL, with DTLS in progress"),
            OutputLine::Connected {
                ip: "10.0.0.2".into(),
                ip6: "2001:db8::2/64".into()
            }
        );
        assert_eq!(
            classify("Connected tun0 as 192.168.5.10, using SSL"),
            OutputLine::Connected {
                ip: "192.168.5.10".into(),
                ip6: String::new()
            }
        );
        assert_eq!(
            classify("Configured as 10.1.2.3, with SSL connected and DTLS in progress"),
            OutputLine::Connected {
                ip: "10.1.2.3".into(),
                ip6: String::new()
            }
        );
        assert_eq!(
            classify("Connected to HTTPS on vpn.example.com with ciphersuite TLS1.3"),
            OutputLine::Other
        );
    }

    #[test]
    fn test_classify_dtls_and_auth() {
        assert_eq!(
            classify("Established DTLS connection (using GnuTLS)."),
            OutputLine::DtlsEstablished
        );
        assert_eq!(
            classify("DTLS handshake failed: Resource temporarily unavailable"),
            OutputLine::DtlsFailed
        );
        for line in [
            "Failed to authenticate",
            "Login failed.",
            "Authentication failed: bad password",
        ] {
            assert_eq!(classify(line), OutputLine::AuthenticationFailed);
        }
    }

    #[test]
    fn test_classify_dns_traffic_and_pin() {
        assert_eq!(
            classify("X-CSTP-DNS: 10.0.0.1"),
            OutputLine::Dns("10.0.0.1".into())
        );
        assert_eq!(
            classify("RX: 10 packets (2048 B); TX: 5 packets (512 B)"),
            OutputLine::Traffic(TrafficStats {
                tx_bytes: 512,
                rx_bytes: 2048
            })
        );
        assert_eq!(
            classify("    --servercert pin-sha256:abcDEF="),
            OutputLine::CertificatePin("pin-sha256:abcDEF=".into())
        );
        assert_eq!(classify("POST https://vpn.example.com/"), OutputLine::Other);
    }

    #[test]
    fn test_arguments_for_full_profile() {
        let mut profile = ServerProfile::new("gw");
        profile.username = "alice".into();
        profile.group = "staff".into();
        profile.password = "secret".into();
        profile.protocol = Protocol::Gp;
        profile.server_certificate = "pin-sha256:xyz".into();
        profile.disable_dtls = true;

        let arguments = build_arguments(
            &profile,
            &LaunchOptions {
                url: "https://gw:443",
                proxy: Some("http://proxy:3128"),
                interface: Some(INTERFACE_NAME),
                batch: true,
            },
        );
        assert_eq!(
            arguments,
            vec![
                "--protocol=gp",
                "--user=alice",
                "--authgroup=staff",
                "--passwd-on-stdin",
                "--non-inter",
                "--servercert=pin-sha256:xyz",
                "--proxy=http://proxy:3128",
                "--no-dtls",
                "--interface=oc-ui0",
                "-v",
                "https://gw:443",
            ]
        );
    }

    #[test]
    fn test_arguments_for_bare_profile() {
        let arguments = build_arguments(
            &ServerProfile::new("gw"),
            &LaunchOptions {
                url: "https://gw",
                proxy: None,
                interface: None,
                batch: false,
            },
        );
        assert_eq!(arguments, vec!["--protocol=anyconnect", "-v", "https://gw"]);
    }

    #[test]
    fn test_output_updates_network_info() {
        let log = SessionLog::new();
        let (events, mut receiver) = bridge(log.clone());
        let mut session = CliSession::new("openconnect", None, ServerProfile::new("gw"), events);

        for line in [
            "X-CSTP-DNS: 10.0.0.1",
            "X-CSTP-DNS: 10.0.0.2",
            "Connected as 10.0.0.7 + fd00::7/64, using SSL",
            "Established DTLS connection (using OpenSSL).",
            "RX: 1 packets (1500 B); TX: 2 packets (3000 B)",
        ] {
            session.handle_line(line);
        }

        let info = session.info();
        assert_eq!(info.ip, "10.0.0.7");
        assert_eq!(info.ip6, "fd00::7/64");
        assert_eq!(info.dns, "10.0.0.1, 10.0.0.2");
        assert!(session.tunnel.connected);
        assert_eq!(session.tunnel.dtls, Some(true));
        assert_eq!(log.len(), 4);

        let mut stats = None;
        while let Ok(Some(message)) = receiver.try_next() {
            if let BridgeMessage::Stats(update) = message {
                stats = Some(update);
            }
        }
        assert_eq!(
            stats,
            Some(TrafficStats {
                tx_bytes: 3000,
                rx_bytes: 1500
            })
        );
    }

    #[test]
    fn test_failure_lines_become_last_error() {
        let (events, _receiver) = bridge(SessionLog::new());
        let mut session = CliSession::new("openconnect", None, ServerProfile::new("gw"), events);

        session.handle_line("Failed to connect to host vpn.example.com");
        assert_eq!(session.last_error(), "Failed to connect to host vpn.example.com");

        session.handle_line("Login failed.");
        assert!(session.tunnel.authentication_failed);
        assert_eq!(session.last_error(), "Login failed.");

        session.reset();
        assert!(session.last_error().is_empty());
        assert!(!session.tunnel.authentication_failed);
    }

    #[test]
    fn test_mainloop_requires_connection() {
        let (events, _receiver) = bridge(SessionLog::new());
        let mut session = CliSession::new("openconnect", None, ServerProfile::new("gw"), events);
        assert!(session.mainloop().is_err());
        assert!(session.connect(Attempt::Batch).is_err());
    }

    #[test]
    fn test_proxy_and_url() {
        let (events, _receiver) = bridge(SessionLog::new());
        let mut session = CliSession::new("openconnect", None, ServerProfile::new("gw"), events);
        assert!(session.parse_url("vpn.example.com:443").is_ok());
        assert_eq!(session.gateway().unwrap().host, "vpn.example.com");
        assert!(session.set_proxy("  ").is_err());
        assert!(session.set_proxy("socks5://proxy:1080").is_ok());
        assert!(session.command_channel().is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_messages() {
        use std::os::unix::process::ExitStatusExt;

        let status = |code: i32| ExitStatus::from_raw(code << 8);
        assert!(exit_message(status(126), "openconnect").starts_with("pkexec authentication"));
        assert!(exit_message(status(127), "openconnect").contains("'openconnect' not found"));
        assert_eq!(
            exit_message(status(1), "openconnect"),
            "openconnect exited with code 1"
        );
    }
}
