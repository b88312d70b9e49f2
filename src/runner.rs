use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
    time::Duration,
};

use crate::{
    bridge::{Credentials, EventSender, SessionStatus},
    error::Error,
    session::{Attempt, VpnSession},
};

pub const SHUTDOWN_WAIT_ATTEMPTS: u32 = 10;
pub const SHUTDOWN_WAIT_INTERVAL: Duration = Duration::from_millis(200);

/// The UI's view of a session thread.
pub struct RunnerHandle {
    finished: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl RunnerHandle {
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Polls for completion up to `attempts` times; the thread is detached
    /// when it is still running afterwards.
    pub fn wait_bounded(mut self, attempts: u32, interval: Duration) -> bool {
        for _ in 0..attempts {
            if self.is_finished() {
                if let Some(thread) = self.thread.take()
                    && thread.join().is_err()
                {
                    log::warn!("[runner] session thread panicked");
                }
                return true;
            }
            std::thread::sleep(interval);
        }
        log::warn!("[runner] session thread still running, abandoning it");
        false
    }
}

/// Reports the end of the attempt even when the session panics.
struct Completion {
    events: EventSender,
    finished: Arc<AtomicBool>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.finished.store(true, Ordering::Release);
        self.events.status(SessionStatus::Disconnected);
    }
}

pub fn spawn(session: Box<dyn VpnSession + Send>, events: EventSender) -> std::io::Result<RunnerHandle> {
    let finished = Arc::new(AtomicBool::new(false));
    let completion = Completion {
        events: events.clone(),
        finished: finished.clone(),
    };
    let thread = std::thread::Builder::new()
        .name("vpn-session".into())
        .spawn(move || {
            let _completion = completion;
            run(session, &events);
        })?;
    Ok(RunnerHandle {
        finished,
        thread: Some(thread),
    })
}

/// Connect, DTLS, then the main loop. The session is dropped before the
/// disconnected status goes out.
pub fn run(mut session: Box<dyn VpnSession + Send>, events: &EventSender) {
    events.status(SessionStatus::Connecting);

    let Some(entered) = authenticate(session.as_mut(), events) else {
        return;
    };

    match session.dtls_connect() {
        Ok(()) => {}
        Err(Error::Closed(message)) => {
            log::info!("[runner] tunnel closed before it was up");
            if !message.is_empty() {
                events.log(&message);
            }
            return;
        }
        Err(error) => events.log(&error.to_string()),
    }

    let info = session.info();
    log::info!(
        "[runner] connected ip={} ip6={} dns={}",
        info.ip,
        info.ip6,
        info.dns
    );
    events.status(SessionStatus::Connected(info));

    if let Some(credentials) = entered {
        let mut profile = session.profile().clone();
        if !credentials.save_password {
            profile.password.clear();
        }
        events.save_profile(profile);
    }

    if let Err(error) = session.mainloop() {
        events.log(&error.to_string());
    }
}

/// `None` when the attempt failed; `Some(Some(..))` when credentials came from a prompt.
fn authenticate(session: &mut dyn VpnSession, events: &EventSender) -> Option<Option<Credentials>> {
    let mut attempt = if session.profile().has_password() {
        Attempt::Batch
    } else {
        Attempt::Interactive
    };
    let mut remembered: Option<(String, String)> = None;

    loop {
        let mut entered = None;
        if attempt == Attempt::Interactive {
            match prompt(session, events) {
                Some(credentials) => entered = Some(credentials),
                None => {
                    restore(session, remembered.take());
                    events.log("Authentication cancelled");
                    return None;
                }
            }
        }

        match session.connect(attempt) {
            Ok(()) => return Some(entered),
            Err(error) if attempt == Attempt::Batch => {
                log::info!("[runner] batch attempt failed: {error}");
                let profile = session.profile_mut();
                remembered = Some((profile.password.clone(), profile.group.clone()));
                profile.clear_credentials();
                events.log("Authentication failed in batch mode, retrying with batch mode disabled");
                session.reset();
                attempt = Attempt::Interactive;
            }
            Err(error) => {
                restore(session, remembered.take());
                let mut message = session.last_error();
                if message.is_empty() {
                    message = error.to_string();
                }
                events.log(&message);
                return None;
            }
        }
    }
}

fn prompt(session: &mut dyn VpnSession, events: &EventSender) -> Option<Credentials> {
    let profile = session.profile();
    let credentials = events.request_credentials(&profile.name, &profile.username, &profile.group)?;
    let profile = session.profile_mut();
    profile.username = credentials.username.clone();
    profile.password = credentials.password.clone();
    profile.group = credentials.group.clone();
    profile.save_password = credentials.save_password;
    Some(credentials)
}

fn restore(session: &mut dyn VpnSession, remembered: Option<(String, String)>) {
    if let Some((password, group)) = remembered {
        let profile = session.profile_mut();
        profile.password = password;
        profile.group = group;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        bridge::{BridgeMessage, EventReceiver, NetworkInfo, SessionLog, bridge},
        control::{self, CommandReceiver, CommandSender, Poll},
        error::{Error, Result},
        session::Gateway,
        settings::ServerProfile,
    };

    /// Scripted session shared by the runner and controller tests.
    #[derive(Default)]
    pub struct Script {
        pub connect_results: Vec<bool>,
        pub attempts: Vec<(Attempt, String, String)>,
        pub resets: usize,
        pub dropped_profile: Option<ServerProfile>,
        pub dtls_fails: bool,
        pub dtls_closes: bool,
        pub mainloop_calls: usize,
        pub mainloop_waits_for_command: bool,
        /// Keeps the main loop alive after the command channel closes.
        pub hold: bool,
        pub received: Vec<control::ControlCommand>,
    }

    pub struct FakeSession {
        pub profile: ServerProfile,
        pub script: Arc<Mutex<Script>>,
        pub commands: Option<CommandReceiver>,
        pub gateway: Option<Gateway>,
    }

    impl VpnSession for FakeSession {
        fn parse_url(&mut self, url: &str) -> Result<()> {
            self.gateway = Some(Gateway::parse(url)?);
            Ok(())
        }

        fn gateway(&self) -> Option<&Gateway> {
            self.gateway.as_ref()
        }

        fn set_proxy(&mut self, _proxy_url: &str) -> Result<()> {
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
            let mut script = self.script.lock().unwrap();
            script.attempts.push((
                attempt,
                self.profile.password.clone(),
                self.profile.group.clone(),
            ));
            let succeeded = if script.connect_results.is_empty() {
                true
            } else {
                script.connect_results.remove(0)
            };
            if succeeded {
                Ok(())
            } else {
                Err(Error::Session("Login failed.".into()))
            }
        }

        fn dtls_connect(&mut self) -> Result<()> {
            let script = self.script.lock().unwrap();
            if script.dtls_closes {
                return Err(Error::Closed(String::new()));
            }
            if script.dtls_fails {
                return Err(Error::Session("DTLS handshake failed".into()));
            }
            Ok(())
        }

        fn info(&self) -> NetworkInfo {
            NetworkInfo {
                ip: "10.0.0.2".into(),
                ip6: "fd00::2".into(),
                dns: "10.0.0.1".into(),
            }
        }

        fn mainloop(&mut self) -> Result<()> {
            {
                let mut script = self.script.lock().unwrap();
                script.mainloop_calls += 1;
                if !script.mainloop_waits_for_command {
                    return Ok(());
                }
            }
            let Some(commands) = self.commands.as_mut() else {
                return Ok(());
            };
            loop {
                match commands.poll(Duration::from_millis(20)) {
                    Ok(Poll::Command(command)) => {
                        self.script.lock().unwrap().received.push(command);
                        if command != control::ControlCommand::Stats {
                            return Ok(());
                        }
                    }
                    Ok(Poll::Idle) => {}
                    Ok(Poll::Closed) | Err(_) => {
                        if !self.script.lock().unwrap().hold {
                            return Ok(());
                        }
                        std::thread::sleep(Duration::from_millis(20));
                    }
                }
            }
        }

        fn last_error(&self) -> String {
            "Login failed.".into()
        }

        fn reset(&mut self) {
            self.script.lock().unwrap().resets += 1;
        }
    }

    impl Drop for FakeSession {
        fn drop(&mut self) {
            if let Ok(mut script) = self.script.lock() {
                script.dropped_profile = Some(self.profile.clone());
            }
        }
    }

    fn session(profile: ServerProfile, script: &Arc<Mutex<Script>>) -> Box<dyn VpnSession + Send> {
        Box::new(FakeSession {
            profile,
            script: script.clone(),
            commands: None,
            gateway: None,
        })
    }

    fn stored_profile() -> ServerProfile {
        let mut profile = ServerProfile::new("gw");
        profile.username = "alice".into();
        profile.password = "old".into();
        profile.group = "staff".into();
        profile
    }

    /// Answers every credential prompt with `answer` and collects the rest.
    fn collect(mut receiver: EventReceiver, answer: Option<Credentials>) -> Vec<BridgeMessage> {
        let mut messages = Vec::new();
        while let Some(message) = futures::executor::block_on(futures::StreamExt::next(&mut receiver)) {
            if let BridgeMessage::Credentials(request) = &message {
                request.reply.send(answer.clone()).unwrap();
            }
            messages.push(message);
        }
        messages
    }

    fn statuses(messages: &[BridgeMessage]) -> Vec<SessionStatus> {
        messages
            .iter()
            .filter_map(|message| match message {
                BridgeMessage::Status(status) => Some(status.clone()),
                _ => None,
            })
            .collect()
    }

    fn logs(messages: &[BridgeMessage]) -> Vec<String> {
        messages
            .iter()
            .filter_map(|message| match message {
                BridgeMessage::Log(line) => Some(line.clone()),
                _ => None,
            })
            .collect()
    }

    fn run_to_end(
        profile: ServerProfile,
        script: &Arc<Mutex<Script>>,
        answer: Option<Credentials>,
    ) -> Vec<BridgeMessage> {
        let (events, receiver) = bridge(SessionLog::new());
        let handle = spawn(session(profile, script), events).unwrap();
        let messages = collect(receiver, answer);
        assert!(handle.wait_bounded(SHUTDOWN_WAIT_ATTEMPTS, SHUTDOWN_WAIT_INTERVAL));
        messages
    }

    fn typed(password: &str, save_password: bool) -> Credentials {
        Credentials {
            username: "alice".into(),
            password: password.into(),
            group: "staff".into(),
            save_password,
        }
    }

    #[test]
    fn test_batch_success() {
        let script = Arc::new(Mutex::new(Script::default()));
        let messages = run_to_end(stored_profile(), &script, None);

        assert_eq!(
            statuses(&messages),
            vec![
                SessionStatus::Connecting,
                SessionStatus::Connected(NetworkInfo {
                    ip: "10.0.0.2".into(),
                    ip6: "fd00::2".into(),
                    dns: "10.0.0.1".into(),
                }),
                SessionStatus::Disconnected,
            ]
        );
        let script = script.lock().unwrap();
        assert_eq!(script.attempts.len(), 1);
        assert_eq!(script.attempts[0].0, Attempt::Batch);
        assert!(script.dropped_profile.is_some());
        assert!(!messages.iter().any(|m| matches!(m, BridgeMessage::SaveProfile(_))));
    }

    #[test]
    fn test_stop_during_dtls_skips_connected() {
        let script = Arc::new(Mutex::new(Script {
            dtls_closes: true,
            ..Default::default()
        }));
        let messages = run_to_end(stored_profile(), &script, None);

        assert_eq!(
            statuses(&messages),
            vec![SessionStatus::Connecting, SessionStatus::Disconnected]
        );
        assert_eq!(script.lock().unwrap().mainloop_calls, 0);
    }

    #[test]
    fn test_finished_before_disconnected_is_seen() {
        let script = Arc::new(Mutex::new(Script {
            connect_results: vec![false],
            ..Default::default()
        }));
        let (events, mut receiver) = bridge(SessionLog::new());
        let handle = spawn(session(ServerProfile::new("gw"), &script), events).unwrap();

        loop {
            match futures::executor::block_on(futures::StreamExt::next(&mut receiver)) {
                Some(BridgeMessage::Credentials(request)) => {
                    request.reply.send(Some(typed("pw", false))).unwrap();
                }
                Some(BridgeMessage::Status(SessionStatus::Disconnected)) => break,
                Some(_) => {}
                None => panic!("bridge closed before the disconnected status"),
            }
        }

        assert!(handle.is_finished());
    }

    #[test]
    fn test_batch_failure_retries_interactively_once() {
        let script = Arc::new(Mutex::new(Script {
            connect_results: vec![false, true],
            ..Default::default()
        }));
        let messages = run_to_end(stored_profile(), &script, Some(typed("new", true)));

        let script = script.lock().unwrap();
        assert_eq!(script.attempts.len(), 2);
        assert_eq!(script.attempts[0], (Attempt::Batch, "old".into(), "staff".into()));
        assert_eq!(
            script.attempts[1],
            (Attempt::Interactive, "new".into(), "staff".into())
        );
        assert_eq!(script.resets, 1);
        assert!(
            logs(&messages)
                .iter()
                .any(|line| line.ends_with("retrying with batch mode disabled"))
        );

        let saved = messages.iter().find_map(|message| match message {
            BridgeMessage::SaveProfile(profile) => Some(profile.clone()),
            _ => None,
        });
        assert_eq!(saved.unwrap().password, "new");
    }

    #[test]
    fn test_second_failure_restores_credentials() {
        let script = Arc::new(Mutex::new(Script {
            connect_results: vec![false, false],
            ..Default::default()
        }));
        let messages = run_to_end(stored_profile(), &script, Some(typed("wrong", false)));

        assert_eq!(
            statuses(&messages),
            vec![SessionStatus::Connecting, SessionStatus::Disconnected]
        );
        let script = script.lock().unwrap();
        assert_eq!(script.attempts.len(), 2);
        let restored = script.dropped_profile.clone().unwrap();
        assert_eq!(restored.password, "old");
        assert_eq!(restored.group, "staff");
        assert!(logs(&messages).last().unwrap().ends_with("Login failed."));
    }

    #[test]
    fn test_without_password_first_attempt_is_interactive() {
        let script = Arc::new(Mutex::new(Script::default()));
        let messages = run_to_end(ServerProfile::new("gw"), &script, Some(typed("pw", false)));

        let script = script.lock().unwrap();
        assert_eq!(script.attempts.len(), 1);
        assert_eq!(script.attempts[0].0, Attempt::Interactive);

        let saved = messages.iter().find_map(|message| match message {
            BridgeMessage::SaveProfile(profile) => Some(profile.clone()),
            _ => None,
        });
        let saved = saved.unwrap();
        assert_eq!(saved.username, "alice");
        assert!(saved.password.is_empty());
    }

    #[test]
    fn test_cancelled_prompt_ends_attempt() {
        let script = Arc::new(Mutex::new(Script::default()));
        let messages = run_to_end(ServerProfile::new("gw"), &script, None);

        assert_eq!(
            statuses(&messages),
            vec![SessionStatus::Connecting, SessionStatus::Disconnected]
        );
        assert!(script.lock().unwrap().attempts.is_empty());
        assert!(logs(&messages).last().unwrap().ends_with("Authentication cancelled"));
    }

    #[test]
    fn test_dtls_failure_is_not_fatal() {
        let script = Arc::new(Mutex::new(Script {
            dtls_fails: true,
            ..Default::default()
        }));
        let messages = run_to_end(stored_profile(), &script, None);
        assert!(
            statuses(&messages)
                .iter()
                .any(|status| matches!(status, SessionStatus::Connected(_)))
        );
        assert!(
            logs(&messages)
                .iter()
                .any(|line| line.ends_with("DTLS handshake failed"))
        );
    }

    #[test]
    fn test_handle_reports_finished_after_cancel() {
        let script = Arc::new(Mutex::new(Script {
            mainloop_waits_for_command: true,
            ..Default::default()
        }));
        let mut boxed = session(stored_profile(), &script);
        let mut sender = boxed.command_channel().unwrap();
        let (events, receiver) = bridge(SessionLog::new());
        let handle = spawn(boxed, events).unwrap();
        let collector = std::thread::spawn(move || collect(receiver, None));

        sender.send(control::ControlCommand::Cancel).unwrap();
        assert!(handle.wait_bounded(SHUTDOWN_WAIT_ATTEMPTS, SHUTDOWN_WAIT_INTERVAL));

        let messages = collector.join().unwrap();
        assert_eq!(statuses(&messages).last(), Some(&SessionStatus::Disconnected));
        assert_eq!(
            script.lock().unwrap().received,
            vec![control::ControlCommand::Cancel]
        );
    }
}
