//! Background thread to UI thread propagation: log lines, status changes,
//! traffic statistics and credential prompts travel over one bounded queue
//! that the UI drains on its own event loop.

use std::sync::{Arc, Mutex, mpsc};

use futures::{SinkExt, channel::mpsc as queue};

use crate::{settings::ServerProfile, stats::TrafficStats};

pub const BRIDGE_CAPACITY: usize = 256;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M ";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NetworkInfo {
    pub ip: String,
    pub ip6: String,
    pub dns: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Connecting,
    Connected(NetworkInfo),
    Disconnected,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub group: String,
    pub save_password: bool,
}

pub struct CredentialRequest {
    pub server: String,
    pub username: String,
    pub group: String,
    pub reply: mpsc::Sender<Option<Credentials>>,
}

pub enum BridgeMessage {
    /// Already timestamped and stored in the shared log.
    Log(String),
    Status(SessionStatus),
    Stats(TrafficStats),
    Credentials(CredentialRequest),
    SaveProfile(ServerProfile),
}

/// Append-only, timestamped session log shared by the UI and the session thread.
///
/// Every entry has a position that keeps growing across [`SessionLog::clear`],
/// so readers can resume with [`SessionLog::since`] without seeing a line twice.
#[derive(Clone, Default)]
pub struct SessionLog {
    entries: Arc<Mutex<Entries>>,
}

#[derive(Default)]
struct Entries {
    lines: Vec<String>,
    /// Position of `lines[0]`.
    first: u64,
}

impl Entries {
    fn end(&self) -> u64 {
        self.first + self.lines.len() as u64
    }
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `message` with a timestamp prefix and returns the stored line.
    pub fn append(&self, message: &str) -> Option<String> {
        let message = message.trim_end();
        if message.is_empty() {
            return None;
        }
        let line = format!(
            "{}{message}",
            chrono::Local::now().format(TIMESTAMP_FORMAT)
        );
        let Ok(mut entries) = self.entries.lock() else {
            log::warn!("[log] session log lock poisoned, dropping: {message}");
            return None;
        };
        entries.lines.push(line.clone());
        Some(line)
    }

    /// Lines stored at or after `position`, and the position to resume from.
    pub fn since(&self, position: u64) -> (Vec<String>, u64) {
        let Ok(entries) = self.entries.lock() else {
            return (Vec::new(), position);
        };
        let start = position.saturating_sub(entries.first).min(entries.lines.len() as u64);
        (entries.lines[start as usize..].to_vec(), entries.end())
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.first = entries.end();
            entries.lines.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .map(|entries| entries.lines.len())
            .unwrap_or(0)
    }
}

pub type EventReceiver = queue::Receiver<BridgeMessage>;

#[derive(Clone)]
pub struct EventSender {
    sender: queue::Sender<BridgeMessage>,
    log: SessionLog,
}

pub fn bridge(log: SessionLog) -> (EventSender, EventReceiver) {
    let (sender, receiver) = queue::channel(BRIDGE_CAPACITY);
    (EventSender { sender, log }, receiver)
}

impl EventSender {
    pub fn log(&self, message: &str) {
        log::info!("[session] {}", message.trim_end());
        if let Some(line) = self.log.append(message) {
            self.send(BridgeMessage::Log(line));
        }
    }

    pub fn status(&self, status: SessionStatus) {
        log::debug!("[bridge] status -> {status:?}");
        self.send(BridgeMessage::Status(status));
    }

    pub fn stats(&self, stats: TrafficStats) {
        self.send(BridgeMessage::Stats(stats));
    }

    pub fn save_profile(&self, profile: ServerProfile) {
        self.send(BridgeMessage::SaveProfile(profile));
    }

    /// Blocks the calling thread until the UI answers; `None` when the prompt
    /// was cancelled or the UI is gone.
    pub fn request_credentials(&self, server: &str, username: &str, group: &str) -> Option<Credentials> {
        let (reply, answer) = mpsc::channel();
        let request = CredentialRequest {
            server: server.to_string(),
            username: username.to_string(),
            group: group.to_string(),
            reply,
        };
        if !self.send(BridgeMessage::Credentials(request)) {
            return None;
        }
        answer.recv().ok().flatten()
    }

    /// Waits only while the queue is full.
    fn send(&self, message: BridgeMessage) -> bool {
        let mut sender = self.sender.clone();
        match futures::executor::block_on(sender.send(message)) {
            Ok(()) => true,
            Err(_) => {
                log::debug!("[bridge] UI side closed, dropping message");
                false
            }
        }
    }
}
