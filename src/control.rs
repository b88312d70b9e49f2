//! Single-byte command channel from the UI thread into a running session.
//!
//! The bytes match libopenconnect's `OC_CMD_*` values so a session backed by
//! the library could read the same descriptor.

use std::{
    io::{self, Read, Write},
    time::Duration,
};

#[cfg(unix)]
type Stream = std::os::unix::net::UnixStream;

#[cfg(not(unix))]
type Stream = std::net::TcpStream;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    Stats,
    Detach,
    Cancel,
}

impl ControlCommand {
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Stats => b's',
            Self::Detach => b'd',
            Self::Cancel => b'x',
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b's' => Some(Self::Stats),
            b'd' => Some(Self::Detach),
            b'x' => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// The control descriptor held by the UI.
pub struct CommandSender {
    stream: Stream,
}

impl CommandSender {
    pub fn send(&mut self, command: ControlCommand) -> io::Result<()> {
        log::debug!("[control] sending {command:?}");
        self.stream.write_all(&[command.as_byte()])
    }
}

pub enum Poll {
    Command(ControlCommand),
    Idle,
    Closed,
}

pub struct CommandReceiver {
    stream: Stream,
}

impl CommandReceiver {
    /// Waits up to `timeout` for one command byte.
    pub fn poll(&mut self, timeout: Duration) -> io::Result<Poll> {
        self.stream.set_read_timeout(Some(timeout))?;
        let mut byte = [0u8; 1];
        match self.stream.read(&mut byte) {
            Ok(0) => Ok(Poll::Closed),
            Ok(_) => match ControlCommand::from_byte(byte[0]) {
                Some(command) => Ok(Poll::Command(command)),
                None => {
                    log::debug!("[control] ignoring unknown command byte {:#04x}", byte[0]);
                    Ok(Poll::Idle)
                }
            },
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(Poll::Idle)
            }
            Err(error) => Err(error),
        }
    }
}

pub fn channel() -> io::Result<(CommandSender, CommandReceiver)> {
    let (sender, receiver) = stream_pair()?;
    Ok((
        CommandSender { stream: sender },
        CommandReceiver { stream: receiver },
    ))
}

#[cfg(unix)]
fn stream_pair() -> io::Result<(Stream, Stream)> {
    Stream::pair()
}

#[cfg(not(unix))]
fn stream_pair() -> io::Result<(Stream, Stream)> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0))?;
    let sender = Stream::connect(listener.local_addr()?)?;
    let (receiver, _) = listener.accept()?;
    sender.set_nodelay(true)?;
    Ok((sender, receiver))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Duration = Duration::from_millis(50);

    fn expect_command(receiver: &mut CommandReceiver) -> ControlCommand {
        match receiver.poll(SHORT).unwrap() {
            Poll::Command(command) => command,
            Poll::Idle => panic!("expected a command, got idle"),
            Poll::Closed => panic!("expected a command, got closed"),
        }
    }

    #[test]
    fn test_bytes() {
        for command in [
            ControlCommand::Stats,
            ControlCommand::Detach,
            ControlCommand::Cancel,
        ] {
            assert_eq!(ControlCommand::from_byte(command.as_byte()), Some(command));
        }
        assert_eq!(ControlCommand::from_byte(b'?'), None);
    }

    #[test]
    fn test_commands_arrive_in_order() {
        let (mut sender, mut receiver) = channel().unwrap();
        sender.send(ControlCommand::Stats).unwrap();
        sender.send(ControlCommand::Cancel).unwrap();

        assert_eq!(expect_command(&mut receiver), ControlCommand::Stats);
        assert_eq!(expect_command(&mut receiver), ControlCommand::Cancel);
    }

    #[test]
    fn test_idle_on_timeout() {
        let (_sender, mut receiver) = channel().unwrap();
        assert!(matches!(receiver.poll(SHORT).unwrap(), Poll::Idle));
    }

    #[test]
    fn test_closed_when_all_senders_dropped() {
        let (sender, mut receiver) = channel().unwrap();
        drop(sender);
        assert!(matches!(receiver.poll(SHORT).unwrap(), Poll::Closed));
    }

    #[cfg(unix)]
    #[test]
    fn test_send_fails_after_receiver_dropped() {
        let (mut sender, receiver) = channel().unwrap();
        drop(receiver);
        assert!(sender.send(ControlCommand::Cancel).is_err());
    }
}
