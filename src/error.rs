use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("settings error: {0}")]
    Settings(String),

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Failure reported by the VPN engine; the message is shown to the user verbatim.
    #[error("{0}")]
    Session(String),

    #[error("{0}")]
    Setup(String),

    /// The tunnel went away before it was up; an empty message needs no log line.
    #[error("{0}")]
    Closed(String),

    #[error("IPC error: {0}")]
    Ipc(io::Error),
}
