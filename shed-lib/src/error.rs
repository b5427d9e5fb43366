use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Reasons an inbound datagram could not be turned into a reading.
///
/// All of these are recoverable: the receive path logs them and drops the
/// offending datagram.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed packet: {len} byte(s), need at least 2 to read the command kind")]
    Malformed { len: usize },

    #[error("{kind} packet too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown command kind 0x{0:02x}")]
    UnknownCommand(u8),
}

/// The primary error type for the `shed-lib` library.
#[derive(Error, Debug)]
pub enum ShedError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Failed to send frame to {target}: {source}")]
    SendFailed {
        target: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Poller is not running")]
    NotRunning,

    #[error("Failed to open UDP socket: {0}")]
    Bind(#[source] io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
