use crate::constants::{REQUEST_FRAME_SIZE, REQUEST_LENGTH_TAG};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::Display;

/// Commands understood by the shed controller firmware.
///
/// The discriminant is the ASCII byte sent on the wire. Responses echo the
/// command byte back, so the same enum tags decoded readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, TryFromPrimitive, IntoPrimitive, Serialize, Deserialize)]
#[repr(u8)]
pub enum Command {
    /// `E`: request the latest environment/state block
    #[strum(to_string = "fetch state")]
    FetchState = 0x45,
    /// `c`: request the link counters
    #[strum(to_string = "fetch counters")]
    FetchCounters = 0x63,
    /// `C`: reset the link counters (reply carries the pre-reset values)
    #[strum(to_string = "reset counters")]
    ResetCounters = 0x43,
    /// `p`: request the persisted crash record
    #[strum(to_string = "fetch persisted")]
    FetchPersisted = 0x70,
    /// `P`: reset the persisted crash record
    #[strum(to_string = "reset persisted")]
    ResetPersisted = 0x50,
    /// `r`: open the laser relay
    #[strum(to_string = "relay off")]
    RelayOff = 0x72,
    /// `R`: close the laser relay
    #[strum(to_string = "relay on")]
    RelayOn = 0x52,
}

impl Command {
    /// The command as the ASCII character that goes on the wire.
    pub fn as_char(self) -> char {
        char::from(u8::from(self))
    }

    /// Relay command for the requested relay state.
    pub fn relay(on: bool) -> Self {
        if on { Command::RelayOn } else { Command::RelayOff }
    }

    pub fn frame(self) -> RequestFrame {
        RequestFrame::new(self.into())
    }
}

impl TryFrom<char> for Command {
    type Error = u32;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        let byte = u8::try_from(c).map_err(|_| c as u32)?;
        Command::try_from_primitive(byte).map_err(|e| e.number as u32)
    }
}

/// Encode a single command byte into a 2-byte request frame.
///
/// Any byte is accepted; the firmware ignores commands it does not know.
pub fn encode_command(command: u8) -> [u8; REQUEST_FRAME_SIZE] {
    [REQUEST_LENGTH_TAG, command]
}

/// The 2-byte outbound request: `[length tag, command byte]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestFrame([u8; REQUEST_FRAME_SIZE]);

impl RequestFrame {
    pub fn new(command: u8) -> Self {
        Self(encode_command(command))
    }

    /// Command byte carried by this frame.
    pub fn command(&self) -> u8 {
        self.0[1]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Command> for RequestFrame {
    fn from(command: Command) -> Self {
        command.frame()
    }
}

impl AsRef<[u8]> for RequestFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for RequestFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#04x}, '{}']", self.0[0], char::from(self.0[1]))
    }
}
