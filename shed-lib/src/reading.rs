//! Decoding of controller responses.
//!
//! Every response starts with the same two bytes as a request: a length tag
//! (informational only) and the command byte it answers. The rest of the
//! datagram is a fixed little-endian layout that depends on that command:
//!
//! ```text
//! E      : tag | 'E' | flags u16 | 9 x f32                        (>= 40 bytes)
//! C / c  : tag | kind | 8 x u32                                   (>= 34 bytes)
//! P / p  : tag | kind | u32 | u32 | u32 | u8 | task name [8]      (>= 24 bytes)
//! ```
//!
//! Trailing bytes beyond the documented minimum are ignored.

use crate::command::Command;
use crate::constants::{
    COUNTERS_PACKET_SIZE, INFO_PACKET_SIZE, LIGHT_ON_THRESHOLD, MIN_PACKET_SIZE, PERSISTED_PACKET_SIZE,
    TASK_NAME_LEN, TASK_NAME_OFFSET,
};
use crate::error::DecodeError;
use bytes::Buf;
use serde::Serialize;
use std::fmt;

/// State block returned for `E`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InfoReading {
    pub kind: Command,
    pub flags: u16,
    /// Laser relay closed (bit 0 of `flags`)
    pub relay: bool,
    pub inside_temp: f32,  // °C
    pub pressure: f32,     // hPa
    pub humidity: f32,     // %
    pub outside_temp: f32, // °C
    pub light: f32,        // %
    pub laser_inlet_temp: f32,
    pub laser_outlet_temp: f32,
    pub laser_tube_temp: f32,
    pub laser_case_temp: f32,
    /// `light` strictly above 1.0
    pub light_on: bool,
}

/// Link counters returned for `C` and `c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountersReading {
    pub kind: Command,
    pub good_packets: u32,
    pub junk: u32,
    pub checksum_errors: u32,
    pub link_lost: u32,
    pub overflows: u32,
    pub eth_packets: u32,
    pub relay_operations: u32,
    pub restarts: u32,
}

/// Crash record kept across controller restarts, returned for `P` and `p`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedReading {
    pub kind: Command,
    pub restarts: u32,
    pub exceptions: u32,
    pub exception_address: u32,
    pub exception_type: u8,
    /// Name of the task that raised the last exception
    pub exception_task: String,
}

/// Any decoded response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reading {
    Info(InfoReading),
    Counters(CountersReading),
    Persisted(PersistedReading),
}

impl Reading {
    /// Command byte the reading was produced by.
    pub fn kind(&self) -> Command {
        match self {
            Reading::Info(r) => r.kind,
            Reading::Counters(r) => r.kind,
            Reading::Persisted(r) => r.kind,
        }
    }
}

/// Length tag from byte 0 of a datagram, if present.
///
/// The firmware fills this in but nothing checks it against the real size.
pub fn declared_length(bytes: &[u8]) -> Option<u8> {
    bytes.first().copied()
}

/// Decode one inbound datagram.
///
/// Only the overall length and the command byte are validated; field values
/// are taken as-is.
pub fn decode_packet(bytes: &[u8]) -> Result<Reading, DecodeError> {
    if bytes.len() < MIN_PACKET_SIZE {
        return Err(DecodeError::Malformed { len: bytes.len() });
    }

    let kind_byte = bytes[1];
    let kind = Command::try_from(kind_byte).map_err(|_| DecodeError::UnknownCommand(kind_byte))?;

    match kind {
        Command::FetchState => {
            require_len(bytes, "E", INFO_PACKET_SIZE)?;
            Ok(Reading::Info(InfoReading::parse(kind, &bytes[MIN_PACKET_SIZE..])))
        }
        Command::FetchCounters | Command::ResetCounters => {
            require_len(bytes, "C", COUNTERS_PACKET_SIZE)?;
            Ok(Reading::Counters(CountersReading::parse(kind, &bytes[MIN_PACKET_SIZE..])))
        }
        Command::FetchPersisted | Command::ResetPersisted => {
            require_len(bytes, "P", PERSISTED_PACKET_SIZE)?;
            Ok(Reading::Persisted(PersistedReading::parse(kind, bytes)))
        }
        // Relay commands are requests only; the firmware never answers with them.
        Command::RelayOn | Command::RelayOff => Err(DecodeError::UnknownCommand(kind_byte)),
    }
}

fn require_len(bytes: &[u8], kind: &'static str, expected: usize) -> Result<(), DecodeError> {
    if bytes.len() < expected {
        return Err(DecodeError::TooShort {
            kind,
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

impl InfoReading {
    fn parse(kind: Command, mut body: &[u8]) -> Self {
        let flags = body.get_u16_le();
        let inside_temp = body.get_f32_le();
        let pressure = body.get_f32_le();
        let humidity = body.get_f32_le();
        let outside_temp = body.get_f32_le();
        let light = body.get_f32_le();

        Self {
            kind,
            flags,
            relay: flags & 1 != 0,
            inside_temp,
            pressure,
            humidity,
            outside_temp,
            light,
            laser_inlet_temp: body.get_f32_le(),
            laser_outlet_temp: body.get_f32_le(),
            laser_tube_temp: body.get_f32_le(),
            laser_case_temp: body.get_f32_le(),
            light_on: light > LIGHT_ON_THRESHOLD,
        }
    }
}

impl CountersReading {
    fn parse(kind: Command, mut body: &[u8]) -> Self {
        Self {
            kind,
            good_packets: body.get_u32_le(),
            junk: body.get_u32_le(),
            checksum_errors: body.get_u32_le(),
            link_lost: body.get_u32_le(),
            overflows: body.get_u32_le(),
            eth_packets: body.get_u32_le(),
            relay_operations: body.get_u32_le(),
            restarts: body.get_u32_le(),
        }
    }
}

impl PersistedReading {
    fn parse(kind: Command, bytes: &[u8]) -> Self {
        let mut body = &bytes[MIN_PACKET_SIZE..TASK_NAME_OFFSET];
        let restarts = body.get_u32_le();
        let exceptions = body.get_u32_le();
        let exception_address = body.get_u32_le();
        let exception_type = body.get_u8();

        let name_bytes = &bytes[TASK_NAME_OFFSET..TASK_NAME_OFFSET + TASK_NAME_LEN];
        let name_end = name_bytes.iter().position(|&b| b == 0).unwrap_or(TASK_NAME_LEN);
        // 7-bit ASCII: the high bit is dropped, not rejected
        let exception_task = name_bytes[..name_end].iter().map(|&b| char::from(b & 0x7f)).collect();

        Self {
            kind,
            restarts,
            exceptions,
            exception_address,
            exception_type,
            exception_task,
        }
    }
}

impl fmt::Display for InfoReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Relay: {}, Inside: {:.1} °C, Outside: {:.1} °C, {:.1} hPa, {:.1} %RH, Light: {:.1} % ({}), \
             Laser inlet/outlet/tube/case: {:.1}/{:.1}/{:.1}/{:.1} °C",
            if self.relay { "on" } else { "off" },
            self.inside_temp,
            self.outside_temp,
            self.pressure,
            self.humidity,
            self.light,
            if self.light_on { "on" } else { "off" },
            self.laser_inlet_temp,
            self.laser_outlet_temp,
            self.laser_tube_temp,
            self.laser_case_temp
        )
    }
}

impl fmt::Display for CountersReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Good: {}, Junk: {}, Csum errs: {}, Link lost: {}, Overflows: {}, Eth: {}, Relay ops: {}, Restarts: {}",
            self.good_packets,
            self.junk,
            self.checksum_errors,
            self.link_lost,
            self.overflows,
            self.eth_packets,
            self.relay_operations,
            self.restarts
        )
    }
}

impl fmt::Display for PersistedReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Restarts: {}, Exceptions: {}, Last: type {} at {:#010x} in '{}'",
            self.restarts, self.exceptions, self.exception_type, self.exception_address, self.exception_task
        )
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Info(r) => write!(f, "[{}] {}", r.kind.as_char(), r),
            Reading::Counters(r) => write!(f, "[{}] {}", r.kind.as_char(), r),
            Reading::Persisted(r) => write!(f, "[{}] {}", r.kind.as_char(), r),
        }
    }
}
