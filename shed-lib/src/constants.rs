// Protocol constants for the shed controller

use std::net::{IpAddr, Ipv4Addr};

/// Value of the length tag carried in byte 0 of every request frame
pub const REQUEST_LENGTH_TAG: u8 = 2;

/// Size of an outbound request frame (2 bytes)
pub const REQUEST_FRAME_SIZE: usize = 2;

/// Bytes needed before the command kind can be read (length tag + kind)
pub const MIN_PACKET_SIZE: usize = 2;

/// Minimum size of an `E` (state) response
pub const INFO_PACKET_SIZE: usize = 40;

/// Minimum size of a `C`/`c` (counters) response
pub const COUNTERS_PACKET_SIZE: usize = 34;

/// Minimum size of a `P`/`p` (persisted) response
pub const PERSISTED_PACKET_SIZE: usize = 24;

/// Offset of the exception task name in a persisted response
pub const TASK_NAME_OFFSET: usize = 15;

/// Width of the exception task name window
pub const TASK_NAME_LEN: usize = 8;

/// Light level above which the shed light counts as on
pub const LIGHT_ON_THRESHOLD: f32 = 1.0;

/// Number of slots in the poll rotation; the cursor is masked with `POLL_SEQUENCE_LEN - 1`
pub const POLL_SEQUENCE_LEN: usize = 4;

/// Mask applied to the poll cursor after each increment
pub const POLL_CURSOR_MASK: usize = POLL_SEQUENCE_LEN - 1;

/// Largest datagram the receive path will accept
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Address the controller firmware listens on out of the box
pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 0, 20));

/// UDP port the controller firmware listens on out of the box
pub const DEFAULT_PORT: u16 = 666;

/// Default poll interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 4000;

/// Default poll rotation: state, counters, state, persisted
pub const DEFAULT_POLL_SEQUENCE: &str = "EcEp";
