pub mod command;
pub mod config;
pub mod constants;
pub mod error;
pub mod listener;
pub mod points;
pub mod poller;
pub mod reading;
pub mod transport;


// Re-export the most used types for easy access
pub use command::{Command, RequestFrame, encode_command};
pub use config::{PollSequence, PollerConfig};
pub use error::{DecodeError, ShedError};
pub use listener::{ChannelListener, ReadingListener, listener_fn};
pub use poller::Poller;
pub use reading::{CountersReading, InfoReading, PersistedReading, Reading, decode_packet};
