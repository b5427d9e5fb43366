use crate::constants::{
    DEFAULT_HOST, DEFAULT_POLL_INTERVAL_MS, DEFAULT_POLL_SEQUENCE, DEFAULT_PORT, POLL_SEQUENCE_LEN,
};
use crate::error::ShedError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

/// Fixed rotation of command bytes sent by successive polls.
///
/// Always exactly four ASCII characters so the poll cursor can wrap by masking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PollSequence([u8; POLL_SEQUENCE_LEN]);

impl PollSequence {
    pub fn get(&self, index: usize) -> u8 {
        self.0[index % POLL_SEQUENCE_LEN]
    }

    pub fn as_bytes(&self) -> &[u8; POLL_SEQUENCE_LEN] {
        &self.0
    }
}

impl Default for PollSequence {
    fn default() -> Self {
        let mut seq = [0u8; POLL_SEQUENCE_LEN];
        seq.copy_from_slice(DEFAULT_POLL_SEQUENCE.as_bytes());
        Self(seq)
    }
}

impl FromStr for PollSequence {
    type Err = ShedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_ascii() {
            return Err(ShedError::InvalidConfig(format!(
                "poll sequence {:?} must be ASCII",
                s
            )));
        }
        let seq: [u8; POLL_SEQUENCE_LEN] = s.as_bytes().try_into().map_err(|_| {
            ShedError::InvalidConfig(format!(
                "poll sequence {:?} must be exactly {} characters, got {}",
                s,
                POLL_SEQUENCE_LEN,
                s.len()
            ))
        })?;
        Ok(Self(seq))
    }
}

impl TryFrom<String> for PollSequence {
    type Error = ShedError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PollSequence> for String {
    fn from(seq: PollSequence) -> Self {
        seq.to_string()
    }
}

impl fmt::Display for PollSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            write!(f, "{}", char::from(b))?;
        }
        Ok(())
    }
}

/// Everything the poller needs to know about the controller it talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Controller IP address
    pub host: IpAddr,
    /// Controller UDP port
    pub port: u16,
    /// Interval between polls, in milliseconds
    pub poll_interval_ms: u64,
    pub sequence: PollSequence,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST,
            port: DEFAULT_PORT,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            sequence: PollSequence::default(),
        }
    }
}

impl PollerConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            host,
            port,
            ..Self::default()
        }
    }

    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn with_sequence(mut self, sequence: PollSequence) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn target(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ShedError> {
        if self.port == 0 {
            return Err(ShedError::InvalidConfig("target port must be non-zero".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ShedError::InvalidConfig("poll interval must be non-zero".to_string()));
        }
        Ok(())
    }
}
