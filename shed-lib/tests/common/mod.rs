//! Common test utilities and shared imports

// Allow unused imports and dead code since this is a shared module
// used across multiple test files - not all items are used in every test file
#[allow(unused_imports)]
pub use bytes::{BufMut, BytesMut};
#[allow(unused_imports)]
pub use shed_lib::command::{Command, RequestFrame, encode_command};
#[allow(unused_imports)]
pub use shed_lib::config::{PollSequence, PollerConfig};
#[allow(unused_imports)]
pub use shed_lib::error::{DecodeError, ShedError};
#[allow(unused_imports)]
pub use shed_lib::listener::{ChannelListener, ReadingListener, listener_fn};
#[allow(unused_imports)]
pub use shed_lib::poller::Poller;
#[allow(unused_imports)]
pub use shed_lib::reading::{CountersReading, InfoReading, PersistedReading, Reading, decode_packet};
#[allow(unused_imports)]
pub use shed_lib::transport::{DatagramSocket, SocketFactory};

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// How long async tests wait for a reading before giving up
#[allow(dead_code)]
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Build an `E` response with the nine floats in wire order
#[allow(dead_code)]
pub fn info_packet(flags: u16, values: [f32; 9]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(40);
    buf.put_u8(40);
    buf.put_u8(b'E');
    buf.put_u16_le(flags);
    for v in values {
        buf.put_f32_le(v);
    }
    buf.to_vec()
}

/// Build a counters response for `kind` (`C` or `c`)
#[allow(dead_code)]
pub fn counters_packet(kind: u8, counters: [u32; 8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(34);
    buf.put_u8(34);
    buf.put_u8(kind);
    for c in counters {
        buf.put_u32_le(c);
    }
    buf.to_vec()
}

/// Build a persisted response for `kind` (`P` or `p`)
#[allow(dead_code)]
pub fn persisted_packet(kind: u8, restarts: u32, exceptions: u32, addr: u32, exc_type: u8, task: &[u8; 8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(24);
    buf.put_u8(24);
    buf.put_u8(kind);
    buf.put_u32_le(restarts);
    buf.put_u32_le(exceptions);
    buf.put_u32_le(addr);
    buf.put_u8(exc_type);
    buf.put_slice(task);
    // Firmware pads the record to an even length
    buf.put_u8(0);
    buf.to_vec()
}

#[allow(dead_code)]
pub fn device_addr() -> SocketAddr {
    "10.0.0.7:666".parse().unwrap()
}

#[allow(dead_code)]
pub fn test_config() -> PollerConfig {
    let addr = device_addr();
    PollerConfig::new(addr.ip(), addr.port()).with_poll_interval_ms(50)
}

/// In-memory stand-in for the network: records every datagram the poller
/// sends and lets a test inject inbound datagrams.
#[derive(Clone)]
#[allow(dead_code)]
pub struct MemoryNetwork {
    sent: Arc<Mutex<Vec<(Vec<u8>, SocketAddr)>>>,
    inbound_tx: mpsc::UnboundedSender<(Vec<u8>, SocketAddr)>,
    inbound_rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<(Vec<u8>, SocketAddr)>>>,
    fail_sends: Arc<AtomicBool>,
    fail_open: Arc<AtomicBool>,
    opened: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl MemoryNetwork {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            inbound_tx,
            inbound_rx: Arc::new(tokio::sync::Mutex::new(inbound_rx)),
            fail_sends: Arc::new(AtomicBool::new(false)),
            fail_open: Arc::new(AtomicBool::new(false)),
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Datagrams sent so far, oldest first
    pub fn sent(&self) -> Vec<(Vec<u8>, SocketAddr)> {
        self.sent.lock().unwrap().clone()
    }

    /// Command bytes of the frames sent so far
    pub fn sent_commands(&self) -> Vec<u8> {
        self.sent().iter().map(|(frame, _)| frame[1]).collect()
    }

    pub fn deliver(&self, bytes: Vec<u8>) {
        self.inbound_tx.send((bytes, device_addr())).unwrap();
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

pub struct MemorySocket {
    network: MemoryNetwork,
}

impl DatagramSocket for MemorySocket {
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        if self.network.fail_sends.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "device unreachable"));
        }
        self.network.sent.lock().unwrap().push((buf.to_vec(), target));
        Ok(buf.len())
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let mut rx = self.network.inbound_rx.lock().await;
        match rx.recv().await {
            Some((data, from)) => {
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                Ok((len, from))
            }
            None => std::future::pending().await,
        }
    }
}

impl SocketFactory for MemoryNetwork {
    type Socket = MemorySocket;

    async fn open(&self) -> io::Result<MemorySocket> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::AddrInUse, "no free port"));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySocket { network: self.clone() })
    }
}

/// Send library logs to the test harness output, filtered by `RUST_LOG`
#[allow(dead_code)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Wait for the next reading or fail the test
#[allow(dead_code)]
pub async fn next_reading(rx: &mut mpsc::UnboundedReceiver<Reading>) -> Reading {
    tokio::time::timeout(RECV_TIMEOUT, rx.recv())
        .await
        .expect("Timed out waiting for a reading")
        .expect("Reading channel closed")
}
