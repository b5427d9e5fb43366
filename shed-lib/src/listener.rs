use crate::reading::{CountersReading, InfoReading, PersistedReading, Reading, decode_packet, declared_length};
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Receives decoded readings from a running poller.
///
/// All methods default to no-ops, so a listener only implements the kinds it
/// cares about. For every reading the kind-specific method runs first, then
/// [`on_reading`](ReadingListener::on_reading).
///
/// Methods are called from the poller's receive task and must not block.
pub trait ReadingListener: Send + Sync {
    fn on_info(&self, _reading: &InfoReading) {}

    fn on_counters(&self, _reading: &CountersReading) {}

    fn on_persisted(&self, _reading: &PersistedReading) {}

    /// Catch-all, called for every reading after the kind-specific method
    fn on_reading(&self, _reading: &Reading) {}
}

/// Forwards every reading into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<Reading>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Reading>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ReadingListener for ChannelListener {
    fn on_reading(&self, reading: &Reading) {
        if self.tx.send(reading.clone()).is_err() {
            trace!("Reading channel closed, dropping {}", reading.kind());
        }
    }
}

/// Adapts a closure into a catch-all listener.
pub struct FnListener<F>(F);

pub fn listener_fn<F>(f: F) -> FnListener<F>
where
    F: Fn(&Reading) + Send + Sync,
{
    FnListener(f)
}

impl<F> ReadingListener for FnListener<F>
where
    F: Fn(&Reading) + Send + Sync,
{
    fn on_reading(&self, reading: &Reading) {
        (self.0)(reading)
    }
}

/// Receive path: decodes datagrams and fans readings out to listeners.
///
/// Shared between the poller and its receive task. Listeners added through
/// [`add`](Dispatcher::add) see the next datagram, even while running.
pub(crate) struct Dispatcher {
    listeners: RwLock<Vec<Arc<dyn ReadingListener>>>,
    running: Arc<AtomicBool>,
}

impl Dispatcher {
    pub(crate) fn new(running: Arc<AtomicBool>) -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            running,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_listener(self, listener: Arc<dyn ReadingListener>) -> Self {
        self.add(listener);
        self
    }

    pub(crate) fn add(&self, listener: Arc<dyn ReadingListener>) {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.push(listener);
        }
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.read().map(|l| l.len()).unwrap_or(0)
    }

    /// Handle one inbound datagram. Never fails: undecodable datagrams are
    /// logged and dropped, and anything arriving after stop is ignored.
    pub(crate) fn on_datagram(&self, bytes: &[u8], from: SocketAddr) {
        if !self.running.load(Ordering::Acquire) {
            debug!(%from, len = bytes.len(), "Ignoring datagram received after stop");
            return;
        }

        debug!(%from, declared = ?declared_length(bytes), bytes = hex::encode(bytes), "UDP Read");

        let reading = match decode_packet(bytes) {
            Ok(reading) => reading,
            Err(e) => {
                warn!(%from, "Dropping datagram: {}", e);
                return;
            }
        };

        // Listeners run without the lock held
        let listeners = match self.listeners.read() {
            Ok(listeners) => listeners.clone(),
            Err(_) => return,
        };
        for listener in &listeners {
            match &reading {
                Reading::Info(r) => listener.on_info(r),
                Reading::Counters(r) => listener.on_counters(r),
                Reading::Persisted(r) => listener.on_persisted(r),
            }
            listener.on_reading(&reading);
        }
    }
}
