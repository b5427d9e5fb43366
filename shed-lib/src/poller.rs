use crate::command::{Command, RequestFrame};
use crate::config::PollerConfig;
use crate::constants::{MAX_DATAGRAM_SIZE, POLL_CURSOR_MASK};
use crate::error::ShedError;
use crate::listener::{Dispatcher, ReadingListener};
use crate::transport::{DatagramSocket, SocketFactory, UdpSocketFactory};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Fire-and-forget UDP client for a shed controller.
///
/// The poller sends one request per [`poll`](Poller::poll) call, cycling
/// through the configured poll sequence, and decodes whatever the controller
/// sends back on a background receive task. Replies are not matched to
/// requests; each decoded reading is simply handed to the subscribed
/// [`ReadingListener`]s in arrival order.
pub struct Poller<F: SocketFactory = UdpSocketFactory> {
    config: PollerConfig,
    factory: F,
    socket: Option<Arc<F::Socket>>,
    receiver: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    dispatcher: Arc<Dispatcher>,
    cursor: usize,
}

impl Poller<UdpSocketFactory> {
    /// Create a poller that talks to `config.target()` over a real UDP socket
    pub fn new(config: PollerConfig) -> Result<Self, ShedError> {
        let factory = UdpSocketFactory::for_target(config.target());
        Self::with_factory(config, factory)
    }
}

impl<F: SocketFactory> Poller<F> {
    pub fn with_factory(config: PollerConfig, factory: F) -> Result<Self, ShedError> {
        config.validate()?;
        let running = Arc::new(AtomicBool::new(false));
        Ok(Self {
            config,
            factory,
            socket: None,
            receiver: None,
            dispatcher: Arc::new(Dispatcher::new(running.clone())),
            running,
            cursor: 0,
        })
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    pub fn target(&self) -> SocketAddr {
        self.config.target()
    }

    pub fn is_running(&self) -> bool {
        self.socket.is_some()
    }

    /// Position in the poll sequence the next `poll()` will send
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn listener_count(&self) -> usize {
        self.dispatcher.listener_count()
    }

    /// Register a listener for decoded readings.
    ///
    /// Takes effect immediately, including while the poller is running.
    pub fn subscribe(&mut self, listener: Arc<dyn ReadingListener>) {
        self.dispatcher.add(listener);
    }

    /// Open the socket and start the receive task. No-op if already running.
    pub async fn start(&mut self) -> Result<(), ShedError> {
        if self.socket.is_some() {
            return Ok(());
        }

        let socket = Arc::new(self.factory.open().await.map_err(ShedError::Bind)?);
        self.running.store(true, Ordering::Release);

        let receiver = tokio::spawn(receive_loop(socket.clone(), self.dispatcher.clone()));

        self.socket = Some(socket);
        self.receiver = Some(receiver);
        info!(device = %self.target(), sequence = %self.config.sequence, "Poller started");
        Ok(())
    }

    /// Close the socket and cancel the receive task. No-op if not running.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(receiver) = self.receiver.take() {
            receiver.abort();
        }
        if self.socket.take().is_some() {
            info!("Poller stopped");
        }
    }

    /// Send the next command of the poll sequence and advance the cursor.
    ///
    /// The cursor advances even when the send fails, so the next tick moves
    /// on to the next command. Returns the command byte that was sent.
    pub async fn poll(&mut self) -> Result<u8, ShedError> {
        if self.socket.is_none() {
            return Err(ShedError::NotRunning);
        }
        let command = self.config.sequence.get(self.cursor);
        self.cursor = (self.cursor + 1) & POLL_CURSOR_MASK;
        self.send_byte(command).await?;
        Ok(command)
    }

    /// Send one command immediately, outside the poll cycle.
    pub async fn send_command(&self, command: Command) -> Result<(), ShedError> {
        self.send_frame(command.frame()).await
    }

    /// Send an arbitrary command byte.
    pub async fn send_byte(&self, command: u8) -> Result<(), ShedError> {
        self.send_frame(RequestFrame::new(command)).await
    }

    pub async fn fetch_state(&self) -> Result<(), ShedError> {
        self.send_command(Command::FetchState).await
    }

    pub async fn fetch_counters(&self) -> Result<(), ShedError> {
        self.send_command(Command::FetchCounters).await
    }

    pub async fn reset_counters(&self) -> Result<(), ShedError> {
        self.send_command(Command::ResetCounters).await
    }

    pub async fn fetch_persisted(&self) -> Result<(), ShedError> {
        self.send_command(Command::FetchPersisted).await
    }

    pub async fn reset_persisted(&self) -> Result<(), ShedError> {
        self.send_command(Command::ResetPersisted).await
    }

    pub async fn set_relay(&self, on: bool) -> Result<(), ShedError> {
        self.send_command(Command::relay(on)).await
    }

    /// Feed one datagram through the receive path, as the receive task does.
    ///
    /// Datagrams arriving while the poller is stopped are ignored.
    pub fn on_datagram(&self, bytes: &[u8], from: SocketAddr) {
        self.dispatcher.on_datagram(bytes, from);
    }

    async fn send_frame(&self, frame: RequestFrame) -> Result<(), ShedError> {
        let socket = self.socket.as_ref().ok_or(ShedError::NotRunning)?;
        let target = self.target();

        debug!(device = %target, bytes = hex::encode(frame.as_bytes()), "UDP Write");
        socket
            .send_to(frame.as_bytes(), target)
            .await
            .map_err(|source| {
                warn!(device = %target, "Send of {} failed: {}", frame, source);
                ShedError::SendFailed { target, source }
            })?;
        Ok(())
    }
}

impl<F: SocketFactory> Drop for Poller<F> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn receive_loop<S: DatagramSocket>(socket: Arc<S>, dispatcher: Arc<Dispatcher>) {
    let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
    loop {
        match socket.recv_from(&mut buffer).await {
            Ok((len, from)) => dispatcher.on_datagram(&buffer[..len], from),
            Err(e) => {
                error!("UDP recv error: {}", e);
                tokio::time::sleep(RECV_ERROR_BACKOFF).await;
            }
        }
    }
}
