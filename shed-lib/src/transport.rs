//! Datagram transport used by the poller.
//!
//! The poller never creates sockets itself; it asks a [`SocketFactory`] for
//! one on `start()`. Production code uses [`UdpSocketFactory`], tests can
//! inject an in-memory implementation.

use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::UdpSocket;

/// An unconnected datagram socket.
pub trait DatagramSocket: Send + Sync + 'static {
    /// Send one datagram to `target`, returns number of bytes sent
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> impl Future<Output = io::Result<usize>> + Send;

    /// Wait for the next datagram, returns its length and sender
    fn recv_from(&self, buf: &mut [u8]) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send;
}

/// Opens a fresh socket each time the poller starts.
pub trait SocketFactory: Send + Sync + 'static {
    type Socket: DatagramSocket;

    fn open(&self) -> impl Future<Output = io::Result<Self::Socket>> + Send;
}

impl DatagramSocket for UdpSocket {
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, buf, target).await
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf).await
    }
}

/// Binds a tokio UDP socket to an ephemeral local port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpSocketFactory {
    bind_addr: SocketAddr,
}

impl UdpSocketFactory {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self { bind_addr }
    }

    /// Wildcard address of the same family as `target`, any port.
    pub fn for_target(target: SocketAddr) -> Self {
        let ip = match target.ip() {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        };
        Self::new(SocketAddr::new(ip, 0))
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}

impl Default for UdpSocketFactory {
    fn default() -> Self {
        Self::new(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0))
    }
}

impl SocketFactory for UdpSocketFactory {
    type Socket = UdpSocket;

    async fn open(&self) -> io::Result<UdpSocket> {
        UdpSocket::bind(self.bind_addr).await
    }
}
