//! Datagram socket abstraction over `tokio::net::UdpSocket`

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::info;

/// Largest datagram the beacon ever reads; anything longer is truncated by
/// the kernel, which only matters for the first byte anyway.
pub const RECV_BUFFER_SIZE: usize = 64;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// A connectionless datagram endpoint
///
/// Receives are non-blocking polls so a single cooperative loop can check
/// for input without suspending.
#[async_trait]
pub trait DatagramSocket: Send + Sync {
    /// Take one queued datagram, or `Ok(None)` if nothing is waiting
    fn try_recv_datagram(&self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>>;

    /// Send one datagram
    async fn send_datagram(&self, payload: &[u8], target: SocketAddr) -> io::Result<usize>;

    /// Address this socket is bound to
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

pub type SharedSocket = Arc<dyn DatagramSocket>;

#[async_trait]
impl DatagramSocket for UdpSocket {
    fn try_recv_datagram(&self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        match self.try_recv_from(buf) {
            Ok(received) => Ok(Some(received)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn send_datagram(&self, payload: &[u8], target: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, payload, target).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        UdpSocket::local_addr(self)
    }
}

/// Bind a UDP socket and wrap it for shared use
pub async fn bind_udp(addr: SocketAddr) -> Result<SharedSocket, TransportError> {
    let socket = UdpSocket::bind(addr)
        .await
        .map_err(|source| TransportError::Bind { addr, source })?;

    match socket.local_addr() {
        Ok(local) => info!("UDP socket bound to {}", local),
        Err(_) => info!("UDP socket bound to {}", addr),
    }

    Ok(Arc::new(socket))
}
