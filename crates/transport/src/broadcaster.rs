//! Fire-and-forget datagram sender for telemetry and handshake responses

use crate::socket::SharedSocket;
use beacon_protocol::{TelemetryFrame, FRAME_SIZE};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Counters accumulated by a [`Broadcaster`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    pub frames_sent: u64,
    pub frames_dropped: u64,
    pub responses_sent: u64,
    pub responses_dropped: u64,
}

/// Sends telemetry frames and handshake responses
///
/// Send failures never reach the caller: they are logged and counted, and
/// the datagram is simply lost. There are no acknowledgements and no retries.
pub struct Broadcaster {
    socket: SharedSocket,
    frames_sent: AtomicU64,
    frames_dropped: AtomicU64,
    responses_sent: AtomicU64,
    responses_dropped: AtomicU64,
}

impl Broadcaster {
    pub fn new(socket: SharedSocket) -> Self {
        Self {
            socket,
            frames_sent: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            responses_sent: AtomicU64::new(0),
            responses_dropped: AtomicU64::new(0),
        }
    }

    /// Serialize `frame` and send it as one datagram
    pub async fn send(&self, frame: &TelemetryFrame, destination: SocketAddr) {
        let bytes = frame.encode();
        debug_assert_eq!(bytes.len(), FRAME_SIZE);

        if self.transmit(&bytes, destination).await {
            trace!("Telemetry -> {}: {}", destination, frame);
            self.frames_sent.fetch_add(1, Ordering::Relaxed);
        } else {
            self.frames_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Send a single-byte handshake response
    pub async fn send_response(&self, response: u8, destination: SocketAddr) {
        if self.transmit(&[response], destination).await {
            trace!("Response {:#04X} -> {}", response, destination);
            self.responses_sent.fetch_add(1, Ordering::Relaxed);
        } else {
            self.responses_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            responses_sent: self.responses_sent.load(Ordering::Relaxed),
            responses_dropped: self.responses_dropped.load(Ordering::Relaxed),
        }
    }

    async fn transmit(&self, payload: &[u8], destination: SocketAddr) -> bool {
        match self.socket.send_datagram(payload, destination).await {
            Ok(n) if n == payload.len() => true,
            Ok(n) => {
                debug!(
                    "Short send to {}: {} of {} bytes",
                    destination,
                    n,
                    payload.len()
                );
                false
            }
            Err(e) => {
                debug!("Send to {} failed: {}", destination, e);
                false
            }
        }
    }
}
