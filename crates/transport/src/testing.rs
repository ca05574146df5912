//! In-memory [`DatagramSocket`] for tests.
//!
//! Inbound datagrams are queued with [`MockSocket::push_inbound`] and handed
//! out one per poll. Receive errors can be queued in between with
//! [`MockSocket::push_recv_error`]. Outbound datagrams are recorded for
//! inspection.
//!
//! ```rust,ignore
//! use beacon_transport::testing::MockSocket;
//!
//! let socket = MockSocket::new();
//! socket.push_inbound(&[0x10], controller_addr);
//! // ... run a tick ...
//! assert_eq!(socket.take_sent()[0].payload, vec![0x52]);
//! ```

use crate::socket::DatagramSocket;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A datagram recorded by [`MockSocket`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentDatagram {
    pub payload: Vec<u8>,
    pub target: SocketAddr,
}

enum Inbound {
    Datagram(Vec<u8>, SocketAddr),
    Error(io::ErrorKind),
}

pub struct MockSocket {
    local: SocketAddr,
    inbound: Mutex<VecDeque<Inbound>>,
    sent: Mutex<Vec<SentDatagram>>,
    fail_sends: AtomicBool,
}

impl MockSocket {
    /// Mock bound to `127.0.0.1:5005`
    pub fn new() -> Arc<Self> {
        Self::bound_to(SocketAddr::from(([127, 0, 0, 1], 5005)))
    }

    pub fn bound_to(local: SocketAddr) -> Arc<Self> {
        Arc::new(Self {
            local,
            inbound: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
        })
    }

    /// Queue a datagram to be returned by the next poll
    pub fn push_inbound(&self, payload: &[u8], from: SocketAddr) {
        self.inbound
            .lock()
            .push_back(Inbound::Datagram(payload.to_vec(), from));
    }

    /// Queue an error to be returned by the next poll
    pub fn push_recv_error(&self, kind: io::ErrorKind) {
        self.inbound.lock().push_back(Inbound::Error(kind));
    }

    /// Number of queued inbound datagrams and errors not yet polled
    pub fn pending_inbound(&self) -> usize {
        self.inbound.lock().len()
    }

    /// Drain everything sent so far
    pub fn take_sent(&self) -> Vec<SentDatagram> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Make every subsequent send fail with `ConnectionRefused`
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DatagramSocket for MockSocket {
    fn try_recv_datagram(&self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        let (payload, from) = match self.inbound.lock().pop_front() {
            None => return Ok(None),
            Some(Inbound::Error(kind)) => return Err(io::Error::new(kind, "mock receive failure")),
            Some(Inbound::Datagram(payload, from)) => (payload, from),
        };

        // Oversized datagrams are cut to the buffer, as the kernel does
        let len = payload.len().min(buf.len());
        buf[..len].copy_from_slice(&payload[..len]);
        Ok(Some((len, from)))
    }

    async fn send_datagram(&self, payload: &[u8], target: SocketAddr) -> io::Result<usize> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "mock send failure",
            ));
        }

        self.sent.lock().push(SentDatagram {
            payload: payload.to_vec(),
            target,
        });
        Ok(payload.len())
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.local)
    }
}
