//! Integration Test Harness
//!
//! Runs a beacon in-process on a loopback socket and provides helpers for
//! talking to it from a controller socket.

#![allow(dead_code)]

use beacon_daemon::{BeaconConfig, ControlInput, Scheduler, SimulatedSensors};
use beacon_protocol::FRAME_SIZE;
use beacon_transport::bind_udp;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

/// Tick period used by test beacons
pub const TEST_TICK_MS: u64 = 20;

/// How long to wait for a datagram before giving up
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// A beacon running on a background task
pub struct BeaconHandle {
    pub addr: SocketAddr,
    pub input: ControlInput,
    task: JoinHandle<()>,
}

impl Drop for BeaconHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn a beacon on `127.0.0.1:0` sending telemetry to `remote_port`
pub async fn spawn_beacon(
    remote_port: u16,
    configure: impl FnOnce(&mut BeaconConfig),
) -> BeaconHandle {
    let mut config = BeaconConfig::default();
    config.network.listen = SocketAddr::from(([127, 0, 0, 1], 0));
    config.network.remote_port = remote_port;
    config.scheduler.tick_interval_ms = TEST_TICK_MS;
    configure(&mut config);

    let socket = bind_udp(config.network.listen)
        .await
        .expect("Failed to bind beacon socket");
    let addr = socket.local_addr().expect("Beacon socket has no address");

    let input = ControlInput::new();
    let sensors = Arc::new(SimulatedSensors::new(&config.sensors, input.clone()));
    let scheduler =
        Scheduler::from_config(&config, socket, sensors).expect("Failed to build scheduler");

    BeaconHandle {
        addr,
        input,
        task: tokio::spawn(scheduler.run()),
    }
}

/// Bind a controller-side socket on an ephemeral loopback port
pub async fn controller_socket() -> UdpSocket {
    UdpSocket::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind controller socket")
}

/// Receive one datagram, or `None` after `timeout`
pub async fn recv_within(socket: &UdpSocket, timeout: Duration) -> Option<(Vec<u8>, SocketAddr)> {
    let mut buf = [0u8; 256];
    match tokio::time::timeout(timeout, socket.recv_from(&mut buf)).await {
        Ok(Ok((n, from))) => Some((buf[..n].to_vec(), from)),
        _ => None,
    }
}

/// Receive datagrams until one of `len` bytes arrives
pub async fn recv_len(socket: &UdpSocket, len: usize) -> Option<(Vec<u8>, SocketAddr)> {
    let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            return None;
        }
        let (payload, from) = recv_within(socket, remaining).await?;
        if payload.len() == len {
            return Some((payload, from));
        }
    }
}

/// Receive the next telemetry frame
pub async fn recv_frame(socket: &UdpSocket) -> Option<(Vec<u8>, SocketAddr)> {
    recv_len(socket, FRAME_SIZE).await
}
