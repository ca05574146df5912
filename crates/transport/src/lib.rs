//! Field Beacon Transport - UDP datagram layer
//!
//! This crate provides:
//! - `DatagramSocket`: the seam between link logic and the network
//! - `Broadcaster`: fire-and-forget telemetry and handshake sends
//! - `testing::MockSocket`: an in-memory socket for deterministic tests

mod broadcaster;
mod socket;
pub mod testing;

pub use broadcaster::*;
pub use socket::*;
