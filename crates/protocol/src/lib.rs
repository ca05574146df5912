//! Field Beacon Protocol - Frame definitions and handshake transform
//!
//! This crate defines the wire-level pieces shared by the beacon and its
//! controller:
//! - `TelemetryFrame`: the fixed 28-byte telemetry record
//! - `StatusCode`: operator status carried in every frame
//! - Handshake helpers: the single-byte XOR challenge/response
//!
//! Frames are encoded field by field in little-endian order, never by
//! reinterpreting in-memory layout.

mod constants;
mod frame;
mod handshake;
mod validation;

pub use constants::*;
pub use frame::*;
pub use handshake::*;
pub use validation::*;
