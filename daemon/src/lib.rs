//! Field Beacon Daemon
//!
//! Links to a controller through a single-byte challenge/response over UDP,
//! then broadcasts a 28-byte telemetry frame every tick.

pub mod config;
pub mod encoder;
pub mod link;
pub mod metrics;
pub mod scheduler;
pub mod sensors;

pub use config::BeaconConfig;
pub use encoder::FrameEncoder;
pub use link::{ChallengePolicy, EndpointPolicy, LinkManager, LinkState};
pub use scheduler::{BeaconContext, Scheduler, TickOutcome};
pub use sensors::{ControlInput, SensorProvider, SensorSnapshot, SimulatedSensors};
