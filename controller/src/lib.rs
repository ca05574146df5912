//! Field Beacon Controller
//!
//! The other end of the beacon link: issues challenges, verifies the XOR
//! response, then accepts telemetry only from the beacon that answered.

pub mod config;
pub mod link;
pub mod mission_log;
pub mod session;
pub mod watchdog;

pub use config::ControllerConfig;
pub use link::ControllerLink;
pub use mission_log::{MissionEvent, MissionEventKind, MissionLog};
pub use session::{ControllerSession, SessionEvent, SessionState};
pub use watchdog::{TelemetryWatchdog, WatchdogStatus};
