//! Telemetry frame construction

use crate::sensors::SensorSnapshot;
use beacon_protocol::{StatusCode, TelemetryFrame};

/// Latitude reported at zero uptime (degrees)
pub const BASE_LATITUDE: f64 = 120.5;

/// Longitude reported at zero uptime (degrees)
pub const BASE_LONGITUDE: f64 = 30.2;

/// Simulated drift in degrees per millisecond of uptime
pub const DRIFT_PER_MS: f64 = 0.00001;

/// Builds telemetry frames from sensor snapshots
///
/// Position is not measured: it drifts linearly from a fixed origin with
/// process uptime, so identical inputs always yield identical frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameEncoder {
    base_latitude: f64,
    base_longitude: f64,
    drift_per_ms: f64,
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self {
            base_latitude: BASE_LATITUDE,
            base_longitude: BASE_LONGITUDE,
            drift_per_ms: DRIFT_PER_MS,
        }
    }
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated (latitude, longitude) after `elapsed_ms` of uptime
    pub fn position_at(&self, elapsed_ms: u64) -> (f64, f64) {
        let drift = elapsed_ms as f64 * self.drift_per_ms;
        (self.base_latitude + drift, self.base_longitude + drift)
    }

    /// Build the frame for this tick
    ///
    /// `control_input_active` is a point-in-time sample; it is not latched.
    pub fn build(
        &self,
        snapshot: &SensorSnapshot,
        control_input_active: bool,
        elapsed_ms: u64,
    ) -> TelemetryFrame {
        let (latitude, longitude) = self.position_at(elapsed_ms);

        TelemetryFrame::new(
            snapshot.battery_level,
            snapshot.signal_strength,
            latitude,
            longitude,
            StatusCode::from_control_input(control_input_active),
        )
    }
}
