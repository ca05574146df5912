//! Sensor providers
//!
//! Battery gauge, radio signal and key scanning live outside the beacon
//! core. The scheduler only sees [`SensorProvider`].

use crate::config::SensorConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Current readings from the device
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    pub battery_level: i32,
    pub signal_strength: f32,
}

/// Source of sensor readings and the control input state
pub trait SensorProvider: Send + Sync {
    fn snapshot(&self) -> SensorSnapshot;

    /// Whether the designated control key is pressed right now
    fn control_input_active(&self) -> bool;
}

/// Shared pressed/released state of the control key
#[derive(Debug, Clone, Default)]
pub struct ControlInput {
    pressed: Arc<AtomicBool>,
}

impl ControlInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, pressed: bool) {
        self.pressed.store(pressed, Ordering::SeqCst);
    }

    /// Flip the key state, returning the new state
    pub fn toggle(&self) -> bool {
        !self.pressed.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed.load(Ordering::SeqCst)
    }
}

/// Provider reporting configured fixed readings
pub struct SimulatedSensors {
    snapshot: SensorSnapshot,
    input: ControlInput,
}

impl SimulatedSensors {
    pub fn new(config: &SensorConfig, input: ControlInput) -> Self {
        Self {
            snapshot: SensorSnapshot {
                battery_level: config.battery_level,
                signal_strength: config.signal_strength,
            },
            input,
        }
    }
}

impl SensorProvider for SimulatedSensors {
    fn snapshot(&self) -> SensorSnapshot {
        self.snapshot
    }

    fn control_input_active(&self) -> bool {
        self.input.is_pressed()
    }
}

/// Toggle `input` on every line read from stdin
///
/// Stands in for the device keyboard when running on a workstation.
pub fn spawn_console_input(input: ControlInput) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        info!("Press Enter to toggle the control input");

        loop {
            match lines.next_line().await {
                Ok(Some(_)) => {
                    let pressed = input.toggle();
                    info!("STATUS: {}", if pressed { "FIRE" } else { "NORMAL" });
                }
                Ok(None) => {
                    debug!("stdin closed, control input frozen");
                    break;
                }
                Err(e) => {
                    debug!("stdin read failed: {}", e);
                    break;
                }
            }
        }
    })
}
