//! Beacon configuration

use crate::link::{ChallengePolicy, EndpointPolicy};
use anyhow::Result;
use beacon_protocol::{DEFAULT_PORT, TICK_INTERVAL_MS};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Beacon configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BeaconConfig {
    /// Network configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// Handshake configuration
    #[serde(default)]
    pub handshake: HandshakeConfig,

    /// Tick scheduling
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Simulated sensor readings
    #[serde(default)]
    pub sensors: SensorConfig,

    /// Monitoring configuration
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

impl BeaconConfig {
    /// Load configuration from file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: BeaconConfig = toml::from_str(content)?;
        Ok(config)
    }
}

/// Network configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Local listen address for challenges
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Port telemetry is sent to on the controller's host
    #[serde(default = "default_remote_port")]
    pub remote_port: u16,

    /// How the telemetry endpoint follows challenge senders
    #[serde(default)]
    pub endpoint_policy: EndpointPolicy,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))
}

fn default_remote_port() -> u16 {
    DEFAULT_PORT
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            remote_port: default_remote_port(),
            endpoint_policy: EndpointPolicy::default(),
        }
    }
}

/// Handshake configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HandshakeConfig {
    /// Treatment of challenge datagrams longer than one byte
    #[serde(default)]
    pub challenge_policy: ChallengePolicy,
}

/// Scheduler configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Tick period in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

fn default_tick_interval() -> u64 {
    TICK_INTERVAL_MS
}

impl SchedulerConfig {
    pub fn period(&self) -> Duration {
        // A zero period would make tokio's interval panic
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
        }
    }
}

/// Fixed readings reported by the simulated sensor provider
#[derive(Debug, Clone, Deserialize)]
pub struct SensorConfig {
    /// Battery level (percent)
    #[serde(default = "default_battery_level")]
    pub battery_level: i32,

    /// Signal strength (dBm)
    #[serde(default = "default_signal_strength")]
    pub signal_strength: f32,
}

fn default_battery_level() -> i32 {
    100
}

fn default_signal_strength() -> f32 {
    -60.0
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            battery_level: default_battery_level(),
            signal_strength: default_signal_strength(),
        }
    }
}

/// Monitoring configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// Prometheus metrics bind address
    #[serde(default = "default_prometheus_bind")]
    pub prometheus_bind: SocketAddr,

    /// Enable Prometheus
    #[serde(default)]
    pub prometheus_enabled: bool,
}

fn default_prometheus_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9105))
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            prometheus_bind: default_prometheus_bind(),
            prometheus_enabled: false,
        }
    }
}
