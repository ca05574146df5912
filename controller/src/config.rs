//! Controller configuration

use anyhow::Result;
use beacon_protocol::{DEFAULT_PORT, WATCHDOG_TIMEOUT_MS};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Controller configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControllerConfig {
    /// Network configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// Handshake configuration
    #[serde(default)]
    pub handshake: HandshakeConfig,

    /// Telemetry watchdog configuration
    #[serde(default)]
    pub watchdog: WatchdogConfig,

    /// Mission event log configuration
    #[serde(default)]
    pub mission_log: MissionLogConfig,
}

impl ControllerConfig {
    /// Load configuration from file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ControllerConfig = toml::from_str(content)?;
        Ok(config)
    }
}

/// Network configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Local bind address; the beacon sends telemetry to this port
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Beacon address to challenge
    #[serde(default)]
    pub beacon: Option<SocketAddr>,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            beacon: None,
        }
    }
}

/// Handshake configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HandshakeConfig {
    /// Delay between challenges until the beacon answers (ms)
    #[serde(default = "default_challenge_interval")]
    pub challenge_interval_ms: u64,
}

fn default_challenge_interval() -> u64 {
    1000
}

impl HandshakeConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.challenge_interval_ms.max(1))
    }
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            challenge_interval_ms: default_challenge_interval(),
        }
    }
}

/// Watchdog configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WatchdogConfig {
    /// Silence after which the link is reported stale (ms)
    #[serde(default = "default_watchdog_timeout")]
    pub timeout_ms: u64,
}

fn default_watchdog_timeout() -> u64 {
    WATCHDOG_TIMEOUT_MS
}

impl WatchdogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_watchdog_timeout(),
        }
    }
}

/// Mission event log configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MissionLogConfig {
    /// Record link events to disk
    #[serde(default)]
    pub enabled: bool,

    /// Log file, one JSON event per line
    #[serde(default = "default_mission_log_path")]
    pub path: PathBuf,
}

fn default_mission_log_path() -> PathBuf {
    PathBuf::from("mission_log.jsonl")
}

impl Default for MissionLogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_mission_log_path(),
        }
    }
}
