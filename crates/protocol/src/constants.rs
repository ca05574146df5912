//! Protocol constants shared by both ends of the link

/// Default UDP port for both the beacon listener and the telemetry target
pub const DEFAULT_PORT: u16 = 5005;

/// Interval between beacon ticks (ms)
pub const TICK_INTERVAL_MS: u64 = 100;

/// Controller-side silence after which the link is considered stale (ms)
pub const WATCHDOG_TIMEOUT_MS: u64 = 500;

/// Shared single-byte key for the challenge transform
pub const SHARED_KEY: u8 = 0x42;

/// Length of a challenge or response datagram
pub const HANDSHAKE_LEN: usize = 1;
