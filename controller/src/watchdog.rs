//! Telemetry watchdog
//!
//! The beacon never notices a lost link. The controller does: if no frame
//! arrives within the timeout, the link is reported stale.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogStatus {
    /// No telemetry seen yet
    Waiting,
    Healthy,
    Stale { silent_for: Duration },
}

#[derive(Debug)]
pub struct TelemetryWatchdog {
    timeout: Duration,
    last_frame: Option<Instant>,
}

impl TelemetryWatchdog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_frame: None,
        }
    }

    /// Record a frame arrival
    pub fn feed(&mut self, now: Instant) {
        self.last_frame = Some(now);
    }

    pub fn status(&self, now: Instant) -> WatchdogStatus {
        match self.last_frame {
            None => WatchdogStatus::Waiting,
            Some(last) => {
                let silent_for = now.saturating_duration_since(last);
                if silent_for > self.timeout {
                    WatchdogStatus::Stale { silent_for }
                } else {
                    WatchdogStatus::Healthy
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_lifecycle() {
        let mut watchdog = TelemetryWatchdog::new(Duration::from_millis(500));
        assert_eq!(watchdog.status(Instant::now()), WatchdogStatus::Waiting);

        watchdog.feed(Instant::now());
        tokio::time::advance(Duration::from_millis(400)).await;
        assert_eq!(watchdog.status(Instant::now()), WatchdogStatus::Healthy);

        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(
            watchdog.status(Instant::now()),
            WatchdogStatus::Stale {
                silent_for: Duration::from_millis(600)
            }
        );

        watchdog.feed(Instant::now());
        assert_eq!(watchdog.status(Instant::now()), WatchdogStatus::Healthy);
    }
}
