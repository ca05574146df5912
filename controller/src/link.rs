//! Controller link runtime

use crate::config::ControllerConfig;
use crate::mission_log::{MissionEventKind, MissionLog};
use crate::session::{ControllerSession, SessionEvent};
use crate::watchdog::{TelemetryWatchdog, WatchdogStatus};
use beacon_protocol::StatusCode;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Receive buffer; larger than any valid datagram so oversize is visible
const RECV_BUFFER_SIZE: usize = 512;

/// How long one receive wait lasts before timers are re-checked
const POLL_SLICE: Duration = Duration::from_millis(100);

/// UDP socket plus handshake session for one beacon
pub struct ControllerLink {
    socket: UdpSocket,
    beacon: SocketAddr,
    session: ControllerSession,
    watchdog: TelemetryWatchdog,
    challenge_interval: Duration,
    mission_log: Option<MissionLog>,
    last_status: StatusCode,
    stale: bool,
}

impl ControllerLink {
    /// Bind the configured listen address
    pub async fn bind(config: &ControllerConfig, beacon: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(config.network.listen).await?;
        info!("Controller listening on {}", socket.local_addr()?);
        Ok(Self::new(socket, beacon, config))
    }

    pub fn new(socket: UdpSocket, beacon: SocketAddr, config: &ControllerConfig) -> Self {
        Self {
            socket,
            beacon,
            session: ControllerSession::new(),
            watchdog: TelemetryWatchdog::new(config.watchdog.timeout()),
            challenge_interval: config.handshake.interval(),
            mission_log: None,
            last_status: StatusCode::Normal,
            stale: false,
        }
    }

    /// Record link events to `log`
    pub fn with_mission_log(mut self, log: MissionLog) -> Self {
        self.mission_log = Some(log);
        self
    }

    pub fn mission_log(&self) -> Option<&MissionLog> {
        self.mission_log.as_ref()
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn session(&self) -> &ControllerSession {
        &self.session
    }

    pub fn watchdog_status(&self) -> WatchdogStatus {
        self.watchdog.status(Instant::now())
    }

    /// Send a fresh random challenge to the beacon
    pub async fn send_challenge(&mut self) -> io::Result<u8> {
        let challenge = self.session.begin_challenge(self.beacon);
        self.transmit_challenge(challenge).await
    }

    /// Send a specific challenge byte to the beacon
    pub async fn send_challenge_with(&mut self, challenge: u8) -> io::Result<u8> {
        let challenge = self.session.begin_challenge_with(self.beacon, challenge);
        self.transmit_challenge(challenge).await
    }

    async fn transmit_challenge(&mut self, challenge: u8) -> io::Result<u8> {
        self.socket.send_to(&[challenge], self.beacon).await?;
        self.record(
            MissionEventKind::CommandSent,
            format!("CHALLENGE {:#04X} -> {}", challenge, self.beacon),
        );
        Ok(challenge)
    }

    /// Wait for one datagram and classify it
    pub async fn recv_event(&mut self) -> io::Result<SessionEvent> {
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        let (len, from) = self.socket.recv_from(&mut buf).await?;

        let event = self.session.handle_datagram(&buf[..len], from);
        self.note_event(&event);
        Ok(event)
    }

    fn note_event(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::HandshakeSucceeded { endpoint } => {
                self.record(MissionEventKind::HandshakeSucceeded, endpoint.to_string());
            }
            SessionEvent::HandshakeFailed { expected, actual } => {
                self.record(
                    MissionEventKind::HandshakeFailed,
                    format!("expected {:#04X}, got {:#04X}", expected, actual),
                );
            }
            SessionEvent::Telemetry(frame) => {
                self.watchdog.feed(Instant::now());

                if let Ok(status) = frame.status() {
                    if status != self.last_status {
                        self.last_status = status;
                        let kind = match status {
                            StatusCode::Alert => MissionEventKind::StatusAlert,
                            StatusCode::Normal => MissionEventKind::StatusNormal,
                        };
                        self.record(kind, frame.to_string());
                    }
                }
            }
            SessionEvent::UnknownStatus(_) => self.watchdog.feed(Instant::now()),
            _ => {}
        }
    }

    /// Report stale and resumed telemetry once per transition
    fn check_watchdog(&mut self, now: Instant) {
        match self.watchdog.status(now) {
            WatchdogStatus::Stale { silent_for } if !self.stale => {
                warn!("LINK STALE: no telemetry for {:?}", silent_for);
                self.stale = true;
                self.record(
                    MissionEventKind::LinkStale,
                    format!("no telemetry for {:?}", silent_for),
                );
            }
            WatchdogStatus::Healthy if self.stale => {
                info!("Telemetry resumed");
                self.stale = false;
                self.record(MissionEventKind::LinkResumed, "telemetry resumed");
            }
            _ => {}
        }
    }

    fn record(&self, kind: MissionEventKind, details: impl Into<String>) {
        if let Some(log) = &self.mission_log {
            if let Err(e) = log.record(kind, details) {
                warn!("Mission log write to {} failed: {}", log.path().display(), e);
            }
        }
    }

    /// Challenge until trusted, then log telemetry forever
    pub async fn run(mut self) -> io::Result<()> {
        let mut next_challenge = Instant::now();
        self.record(
            MissionEventKind::SystemInit,
            format!("Controller v{} started, beacon {}", env!("CARGO_PKG_VERSION"), self.beacon),
        );

        loop {
            let now = Instant::now();

            if !self.session.is_trusted() && now >= next_challenge {
                match self.send_challenge().await {
                    Ok(challenge) => info!("Sent challenge {:#04X} to {}", challenge, self.beacon),
                    Err(e) => warn!("Challenge send failed: {}", e),
                }
                next_challenge = now + self.challenge_interval;
            }

            self.check_watchdog(now);

            if let Ok(event) = tokio::time::timeout(POLL_SLICE, self.recv_event()).await {
                match event {
                    Ok(SessionEvent::Telemetry(frame)) => info!("{}", frame),
                    Ok(SessionEvent::UnknownStatus(frame)) => warn!("{}", frame),
                    Ok(other) => debug!("{:?}", other),
                    // ICMP unreachable surfaces here on some platforms
                    Err(e) => warn!("Receive error: {}", e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission_log::MissionEvent;
    use beacon_protocol::TelemetryFrame;
    use tempfile::TempDir;

    async fn pair() -> (ControllerLink, UdpSocket) {
        let beacon = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let link = ControllerLink::new(
            socket,
            beacon.local_addr().unwrap(),
            &ControllerConfig::default(),
        );
        (link, beacon)
    }

    #[tokio::test]
    async fn test_handshake_and_frame() {
        let (mut link, beacon) = pair().await;
        let controller = link.local_addr().unwrap();

        link.send_challenge_with(0x10).await.unwrap();

        let mut buf = [0u8; 8];
        let (n, from) = beacon.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0x10]);
        assert_eq!(from, controller);

        beacon.send_to(&[0x52], controller).await.unwrap();
        assert!(matches!(
            link.recv_event().await.unwrap(),
            SessionEvent::HandshakeSucceeded { .. }
        ));

        let frame = TelemetryFrame::new(99, -40.0, 120.5, 30.2, StatusCode::Normal);
        beacon.send_to(&frame.encode(), controller).await.unwrap();
        assert_eq!(link.recv_event().await.unwrap(), SessionEvent::Telemetry(frame));
        assert_eq!(link.watchdog_status(), WatchdogStatus::Healthy);
    }

    #[tokio::test]
    async fn test_oversized_datagram_is_malformed() {
        let (mut link, beacon) = pair().await;
        let controller = link.local_addr().unwrap();

        link.send_challenge_with(0x01).await.unwrap();
        beacon.send_to(&[0x43], controller).await.unwrap();
        link.recv_event().await.unwrap();

        beacon.send_to(&[0u8; 64], controller).await.unwrap();
        assert_eq!(
            link.recv_event().await.unwrap(),
            SessionEvent::Malformed { len: 64 }
        );
    }

    fn kinds(entries: &[MissionEvent]) -> Vec<MissionEventKind> {
        entries.iter().map(|e| e.event).collect()
    }

    #[tokio::test]
    async fn test_mission_log_records_link_events() {
        let dir = TempDir::new().unwrap();
        let log = MissionLog::open(dir.path().join("mission_log.jsonl")).unwrap();
        let (link, beacon) = pair().await;
        let mut link = link.with_mission_log(log);
        let controller = link.local_addr().unwrap();

        link.send_challenge_with(0x10).await.unwrap();
        beacon.send_to(&[0x00], controller).await.unwrap();
        link.recv_event().await.unwrap();

        link.send_challenge_with(0x10).await.unwrap();
        beacon.send_to(&[0x52], controller).await.unwrap();
        link.recv_event().await.unwrap();

        // NORMAL, ALERT, ALERT, NORMAL: only the two changes are recorded
        for status in [
            StatusCode::Normal,
            StatusCode::Alert,
            StatusCode::Alert,
            StatusCode::Normal,
        ] {
            let frame = TelemetryFrame::new(90, -55.0, 120.5, 30.2, status);
            beacon.send_to(&frame.encode(), controller).await.unwrap();
            link.recv_event().await.unwrap();
        }

        let entries = link.mission_log().unwrap().read_all().unwrap();
        assert_eq!(
            kinds(&entries),
            vec![
                MissionEventKind::CommandSent,
                MissionEventKind::HandshakeFailed,
                MissionEventKind::CommandSent,
                MissionEventKind::HandshakeSucceeded,
                MissionEventKind::StatusAlert,
                MissionEventKind::StatusNormal,
            ]
        );
        assert_eq!(entries[1].details, "expected 0x52, got 0x00");
        assert_eq!(entries[3].details, beacon.local_addr().unwrap().to_string());
    }

    #[tokio::test]
    async fn test_mission_log_records_stale_and_resumed() {
        let dir = TempDir::new().unwrap();
        let log = MissionLog::open(dir.path().join("mission_log.jsonl")).unwrap();
        let (link, beacon) = pair().await;
        let mut link = link.with_mission_log(log);
        let controller = link.local_addr().unwrap();

        link.send_challenge_with(0x01).await.unwrap();
        beacon.send_to(&[0x43], controller).await.unwrap();
        link.recv_event().await.unwrap();

        let frame = TelemetryFrame::new(90, -55.0, 120.5, 30.2, StatusCode::Normal);
        beacon.send_to(&frame.encode(), controller).await.unwrap();
        link.recv_event().await.unwrap();

        // Reported once, however long the silence lasts
        let later = Instant::now() + Duration::from_secs(1);
        link.check_watchdog(later);
        link.check_watchdog(later + Duration::from_secs(1));

        beacon.send_to(&frame.encode(), controller).await.unwrap();
        link.recv_event().await.unwrap();
        link.check_watchdog(Instant::now());

        let entries = link.mission_log().unwrap().read_all().unwrap();
        assert_eq!(
            kinds(&entries)[2..],
            [MissionEventKind::LinkStale, MissionEventKind::LinkResumed]
        );
    }

    #[tokio::test]
    async fn test_unknown_status_feeds_watchdog() {
        let (mut link, beacon) = pair().await;
        let controller = link.local_addr().unwrap();

        link.send_challenge_with(0x01).await.unwrap();
        beacon.send_to(&[0x43], controller).await.unwrap();
        link.recv_event().await.unwrap();

        let mut frame = TelemetryFrame::new(90, -55.0, 120.5, 30.2, StatusCode::Normal);
        frame.status_codes = 0x10;
        beacon.send_to(&frame.encode(), controller).await.unwrap();

        assert_eq!(
            link.recv_event().await.unwrap(),
            SessionEvent::UnknownStatus(frame)
        );
        assert_eq!(link.watchdog_status(), WatchdogStatus::Healthy);
    }
}
