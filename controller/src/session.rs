//! Controller-side handshake session
//!
//! The controller picks a random challenge, locks onto the beacon endpoint
//! it sent it to, and trusts that endpoint once the XOR response checks out.
//! After that only full-size frames from the trusted endpoint are accepted.

use beacon_protocol::{
    random_challenge, respond, validate_frame, verify_response, TelemetryFrame, FRAME_SIZE,
    HANDSHAKE_LEN,
};
use std::net::SocketAddr;
use tracing::{debug, info, warn};

/// Handshake progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No challenge issued yet
    Idle,
    /// Challenge sent, waiting for the beacon's answer
    AwaitingResponse { challenge: u8, endpoint: SocketAddr },
    /// Handshake complete
    Trusted { endpoint: SocketAddr },
}

/// Result of feeding one datagram to the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    HandshakeSucceeded { endpoint: SocketAddr },
    HandshakeFailed { expected: u8, actual: u8 },
    Telemetry(TelemetryFrame),
    /// Full-size frame from the trusted endpoint with a status word other
    /// than NORMAL or ALERT
    UnknownStatus(TelemetryFrame),
    /// Wrong-size datagram from the trusted endpoint
    Malformed { len: usize },
    /// Datagram from anyone but the trusted endpoint
    Untrusted { from: SocketAddr },
    /// Datagram that does not fit the current handshake step
    Unsolicited { from: SocketAddr, len: usize },
}

#[derive(Debug)]
pub struct ControllerSession {
    state: SessionState,
}

impl Default for ControllerSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_trusted(&self) -> bool {
        matches!(self.state, SessionState::Trusted { .. })
    }

    /// Issue a fresh random challenge to `endpoint`
    pub fn begin_challenge(&mut self, endpoint: SocketAddr) -> u8 {
        self.begin_challenge_with(endpoint, random_challenge())
    }

    /// Issue a specific challenge byte to `endpoint`
    ///
    /// Replaces any pending challenge. Ignored once trusted.
    pub fn begin_challenge_with(&mut self, endpoint: SocketAddr, challenge: u8) -> u8 {
        if !self.is_trusted() {
            self.state = SessionState::AwaitingResponse { challenge, endpoint };
            debug!("Challenge {:#04X} -> {}", challenge, endpoint);
        }
        challenge
    }

    /// Classify one inbound datagram and advance the handshake
    pub fn handle_datagram(&mut self, payload: &[u8], from: SocketAddr) -> SessionEvent {
        match self.state {
            SessionState::Trusted { endpoint } => {
                if from != endpoint {
                    warn!("Packet from untrusted source {}", from);
                    return SessionEvent::Untrusted { from };
                }
                match TelemetryFrame::decode(payload) {
                    Ok(frame) => match validate_frame(&frame) {
                        Ok(()) => SessionEvent::Telemetry(frame),
                        Err(e) => {
                            warn!("Telemetry from {} rejected: {}", from, e);
                            SessionEvent::UnknownStatus(frame)
                        }
                    },
                    Err(e) => {
                        debug!("Malformed packet: {}", e);
                        SessionEvent::Malformed { len: payload.len() }
                    }
                }
            }
            SessionState::AwaitingResponse { challenge, endpoint }
                if from == endpoint && payload.len() == HANDSHAKE_LEN =>
            {
                let actual = payload[0];
                if verify_response(challenge, actual) {
                    info!("Handshake succeeded, endpoint {} trusted", endpoint);
                    self.state = SessionState::Trusted { endpoint };
                    SessionEvent::HandshakeSucceeded { endpoint }
                } else {
                    let expected = respond(challenge);
                    warn!(
                        "Handshake failed: expected {:#04X}, got {:#04X}",
                        expected, actual
                    );
                    SessionEvent::HandshakeFailed { expected, actual }
                }
            }
            _ => {
                if payload.len() == FRAME_SIZE {
                    debug!("Telemetry from {} before handshake, dropped", from);
                }
                SessionEvent::Unsolicited {
                    from,
                    len: payload.len(),
                }
            }
        }
    }
}
