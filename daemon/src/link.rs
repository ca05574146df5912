//! Link state and challenge handling

use beacon_protocol::{first_challenge_byte, respond, HANDSHAKE_LEN};
use serde::Deserialize;
use std::net::SocketAddr;
use tracing::{debug, info};

/// Whether a controller has completed the handshake
///
/// Only ever moves forward: once `Linked`, the beacon stays linked for the
/// life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Unlinked,
    Linked,
}

/// How the telemetry destination tracks challenge senders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointPolicy {
    /// Keep the host of the first accepted challenge
    #[default]
    CaptureOnce,
    /// Follow the host of the most recent challenge
    LatestSender,
}

/// Treatment of challenge datagrams that are not exactly one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengePolicy {
    /// Use the first byte, discard the rest
    #[default]
    Truncate,
    /// Ignore anything but a single byte
    Strict,
}

/// Owns link state and the telemetry destination
#[derive(Debug)]
pub struct LinkManager {
    state: LinkState,
    endpoint: Option<SocketAddr>,
    remote_port: u16,
    endpoint_policy: EndpointPolicy,
    challenge_policy: ChallengePolicy,
}

impl LinkManager {
    pub fn new(
        remote_port: u16,
        endpoint_policy: EndpointPolicy,
        challenge_policy: ChallengePolicy,
    ) -> Self {
        Self {
            state: LinkState::Unlinked,
            endpoint: None,
            remote_port,
            endpoint_policy,
            challenge_policy,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_linked(&self) -> bool {
        self.state == LinkState::Linked
    }

    /// Where telemetry goes, once a challenge has been accepted
    pub fn telemetry_destination(&self) -> Option<SocketAddr> {
        self.endpoint
    }

    /// Answer one challenge byte and mark the link established
    ///
    /// Every challenge gets a response, linked or not.
    pub fn handle_inbound_byte(&mut self, challenge: u8) -> u8 {
        let response = respond(challenge);

        if self.state == LinkState::Unlinked {
            self.state = LinkState::Linked;
            info!("LINK: SECURE (challenge {:#04X})", challenge);
        }

        response
    }

    /// Handle a raw inbound datagram from `sender`
    ///
    /// Returns the response byte to send back to `sender`, or `None` if the
    /// datagram was ignored (empty, or oversized under the strict policy).
    pub fn handle_datagram(&mut self, payload: &[u8], sender: SocketAddr) -> Option<u8> {
        let challenge = match self.challenge_policy {
            ChallengePolicy::Truncate => {
                let challenge = first_challenge_byte(payload)?;
                if payload.len() > HANDSHAKE_LEN {
                    debug!(
                        "Discarding {} trailing challenge bytes from {}",
                        payload.len() - HANDSHAKE_LEN,
                        sender
                    );
                }
                challenge
            }
            ChallengePolicy::Strict => {
                if payload.len() != HANDSHAKE_LEN {
                    debug!("Ignoring {}-byte datagram from {}", payload.len(), sender);
                    return None;
                }
                payload[0]
            }
        };

        let response = self.handle_inbound_byte(challenge);
        self.record_sender(sender);
        Some(response)
    }

    fn record_sender(&mut self, sender: SocketAddr) {
        let target = SocketAddr::new(sender.ip(), self.remote_port);

        match (self.endpoint_policy, self.endpoint) {
            (_, None) => {
                info!("Telemetry endpoint set to {}", target);
                self.endpoint = Some(target);
            }
            (EndpointPolicy::LatestSender, Some(current)) if current != target => {
                info!("Telemetry endpoint moved from {} to {}", current, target);
                self.endpoint = Some(target);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(endpoint_policy: EndpointPolicy, challenge_policy: ChallengePolicy) -> LinkManager {
        LinkManager::new(5005, endpoint_policy, challenge_policy)
    }

    fn addr(last: u8, port: u16) -> SocketAddr {
        SocketAddr::from(([192, 168, 4, last], port))
    }

    #[test]
    fn test_starts_unlinked() {
        let link = manager(EndpointPolicy::default(), ChallengePolicy::default());
        assert_eq!(link.state(), LinkState::Unlinked);
        assert!(link.telemetry_destination().is_none());
    }

    #[test]
    fn test_challenge_links_and_responds() {
        let mut link = manager(EndpointPolicy::default(), ChallengePolicy::default());

        assert_eq!(link.handle_inbound_byte(0x10), 0x52);
        assert!(link.is_linked());
    }

    #[test]
    fn test_every_byte_links_and_stays_linked() {
        for first in 0..=u8::MAX {
            let mut link = manager(EndpointPolicy::default(), ChallengePolicy::default());
            assert_eq!(link.handle_inbound_byte(first), first ^ 0x42);
            assert!(link.is_linked());

            for next in [0x00, 0x42, 0xFF, first] {
                assert_eq!(link.handle_inbound_byte(next), next ^ 0x42);
                assert_eq!(link.state(), LinkState::Linked);
            }
        }
    }

    #[test]
    fn test_empty_datagram_ignored() {
        let mut link = manager(EndpointPolicy::default(), ChallengePolicy::default());

        assert_eq!(link.handle_datagram(&[], addr(2, 40000)), None);
        assert_eq!(link.state(), LinkState::Unlinked);
        assert!(link.telemetry_destination().is_none());
    }

    #[test]
    fn test_oversized_challenge_truncated() {
        let mut link = manager(EndpointPolicy::default(), ChallengePolicy::Truncate);

        assert_eq!(link.handle_datagram(&[0x10, 0xAA, 0xBB], addr(2, 40000)), Some(0x52));
        assert!(link.is_linked());
    }

    #[test]
    fn test_oversized_challenge_strict() {
        let mut link = manager(EndpointPolicy::default(), ChallengePolicy::Strict);

        assert_eq!(link.handle_datagram(&[0x10, 0xAA], addr(2, 40000)), None);
        assert_eq!(link.state(), LinkState::Unlinked);
        assert_eq!(link.handle_datagram(&[0x10], addr(2, 40000)), Some(0x52));
        assert!(link.is_linked());
    }

    #[test]
    fn test_destination_uses_remote_port() {
        let mut link = manager(EndpointPolicy::CaptureOnce, ChallengePolicy::default());

        link.handle_datagram(&[0x01], addr(2, 40000));
        assert_eq!(link.telemetry_destination(), Some(addr(2, 5005)));
    }

    #[test]
    fn test_capture_once_keeps_first_endpoint() {
        let mut link = manager(EndpointPolicy::CaptureOnce, ChallengePolicy::default());

        link.handle_datagram(&[0x01], addr(2, 40000));
        assert_eq!(link.handle_datagram(&[0x02], addr(9, 40000)), Some(0x40));
        assert_eq!(link.telemetry_destination(), Some(addr(2, 5005)));
    }

    #[test]
    fn test_latest_sender_follows_challenges() {
        let mut link = manager(EndpointPolicy::LatestSender, ChallengePolicy::default());

        link.handle_datagram(&[0x01], addr(2, 40000));
        link.handle_datagram(&[0x02], addr(9, 40001));
        assert_eq!(link.telemetry_destination(), Some(addr(9, 5005)));
    }
}
