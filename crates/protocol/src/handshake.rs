//! Single-byte XOR challenge/response
//!
//! The controller sends one unpredictable byte; the beacon answers with the
//! byte XOR [`SHARED_KEY`]. This proves nothing to a passive observer: one
//! captured exchange reveals the key.

use crate::constants::SHARED_KEY;

/// Compute the response for a challenge byte
#[inline]
pub fn respond(challenge: u8) -> u8 {
    challenge ^ SHARED_KEY
}

/// Check a response against the challenge that was sent
pub fn verify_response(challenge: u8, response: u8) -> bool {
    respond(challenge) == response
}

/// Generate a fresh challenge byte
pub fn random_challenge() -> u8 {
    fastrand::u8(..)
}

/// First byte of an inbound datagram, or `None` when it is empty
///
/// Trailing bytes of an oversized datagram are discarded.
pub fn first_challenge_byte(payload: &[u8]) -> Option<u8> {
    payload.first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_respond_all_bytes() {
        for c in 0..=u8::MAX {
            assert_eq!(respond(c), c ^ 0x42);
            assert_eq!(respond(respond(c)), c);
        }
    }

    #[test]
    fn test_known_vector() {
        assert_eq!(respond(0x10), 0x52);
        assert_eq!(respond(0x42), 0x00);
        assert_eq!(respond(0x00), 0x42);
    }

    #[test]
    fn test_verify_response() {
        assert!(verify_response(0x10, 0x52));
        assert!(!verify_response(0x10, 0x10));
        assert!(!verify_response(0x10, 0x53));
    }

    #[test]
    fn test_first_challenge_byte() {
        assert_eq!(first_challenge_byte(&[]), None);
        assert_eq!(first_challenge_byte(&[0x7A]), Some(0x7A));
        assert_eq!(first_challenge_byte(&[0x01, 0x02, 0x03]), Some(0x01));
    }
}
