//! Frame validation utilities

use crate::frame::{TelemetryFrame, FRAME_SIZE};
use thiserror::Error;

/// Protocol errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Frame length mismatch: expected {expected} bytes, got {actual}")]
    FrameLength { expected: usize, actual: usize },

    #[error("Unknown status code: {0:#010X}")]
    UnknownStatus(u32),
}

/// Check that a datagram has exactly the telemetry frame size
pub fn validate_frame_len(len: usize) -> Result<(), ProtocolError> {
    if len != FRAME_SIZE {
        return Err(ProtocolError::FrameLength {
            expected: FRAME_SIZE,
            actual: len,
        });
    }
    Ok(())
}

/// Validate a decoded frame
///
/// Only the status word is constrained; positions are simulated and may
/// leave the geographic range.
pub fn validate_frame(frame: &TelemetryFrame) -> Result<(), ProtocolError> {
    frame.status().map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::StatusCode;

    #[test]
    fn test_valid_len() {
        assert!(validate_frame_len(FRAME_SIZE).is_ok());
        assert!(validate_frame_len(0).is_err());
        assert!(validate_frame_len(1).is_err());
    }

    #[test]
    fn test_valid_frame() {
        let frame = TelemetryFrame::new(50, -70.0, 120.5, 30.2, StatusCode::Normal);
        assert!(validate_frame(&frame).is_ok());
    }

    #[test]
    fn test_unknown_status() {
        let mut frame = TelemetryFrame::new(50, -70.0, 120.5, 30.2, StatusCode::Normal);
        frame.status_codes = 0x01;

        assert_eq!(validate_frame(&frame), Err(ProtocolError::UnknownStatus(0x01)));
    }

    #[test]
    fn test_error_message() {
        let err = ProtocolError::FrameLength { expected: 28, actual: 3 };
        assert_eq!(err.to_string(), "Frame length mismatch: expected 28 bytes, got 3");
    }
}
