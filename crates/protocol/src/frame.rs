//! TelemetryFrame - The fixed-size record broadcast every tick

use crate::validation::{validate_frame_len, ProtocolError};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

/// Serialized size of a telemetry frame in bytes
pub const FRAME_SIZE: usize = 28;

/// Telemetry frame
///
/// Wire layout (little-endian, no padding, no version field):
///
/// ```text
/// offset  size  field
///      0     4  battery_level    i32
///      4     4  signal_strength  f32
///      8     8  latitude         f64
///     16     8  longitude        f64
///     24     4  status_codes     u32
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryFrame {
    /// Battery gauge reading (percentage or raw value)
    pub battery_level: i32,

    /// Signal quality metric, e.g. RSSI in dBm
    pub signal_strength: f32,

    /// Latitude in degrees
    pub latitude: f64,

    /// Longitude in degrees
    pub longitude: f64,

    /// Raw status word, see [`StatusCode`]
    pub status_codes: u32,
}

/// Operator status carried in `status_codes`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum StatusCode {
    /// No operator action
    #[default]
    Normal = 0x0000_0000,
    /// Control input held: alert / fire
    Alert = 0x0000_00FF,
}

impl StatusCode {
    /// Status for a point-in-time control input sample
    pub fn from_control_input(active: bool) -> Self {
        if active { Self::Alert } else { Self::Normal }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for StatusCode {
    type Error = ProtocolError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0x0000_0000 => Ok(Self::Normal),
            0x0000_00FF => Ok(Self::Alert),
            other => Err(ProtocolError::UnknownStatus(other)),
        }
    }
}

impl TelemetryFrame {
    /// Create a new frame
    pub fn new(
        battery_level: i32,
        signal_strength: f32,
        latitude: f64,
        longitude: f64,
        status: StatusCode,
    ) -> Self {
        Self {
            battery_level,
            signal_strength,
            latitude,
            longitude,
            status_codes: status.as_u32(),
        }
    }

    /// Classify the raw status word
    pub fn status(&self) -> Result<StatusCode, ProtocolError> {
        StatusCode::try_from(self.status_codes)
    }

    /// Serialize into a fresh 28-byte buffer
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_SIZE);
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Append the wire representation to `buf`
    pub fn encode_into(&self, buf: &mut impl BufMut) {
        buf.put_i32_le(self.battery_level);
        buf.put_f32_le(self.signal_strength);
        buf.put_f64_le(self.latitude);
        buf.put_f64_le(self.longitude);
        buf.put_u32_le(self.status_codes);
    }

    /// Parse a frame from exactly [`FRAME_SIZE`] bytes
    ///
    /// The status word is kept raw; use [`TelemetryFrame::status`] to
    /// classify it.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        validate_frame_len(data.len())?;

        let mut buf = data;
        let battery_level = buf.get_i32_le();
        let signal_strength = buf.get_f32_le();
        let latitude = buf.get_f64_le();
        let longitude = buf.get_f64_le();
        let status_codes = buf.get_u32_le();

        Ok(Self {
            battery_level,
            signal_strength,
            latitude,
            longitude,
            status_codes,
        })
    }
}

impl fmt::Display for TelemetryFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bat:{}% Sig:{}dB Lat:{:.5} Lon:{:.5} Sts:{:#04X}",
            self.battery_level,
            self.signal_strength,
            self.latitude,
            self.longitude,
            self.status_codes
        )
    }
}
