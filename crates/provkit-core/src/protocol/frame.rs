//! Wire frame codec.
//!
//! ```text
//! offset  size  field
//! 0       1     head              = 0x5A
//! 1       2     payload_length    = N (bytes in payload below)
//! 3       2     command
//! 5       2     data_length       = len(component_id + data)
//! 7       2     component_id
//! 9       ...   data              (data_length - 2 bytes)
//! last    1     checksum          = sum(payload bytes) mod 256
//! ```
//!
//! The checksum is a plain byte sum, not a CRC. Device firmware expects
//! exactly this, so it must not be strengthened.

use std::fmt;

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

use super::command::Command;
use super::constants::*;
use crate::convert::{bytes_to_hex, hex_to_bytes};

/// Length field that disagreed with the bytes actually present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthField {
    PayloadLength,
    DataLength,
}

impl fmt::Display for LengthField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LengthField::PayloadLength => write!(f, "payload_length"),
            LengthField::DataLength => write!(f, "data_length"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    #[error("Bad frame head 0x{0:02X}")]
    BadHead(u8),

    #[error("Length mismatch in {field}: declared {declared}, actual {actual}")]
    LengthMismatch {
        field: LengthField,
        declared: u16,
        actual: usize,
    },

    #[error("Checksum mismatch: computed 0x{computed:02X}, frame carries 0x{received:02X}")]
    ChecksumMismatch { computed: u8, received: u8 },

    #[error("Invalid hex frame: {0}")]
    InvalidHex(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Data too long: {len} bytes, at most {max} fit in one frame")]
    DataTooLong { len: usize, max: usize },
}

/// One decoded, validated frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: u16,
    pub component_id: u16,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(command: u16, component_id: u16, data: impl Into<Vec<u8>>) -> Self {
        Self {
            command,
            component_id,
            data: data.into(),
        }
    }

    /// Known command, if the code is part of the vocabulary.
    pub fn known_command(&self) -> Option<Command> {
        Command::from_code(self.command)
    }

    pub fn payload_length(&self) -> usize {
        PAYLOAD_FIXED_LEN + self.data.len()
    }

    pub fn data_length(&self) -> usize {
        COMPONENT_ID_LEN + self.data.len()
    }

    /// Checksum this frame carries on the wire.
    pub fn checksum(&self) -> u8 {
        let mut fixed = [0u8; PAYLOAD_FIXED_LEN];
        BigEndian::write_u16(&mut fixed[0..2], self.command);
        BigEndian::write_u16(&mut fixed[2..4], self.data_length() as u16);
        BigEndian::write_u16(&mut fixed[4..6], self.component_id);
        checksum(&fixed).wrapping_add(checksum(&self.data))
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        encode(self.command, self.component_id, &self.data)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        decode(bytes)
    }

    /// Decode the hex form operators paste from logs (`0x` prefix and either case allowed).
    pub fn from_hex(input: &str) -> Result<Self, FrameError> {
        let bytes = hex_to_bytes(input).map_err(|e| FrameError::InvalidHex(e.to_string()))?;
        decode(&bytes)
    }

    /// Uppercase hex of the encoded frame.
    pub fn to_hex(&self) -> Result<String, EncodeError> {
        self.encode().map(|b| bytes_to_hex(&b))
    }

    /// Uppercase hex of the data field.
    pub fn data_hex(&self) -> String {
        bytes_to_hex(&self.data)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.known_command() {
            Some(cmd) => write!(f, "{}", cmd)?,
            None => write!(f, "unknown(0x{:04X})", self.command)?,
        }
        write!(
            f,
            " component=0x{:04X} data=[{}]",
            self.component_id,
            self.data_hex()
        )
    }
}

/// Sum of all bytes, truncated to 8 bits.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Encode one frame.
pub fn encode(command: u16, component_id: u16, data: &[u8]) -> Result<Vec<u8>, EncodeError> {
    if data.len() > MAX_DATA_LEN {
        return Err(EncodeError::DataTooLong {
            len: data.len(),
            max: MAX_DATA_LEN,
        });
    }
    Ok(encode_unchecked(command, component_id, data))
}

/// Encode a frame whose data is known to fit.
pub(crate) fn encode_unchecked(command: u16, component_id: u16, data: &[u8]) -> Vec<u8> {
    debug_assert!(data.len() <= MAX_DATA_LEN);
    let payload_len = PAYLOAD_FIXED_LEN + data.len();
    let mut buf = vec![0u8; HEADER_LEN + payload_len + CHECKSUM_LEN];

    buf[0] = FRAME_HEAD;
    BigEndian::write_u16(&mut buf[1..3], payload_len as u16);
    BigEndian::write_u16(&mut buf[3..5], command);
    BigEndian::write_u16(&mut buf[5..7], (COMPONENT_ID_LEN + data.len()) as u16);
    BigEndian::write_u16(&mut buf[7..9], component_id);
    buf[9..9 + data.len()].copy_from_slice(data);

    let payload_end = HEADER_LEN + payload_len;
    buf[payload_end] = checksum(&buf[HEADER_LEN..payload_end]);
    buf
}

/// Decode one complete frame.
///
/// Checks run in order: minimum size, head, declared payload length,
/// checksum, declared data length. The checksum is verified before the
/// inner length so that any corruption inside the payload is reported
/// as a checksum failure.
pub fn decode(bytes: &[u8]) -> Result<Frame, FrameError> {
    if bytes.len() < MIN_FRAME_LEN {
        return Err(FrameError::TooShort {
            expected: MIN_FRAME_LEN,
            actual: bytes.len(),
        });
    }
    if bytes[0] != FRAME_HEAD {
        return Err(FrameError::BadHead(bytes[0]));
    }

    let declared_payload = BigEndian::read_u16(&bytes[1..3]);
    let payload = &bytes[HEADER_LEN..bytes.len() - CHECKSUM_LEN];
    if declared_payload as usize != payload.len() {
        return Err(FrameError::LengthMismatch {
            field: LengthField::PayloadLength,
            declared: declared_payload,
            actual: payload.len(),
        });
    }

    let received = bytes[bytes.len() - 1];
    let computed = checksum(payload);
    if computed != received {
        return Err(FrameError::ChecksumMismatch { computed, received });
    }

    let command = BigEndian::read_u16(&payload[0..2]);
    let declared_data = BigEndian::read_u16(&payload[2..4]);
    let body = &payload[4..];
    if declared_data as usize != body.len() {
        return Err(FrameError::LengthMismatch {
            field: LengthField::DataLength,
            declared: declared_data,
            actual: body.len(),
        });
    }

    Ok(Frame {
        command,
        component_id: BigEndian::read_u16(&body[0..2]),
        data: body[COMPONENT_ID_LEN..].to_vec(),
    })
}

/// Total frame size implied by a received prefix.
///
/// `None` until the head and payload length have arrived, or when the
/// first byte is not a frame head.
pub fn expected_frame_len(prefix: &[u8]) -> Option<usize> {
    if prefix.len() < HEADER_LEN || prefix[0] != FRAME_HEAD {
        return None;
    }
    let payload_len = BigEndian::read_u16(&prefix[1..3]) as usize;
    Some(HEADER_LEN + payload_len + CHECKSUM_LEN)
}
