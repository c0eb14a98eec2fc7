//! Hex / base64 transcoding for license payloads and diagnostics.
//!
//! License cells arrive as base64 from the import step; the wire protocol
//! carries raw bytes, and operators read everything as uppercase hex.

use data_encoding::{BASE64, HEXUPPER, HEXUPPER_PERMISSIVE};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("Invalid hex string: {0}")]
    Hex(String),
    #[error("Invalid base64 string: {0}")]
    Base64(String),
}

/// Parse a hex string (either case, optional `0x` prefix).
pub fn hex_to_bytes(input: &str) -> Result<Vec<u8>, ConvertError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    HEXUPPER_PERMISSIVE
        .decode(digits.as_bytes())
        .map_err(|e| ConvertError::Hex(e.to_string()))
}

/// Render bytes as uppercase hex.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    HEXUPPER.encode(bytes)
}

pub fn base64_to_bytes(input: &str) -> Result<Vec<u8>, ConvertError> {
    BASE64
        .decode(input.trim().as_bytes())
        .map_err(|e| ConvertError::Base64(e.to_string()))
}

pub fn bytes_to_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

pub fn base64_to_hex(input: &str) -> Result<String, ConvertError> {
    base64_to_bytes(input).map(|b| bytes_to_hex(&b))
}

pub fn hex_to_base64(input: &str) -> Result<String, ConvertError> {
    hex_to_bytes(input).map(|b| bytes_to_base64(&b))
}
