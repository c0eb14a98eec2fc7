//! Request builders and response validation.
//!
//! Everything here is pure: a decoded frame goes in, a verdict comes out.

use thiserror::Error;

use super::command::{Command, ErrorCode};
use super::constants::*;
use super::frame::{EncodeError, Frame, encode, encode_unchecked};
use crate::convert::bytes_to_hex;
use crate::hid::Hid;

/// Why a well-formed frame was not the success answer we asked for.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    #[error("Device sent reset_response")]
    Reset,

    #[error("Unexpected command: expected {expected}, got 0x{actual:04X}")]
    UnexpectedCommand { expected: Command, actual: u16 },

    #[error("Device reported {0}")]
    Device(ErrorCode),

    #[error("Unrecognised status data [{0}]")]
    UnknownStatus(String),

    #[error("HID response carried no HID")]
    EmptyHid,

    #[error("Reply for component {actual:04X}, expected {expected:04X}")]
    ComponentMismatch { expected: u16, actual: u16 },
}

impl ResponseError {
    /// Device status code, when the device reported one.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            ResponseError::Device(code) => Some(*code),
            _ => None,
        }
    }
}

/// True iff the frame carries the expected command.
pub fn is_expected(frame: &Frame, expected: Command) -> bool {
    frame.command == expected.code()
}

/// True iff the frame carries the expected command and a `process ok` status.
pub fn is_success(frame: &Frame, expected: Command) -> bool {
    is_expected(frame, expected) && frame.data == [STATUS_PROCESS_OK]
}

/// Check a status response (license put / clean), explaining any failure.
pub fn check_response(frame: &Frame, expected: Command) -> Result<(), ResponseError> {
    check_command(frame, expected)?;
    match frame.data.as_slice() {
        [STATUS_PROCESS_OK] => Ok(()),
        [status] => Err(status_error(*status)),
        other => Err(ResponseError::UnknownStatus(bytes_to_hex(other))),
    }
}

/// Validate a HID response and extract the HID.
///
/// A single data byte is a status byte (the device failed to read its HID);
/// anything longer is the HID itself.
pub fn validate_hid_response(frame: &Frame) -> Result<Hid, ResponseError> {
    check_command(frame, Command::HidResponse)?;
    match frame.data.as_slice() {
        [] => Err(ResponseError::EmptyHid),
        [status] => Err(status_error(*status)),
        data => Ok(Hid::from_bytes(data)),
    }
}

/// Validate the answer to a license put for `component_id`.
pub fn validate_put_response(frame: &Frame, component_id: u16) -> Result<(), ResponseError> {
    check_command(frame, Command::LicensePutResponse)?;
    check_component(frame, component_id)?;
    check_response(frame, Command::LicensePutResponse)
}

/// Validate the answer to a license clean for `component_id`.
pub fn validate_clean_response(frame: &Frame, component_id: u16) -> Result<(), ResponseError> {
    check_command(frame, Command::LicenseCleanResponse)?;
    check_component(frame, component_id)?;
    check_response(frame, Command::LicenseCleanResponse)
}

/// A reply naming another component answers a different request.
///
/// `0000` means the firmware did not echo the id and is accepted.
fn check_component(frame: &Frame, expected: u16) -> Result<(), ResponseError> {
    if frame.component_id == expected || frame.component_id == DEFAULT_COMPONENT_ID {
        return Ok(());
    }
    Err(ResponseError::ComponentMismatch {
        expected,
        actual: frame.component_id,
    })
}

fn check_command(frame: &Frame, expected: Command) -> Result<(), ResponseError> {
    if is_expected(frame, expected) {
        return Ok(());
    }
    if frame.command == CMD_RESET_RESPONSE {
        return Err(ResponseError::Reset);
    }
    Err(ResponseError::UnexpectedCommand {
        expected,
        actual: frame.command,
    })
}

fn status_error(status: u8) -> ResponseError {
    match ErrorCode::from_byte(status) {
        Some(code) if !code.is_ok() => ResponseError::Device(code),
        _ => ResponseError::UnknownStatus(format!("{:02X}", status)),
    }
}

// ============================================================================
// Request Builders
// ============================================================================

pub fn build_hid_request() -> Vec<u8> {
    encode_unchecked(CMD_HID_REQUEST, DEFAULT_COMPONENT_ID, &[])
}

pub fn build_license_put_request(component_id: u16, license: &[u8]) -> Result<Vec<u8>, EncodeError> {
    encode(CMD_LICENSE_PUT_REQUEST, component_id, license)
}

pub fn build_license_clean_request(component_id: u16) -> Vec<u8> {
    encode_unchecked(CMD_LICENSE_CLEAN_REQUEST, component_id, &[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::bytes_to_hex;

    fn status(command: Command, byte: u8) -> Frame {
        Frame::new(command.code(), 0x03E8, vec![byte])
    }

    #[test]
    fn test_hid_request_never_confused_with_response() {
        let request = build_hid_request();
        assert_eq!(bytes_to_hex(&request), "5A000600010002000003");
        let frame = Frame::decode(&request).unwrap();
        assert!(!is_success(&frame, Command::HidResponse));
        assert!(!is_expected(&frame, Command::HidResponse));
        assert!(is_expected(&frame, Command::HidRequest));
    }

    #[test]
    fn test_reply_for_other_component_rejected() {
        let late = status(Command::LicensePutResponse, 0x00);
        assert_eq!(
            validate_put_response(&late, 0x03E9),
            Err(ResponseError::ComponentMismatch {
                expected: 0x03E9,
                actual: 0x03E8
            })
        );
        assert_eq!(
            validate_clean_response(&status(Command::LicenseCleanResponse, 0x00), 0x0001),
            Err(ResponseError::ComponentMismatch {
                expected: 0x0001,
                actual: 0x03E8
            })
        );

        let unechoed = Frame::new(CMD_LICENSE_PUT_RESPONSE, DEFAULT_COMPONENT_ID, vec![0x00]);
        assert!(validate_put_response(&unechoed, 0x03E9).is_ok());
    }

    #[test]
    fn test_is_success_is_pure() {
        let frames = [
            status(Command::LicensePutResponse, 0x00),
            status(Command::LicensePutResponse, 0x06),
            status(Command::HidResponse, 0x00),
        ];
        for frame in &frames {
            for command in [Command::LicensePutResponse, Command::HidResponse] {
                let first = is_success(frame, command);
                assert_eq!(is_success(frame, command), first);
                assert_eq!(is_success(&frame.clone(), command), first);
            }
        }
    }

    #[test]
    fn test_is_success() {
        let ok = status(Command::LicensePutResponse, 0x00);
        assert!(is_success(&ok, Command::LicensePutResponse));
        assert!(!is_success(&ok, Command::LicenseCleanResponse));

        let failed = status(Command::LicensePutResponse, 0x06);
        assert!(is_expected(&failed, Command::LicensePutResponse));
        assert!(!is_success(&failed, Command::LicensePutResponse));

        let long = Frame::new(Command::LicensePutResponse.code(), 0, vec![0x00, 0x00]);
        assert!(!is_success(&long, Command::LicensePutResponse));
    }

    #[test]
    fn test_check_response_reports_device_error() {
        assert_eq!(
            validate_put_response(&status(Command::LicensePutResponse, 0x06), 0x03E8),
            Err(ResponseError::Device(ErrorCode::DecryptFail))
        );
        assert_eq!(
            validate_put_response(&status(Command::LicensePutResponse, 0x13), 0x03E8),
            Err(ResponseError::UnknownStatus("13".into()))
        );
        assert!(validate_clean_response(&status(Command::LicenseCleanResponse, 0x00), 0x03E8).is_ok());
    }

    #[test]
    fn test_check_response_mismatch_and_reset() {
        assert_eq!(
            validate_put_response(&status(Command::HidResponse, 0x00), 0x03E8),
            Err(ResponseError::UnexpectedCommand {
                expected: Command::LicensePutResponse,
                actual: 0x0081
            })
        );
        assert_eq!(
            validate_put_response(&status(Command::ResetResponse, 0x00), 0x03E8),
            Err(ResponseError::Reset)
        );
    }

    #[test]
    fn test_validate_hid_response() {
        let frame = Frame::from_hex("5A00120081000E0000540049001350564846323020F5").unwrap();
        let hid = validate_hid_response(&frame).unwrap();
        assert_eq!(hid.as_str(), "540049001350564846323020");

        let failed = Frame::new(CMD_HID_RESPONSE, 0, vec![0x01]);
        assert_eq!(
            validate_hid_response(&failed),
            Err(ResponseError::Device(ErrorCode::ReadHidFail))
        );
        assert_eq!(
            validate_hid_response(&Frame::new(CMD_HID_RESPONSE, 0, vec![])),
            Err(ResponseError::EmptyHid)
        );
        assert_eq!(
            validate_hid_response(&Frame::new(CMD_RESET_RESPONSE, 0, vec![])),
            Err(ResponseError::Reset)
        );
    }

    #[test]
    fn test_builders() {
        let put = Frame::decode(&build_license_put_request(0x03E8, &[1, 2, 3]).unwrap()).unwrap();
        assert_eq!(put.known_command(), Some(Command::LicensePutRequest));
        assert_eq!(put.component_id, 0x03E8);
        assert_eq!(put.data, vec![1, 2, 3]);

        let clean = Frame::decode(&build_license_clean_request(0x03E9)).unwrap();
        assert_eq!(clean.known_command(), Some(Command::LicenseCleanRequest));
        assert_eq!(clean.component_id, 0x03E9);
        assert!(clean.data.is_empty());
    }
}
