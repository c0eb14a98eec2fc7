//! Command and device status vocabulary.

use std::fmt;

use super::constants::*;

/// Commands understood by the device firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Command {
    HidRequest = CMD_HID_REQUEST,
    HidResponse = CMD_HID_RESPONSE,
    LicensePutRequest = CMD_LICENSE_PUT_REQUEST,
    LicensePutResponse = CMD_LICENSE_PUT_RESPONSE,
    LicenseGetRequest = CMD_LICENSE_GET_REQUEST,
    LicenseCleanRequest = CMD_LICENSE_CLEAN_REQUEST,
    LicenseCleanResponse = CMD_LICENSE_CLEAN_RESPONSE,
    ResetResponse = CMD_RESET_RESPONSE,
}

/// Message class carried in bits 7..6 of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageClass {
    /// Peer must answer.
    Request,
    /// Peer acts but does not answer.
    NonResponse,
    /// Answer to a request.
    Response,
    /// Request could not be processed.
    Reset,
}

impl Command {
    pub const ALL: [Command; 8] = [
        Command::HidRequest,
        Command::HidResponse,
        Command::LicensePutRequest,
        Command::LicensePutResponse,
        Command::LicenseGetRequest,
        Command::LicenseCleanRequest,
        Command::LicenseCleanResponse,
        Command::ResetResponse,
    ];

    /// Wire value.
    pub const fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    /// Snake-case name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Command::HidRequest => "hid_request",
            Command::HidResponse => "hid_response",
            Command::LicensePutRequest => "license_put_request",
            Command::LicensePutResponse => "license_put_response",
            Command::LicenseGetRequest => "license_get_request",
            Command::LicenseCleanRequest => "license_clean_request",
            Command::LicenseCleanResponse => "license_clean_response",
            Command::ResetResponse => "reset_response",
        }
    }

    pub fn class(self) -> MessageClass {
        MessageClass::of(self.code())
    }

    /// Response the device sends for a host request.
    pub fn response(self) -> Option<Command> {
        match self {
            Command::HidRequest => Some(Command::HidResponse),
            Command::LicensePutRequest => Some(Command::LicensePutResponse),
            Command::LicenseCleanRequest => Some(Command::LicenseCleanResponse),
            _ => None,
        }
    }
}

impl MessageClass {
    /// Class of an arbitrary command code, known or not.
    pub fn of(code: u16) -> Self {
        match (code & CMD_CLASS_MASK) >> 6 {
            0b00 => MessageClass::Request,
            0b01 => MessageClass::NonResponse,
            0b10 => MessageClass::Response,
            _ => MessageClass::Reset,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:04X})", self.name(), self.code())
    }
}

/// Status byte reported by the device in the data field of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    ProcessOk = STATUS_PROCESS_OK,
    ReadHidFail = 0x01,
    ComponentIdMismatch = 0x02,
    NullPointer = 0x03,
    LicenseSizeInvalid = 0x04,
    Sm4InitFail = 0x05,
    DecryptFail = 0x06,
    BodyLengthInvalid = 0x07,
    HidVerifyFail = 0x08,
    NotEnoughParameters = 0x09,
    ComponentIdNotInTable = 0x0A,
    FlashPartitionInvalid = 0x0B,
    MagicAllocFail = 0x0C,
    MagicReadFail = 0x0D,
    MagicWriteFail = 0x0E,
    FlashEraseFail = 0x0F,
    WriteFail = 0x10,
    ReadPointerNull = 0x11,
    ReadFail = 0x12,
    UartNoHeader = 0x14,
    UartReceiveTimeout = 0x15,
    UartChecksumFail = 0x16,
    CommandError = 0x17,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 23] = [
        ErrorCode::ProcessOk,
        ErrorCode::ReadHidFail,
        ErrorCode::ComponentIdMismatch,
        ErrorCode::NullPointer,
        ErrorCode::LicenseSizeInvalid,
        ErrorCode::Sm4InitFail,
        ErrorCode::DecryptFail,
        ErrorCode::BodyLengthInvalid,
        ErrorCode::HidVerifyFail,
        ErrorCode::NotEnoughParameters,
        ErrorCode::ComponentIdNotInTable,
        ErrorCode::FlashPartitionInvalid,
        ErrorCode::MagicAllocFail,
        ErrorCode::MagicReadFail,
        ErrorCode::MagicWriteFail,
        ErrorCode::FlashEraseFail,
        ErrorCode::WriteFail,
        ErrorCode::ReadPointerNull,
        ErrorCode::ReadFail,
        ErrorCode::UartNoHeader,
        ErrorCode::UartReceiveTimeout,
        ErrorCode::UartChecksumFail,
        ErrorCode::CommandError,
    ];

    pub const fn byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.byte() == byte)
    }

    pub fn is_ok(self) -> bool {
        self == ErrorCode::ProcessOk
    }

    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::ProcessOk => "process ok",
            ErrorCode::ReadHidFail => "failed to read HID",
            ErrorCode::ComponentIdMismatch => "component id does not match",
            ErrorCode::NullPointer => "null pointer",
            ErrorCode::LicenseSizeInvalid => "invalid license size",
            ErrorCode::Sm4InitFail => "SM4 init failed",
            ErrorCode::DecryptFail => "license decrypt failed",
            ErrorCode::BodyLengthInvalid => "invalid license body length",
            ErrorCode::HidVerifyFail => "HID verification failed",
            ErrorCode::NotEnoughParameters => "not enough parameters",
            ErrorCode::ComponentIdNotInTable => "component id not in table",
            ErrorCode::FlashPartitionInvalid => "invalid flash partition",
            ErrorCode::MagicAllocFail => "magic allocation failed",
            ErrorCode::MagicReadFail => "magic read failed",
            ErrorCode::MagicWriteFail => "magic write failed",
            ErrorCode::FlashEraseFail => "flash erase failed",
            ErrorCode::WriteFail => "license write failed",
            ErrorCode::ReadPointerNull => "read pointer is null",
            ErrorCode::ReadFail => "license read failed",
            ErrorCode::UartNoHeader => "UART frame without header",
            ErrorCode::UartReceiveTimeout => "UART receive timeout",
            ErrorCode::UartChecksumFail => "UART checksum failed",
            ErrorCode::CommandError => "command error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.description(), self.byte())
    }
}
