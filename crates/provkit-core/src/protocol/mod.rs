//! Protocol module - wire frames, command vocabulary, response checks.

pub mod command;
pub mod constants;
pub mod frame;
pub mod validate;

pub use command::{Command, ErrorCode, MessageClass};
pub use constants::*;
pub use frame::{EncodeError, Frame, FrameError, LengthField, checksum, decode, encode};
pub use validate::{
    ResponseError, build_hid_request, build_license_clean_request, build_license_put_request,
    check_response, is_expected, is_success, validate_clean_response, validate_hid_response,
    validate_put_response,
};
