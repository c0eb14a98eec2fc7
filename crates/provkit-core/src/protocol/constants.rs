//! Protocol constants for the device provisioning link.
//!
//! All multi-byte fields on the wire are big-endian.

// ============================================================================
// Frame Layout
// ============================================================================

/// First byte of every frame.
pub const FRAME_HEAD: u8 = 0x5A;

/// Head (1) + payload length (2).
pub const HEADER_LEN: usize = 3;

/// Trailing checksum byte.
pub const CHECKSUM_LEN: usize = 1;

/// Command (2) + data length (2) + component id (2).
pub const PAYLOAD_FIXED_LEN: usize = 6;

/// Size of the component id field, counted by `data_length`.
pub const COMPONENT_ID_LEN: usize = 2;

/// Smallest valid frame: header, fixed payload, checksum, no data.
pub const MIN_FRAME_LEN: usize = HEADER_LEN + PAYLOAD_FIXED_LEN + CHECKSUM_LEN;

/// Largest `data` that keeps `payload_length` inside 16 bits.
pub const MAX_DATA_LEN: usize = u16::MAX as usize - PAYLOAD_FIXED_LEN;

/// Component id used when the command does not address a component.
pub const DEFAULT_COMPONENT_ID: u16 = 0x0000;

// ============================================================================
// Commands
// ============================================================================
//
// Low byte layout: bits 7..6 message class, bits 5..4 reserved,
// bits 3..0 operation. The high byte is reserved.

/// Host asks the device for its HID.
pub const CMD_HID_REQUEST: u16 = 0x0001;
/// Device answers with its HID.
pub const CMD_HID_RESPONSE: u16 = 0x0081;
/// Host pushes one component license.
pub const CMD_LICENSE_PUT_REQUEST: u16 = 0x0002;
/// Device reports the result of a license put.
pub const CMD_LICENSE_PUT_RESPONSE: u16 = 0x0082;
/// Device asks the platform for a license (online flow, never sent by the host).
pub const CMD_LICENSE_GET_REQUEST: u16 = 0x0003;
/// Host asks the device to erase a component's license partition.
pub const CMD_LICENSE_CLEAN_REQUEST: u16 = 0x0004;
/// Device reports the result of a license erase.
pub const CMD_LICENSE_CLEAN_RESPONSE: u16 = 0x0084;
/// Device could not process the request and asks the host to start over.
pub const CMD_RESET_RESPONSE: u16 = 0x00C0;

/// Mask selecting the message class bits of a command.
pub const CMD_CLASS_MASK: u16 = 0x00C0;
/// Mask selecting the operation bits of a command.
pub const CMD_OPERATION_MASK: u16 = 0x000F;

// ============================================================================
// Device Status Codes
// ============================================================================

/// The only status byte that means success.
pub const STATUS_PROCESS_OK: u8 = 0x00;
