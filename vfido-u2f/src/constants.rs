//! Command codes and status words of the FIDO U2F Raw Message Format v1.2.

pub const REGISTER_COMMAND_CODE: u8 = 0x01;
pub const AUTHENTICATE_COMMAND_CODE: u8 = 0x02;
pub const VERSION_COMMAND_CODE: u8 = 0x03;

pub const SW_NO_ERROR: u16 = 0x9000; // The command completed successfully without error.
pub const SW_CONDITIONS_NOT_SATISFIED: u16 = 0x6985; // The request was rejected due to test-of-user-presence being required.
pub const SW_WRONG_DATA: u16 = 0x6A80; // The request was rejected due to an invalid key handle.
pub const SW_WRONG_LENGTH: u16 = 0x6700; // The length of the request was invalid.
pub const SW_CLA_NOT_SUPPORTED: u16 = 0x6E00; // The Class byte of the request is not supported.
pub const SW_INS_NOT_SUPPORTED: u16 = 0x6D00; // The Instruction of the request is not supported.

// AUTHENTICATE control byte (P1) values.
pub const AUTH_ENFORCE_USER_PRESENCE_AND_SIGN: u8 = 0x03;
pub const AUTH_CHECK_ONLY: u8 = 0x07;
pub const AUTH_DONT_ENFORCE_USER_PRESENCE_AND_SIGN: u8 = 0x08;

pub const EC_POINT_FORMAT_UNCOMPRESSED: u8 = 0x04;

/// The wire encodes the handle length in one byte.
pub const MAX_KEY_HANDLE_LEN: usize = 255;
