use byteorder::{BigEndian, WriteBytesExt};

use crate::constants::*;
use crate::Counter;

#[derive(Debug)]
pub enum StatusCode {
    NoError,
    TestOfUserPresenceNotSatisfied,
    InvalidKeyHandle,
    RequestLengthInvalid,
    RequestClassNotSupported,
    RequestInstructionNotSupported,
}

impl StatusCode {
    pub fn write<W: WriteBytesExt>(&self, write: &mut W) {
        let value = match self {
            StatusCode::NoError => SW_NO_ERROR,
            StatusCode::TestOfUserPresenceNotSatisfied => SW_CONDITIONS_NOT_SATISFIED,
            StatusCode::InvalidKeyHandle => SW_WRONG_DATA,
            StatusCode::RequestLengthInvalid => SW_WRONG_LENGTH,
            StatusCode::RequestClassNotSupported => SW_CLA_NOT_SUPPORTED,
            StatusCode::RequestInstructionNotSupported => SW_INS_NOT_SUPPORTED,
        };
        write.write_u16::<BigEndian>(value).unwrap();
    }
}

pub enum Response {
    Registration {
        user_public_key: Vec<u8>,
        key_handle: Vec<u8>,
        attestation_certificate: Vec<u8>,
        signature: Vec<u8>,
    },
    Authentication {
        counter: Counter,
        signature: Vec<u8>,
    },
    Version {
        version_string: String,
    },
    TestOfUserPresenceNotSatisfied,
    InvalidKeyHandle,
    WrongLength,
}

impl Response {
    pub fn into_bytes(self) -> Vec<u8> {
        let mut bytes = Vec::new();
        match self {
            Response::Registration {
                user_public_key,
                key_handle,
                attestation_certificate,
                signature,
            } => {
                // reserved byte [1 byte], which for legacy reasons has the value 0x05.
                bytes.push(0x05);

                // user public key [65 bytes]. Uncompressed x,y-representation
                // of a point on the P-256 NIST elliptic curve.
                bytes.extend_from_slice(&user_public_key);

                // key handle length byte [1 byte], unsigned (range 0-255).
                bytes.push(key_handle.len() as u8);

                // key handle [length specified in previous field].
                bytes.extend_from_slice(&key_handle);

                // attestation certificate [variable length], X.509 DER.
                bytes.extend_from_slice(&attestation_certificate);

                // signature [variable length, 71-73 bytes].
                bytes.extend_from_slice(&signature);

                StatusCode::NoError.write(&mut bytes);
            }
            Response::Authentication { counter, signature } => {
                // user presence byte [1 byte], bit 0 set.
                bytes.push(0x01);

                // counter [4 bytes].
                bytes.write_u32::<BigEndian>(counter).unwrap();

                // signature [variable length, 71-73 bytes].
                bytes.extend_from_slice(&signature);

                StatusCode::NoError.write(&mut bytes);
            }
            Response::Version { version_string } => {
                // ASCII representation of the string, without quotes or any
                // NUL terminator.
                bytes.extend_from_slice(version_string.as_bytes());
                StatusCode::NoError.write(&mut bytes);
            }
            Response::TestOfUserPresenceNotSatisfied => {
                StatusCode::TestOfUserPresenceNotSatisfied.write(&mut bytes);
            }
            Response::InvalidKeyHandle => {
                StatusCode::InvalidKeyHandle.write(&mut bytes);
            }
            Response::WrongLength => {
                StatusCode::RequestLengthInvalid.write(&mut bytes);
            }
        }
        bytes
    }
}
