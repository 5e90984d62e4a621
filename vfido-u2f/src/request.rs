use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApduDecodeError {
    #[error("message shorter than the 4-byte header")]
    TruncatedHeader,

    #[error("extended length encoding must begin with a zero byte")]
    MissingLengthMarker,

    #[error("length field is truncated")]
    TruncatedLength,

    #[error("request data shorter than its declared length {declared}")]
    TruncatedRequest { declared: u16 },

    #[error("trailing bytes are not a 16-bit response length")]
    TruncatedResponseLength,
}

/// `{CLA, INS, P1, P2}`. CLA is never inspected: hosts set class bits for
/// channel multiplexing and every value is accepted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MessageHeader {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
}

#[derive(Debug)]
pub struct Apdu {
    pub header: MessageHeader,
    pub request: Vec<u8>,
    pub response_length: u16,
}

impl Apdu {
    /// Extended-length decoding. After the header both the request length
    /// and the response length are optional: a lone 16-bit length is the
    /// response length, a length followed by that many bytes is the
    /// request, and a further 16-bit value is the response length.
    pub fn decode(message: &[u8]) -> Result<Apdu, ApduDecodeError> {
        let mut reader = Cursor::new(message);

        let mut header_bytes = [0u8; 4];
        reader
            .read_exact(&mut header_bytes)
            .map_err(|_| ApduDecodeError::TruncatedHeader)?;
        let header = MessageHeader {
            cla: header_bytes[0],
            ins: header_bytes[1],
            p1: header_bytes[2],
            p2: header_bytes[3],
        };

        if remaining(&reader) == 0 {
            return Ok(Apdu {
                header,
                request: Vec::new(),
                response_length: 0,
            });
        }

        let marker = reader
            .read_u8()
            .map_err(|_| ApduDecodeError::MissingLengthMarker)?;
        if marker != 0 {
            return Err(ApduDecodeError::MissingLengthMarker);
        }
        let length = reader
            .read_u16::<BigEndian>()
            .map_err(|_| ApduDecodeError::TruncatedLength)?;

        if remaining(&reader) == 0 {
            // Nothing follows the length, so it is the response length.
            return Ok(Apdu {
                header,
                request: Vec::new(),
                response_length: length,
            });
        }

        let mut request = vec![0u8; length as usize];
        reader
            .read_exact(&mut request)
            .map_err(|_| ApduDecodeError::TruncatedRequest { declared: length })?;

        let response_length = if remaining(&reader) == 0 {
            0
        } else {
            reader
                .read_u16::<BigEndian>()
                .map_err(|_| ApduDecodeError::TruncatedResponseLength)?
        };

        Ok(Apdu {
            header,
            request,
            response_length,
        })
    }
}

fn remaining(reader: &Cursor<&[u8]>) -> usize {
    reader.get_ref().len() - reader.position() as usize
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn header_only_messages_have_no_request_and_no_response_length() {
        for ins in [0x01, 0x02, 0x03, 0x40, 0xff] {
            let apdu = Apdu::decode(&[0x00, ins, 0x07, 0x2a]).unwrap();

            assert_eq!(
                apdu.header,
                MessageHeader {
                    cla: 0x00,
                    ins,
                    p1: 0x07,
                    p2: 0x2a
                }
            );
            assert!(apdu.request.is_empty());
            assert_eq!(apdu.response_length, 0);
        }
    }

    #[test]
    fn a_lone_length_is_the_response_length() {
        let apdu = Apdu::decode(&[0x00, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00]).unwrap();

        assert!(apdu.request.is_empty());
        assert_eq!(apdu.response_length, 0x0100);
    }

    #[test]
    fn a_length_followed_by_data_is_the_request() {
        let apdu = Apdu::decode(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x02, 0xaa, 0xbb]).unwrap();

        assert_eq!(apdu.request, vec![0xaa, 0xbb]);
        assert_eq!(apdu.response_length, 0);
    }

    #[test]
    fn request_and_response_lengths_may_both_be_present() {
        let apdu = Apdu::decode(&[
            0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x02, 0xaa, 0xbb, 0x01, 0x00,
        ])
        .unwrap();

        assert_eq!(apdu.request, vec![0xaa, 0xbb]);
        assert_eq!(apdu.response_length, 0x0100);
    }

    #[test]
    fn any_cla_byte_is_accepted() {
        for cla in [0x00, 0x80, 0xff] {
            let apdu = Apdu::decode(&[cla, 0x03, 0x00, 0x00]).unwrap();
            assert_eq!(apdu.header.cla, cla);
        }
    }

    #[test]
    fn short_headers_are_rejected() {
        assert_matches!(
            Apdu::decode(&[0x00, 0x01, 0x00]),
            Err(ApduDecodeError::TruncatedHeader)
        );
    }

    #[test]
    fn a_nonzero_length_marker_is_rejected() {
        assert_matches!(
            Apdu::decode(&[0x00, 0x01, 0x00, 0x00, 0x40]),
            Err(ApduDecodeError::MissingLengthMarker)
        );
    }

    #[test]
    fn a_one_byte_length_is_rejected() {
        assert_matches!(
            Apdu::decode(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x01]),
            Err(ApduDecodeError::TruncatedLength)
        );
    }

    #[test]
    fn request_data_shorter_than_declared_is_rejected() {
        assert_matches!(
            Apdu::decode(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x04, 0xaa]),
            Err(ApduDecodeError::TruncatedRequest { declared: 4 })
        );
    }

    #[test]
    fn a_one_byte_response_length_is_rejected() {
        assert_matches!(
            Apdu::decode(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0xaa, 0x01]),
            Err(ApduDecodeError::TruncatedResponseLength)
        );
    }
}
