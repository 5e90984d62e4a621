use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::descriptors::DescriptorType;

// Standard request codes handled by this device.
pub const REQUEST_GET_STATUS: u8 = 0;
pub const REQUEST_GET_DESCRIPTOR: u8 = 6;
pub const REQUEST_SET_CONFIGURATION: u8 = 9;

// HID class request codes handled by this device.
pub const HID_REQUEST_SET_IDLE: u8 = 0x0a;
pub const HID_REQUEST_SET_PROTOCOL: u8 = 0x0b;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RequestRecipient {
    Device,
    Interface,
    Endpoint,
    Other,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RequestKind {
    Standard,
    Class,
    Vendor,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RequestDirection {
    HostToDevice,
    DeviceToHost,
}

/// The 8-byte control-transfer header defined by USB 2.0, little-endian on
/// the wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SetupPacket {
    pub bm_request_type: u8,
    pub b_request: u8,
    pub w_value: u16,
    pub w_index: u16,
    pub w_length: u16,
}

impl SetupPacket {
    pub fn decode(bytes: &[u8; 8]) -> SetupPacket {
        let mut reader = Cursor::new(&bytes[..]);
        SetupPacket {
            bm_request_type: reader.read_u8().unwrap(),
            b_request: reader.read_u8().unwrap(),
            w_value: reader.read_u16::<LittleEndian>().unwrap(),
            w_index: reader.read_u16::<LittleEndian>().unwrap(),
            w_length: reader.read_u16::<LittleEndian>().unwrap(),
        }
    }

    pub fn recipient(&self) -> Option<RequestRecipient> {
        match self.bm_request_type & 0x1f {
            0 => Some(RequestRecipient::Device),
            1 => Some(RequestRecipient::Interface),
            2 => Some(RequestRecipient::Endpoint),
            3 => Some(RequestRecipient::Other),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<RequestKind> {
        match (self.bm_request_type >> 5) & 0x3 {
            0 => Some(RequestKind::Standard),
            1 => Some(RequestKind::Class),
            2 => Some(RequestKind::Vendor),
            _ => None,
        }
    }

    pub fn direction(&self) -> RequestDirection {
        if self.bm_request_type >> 7 == 0 {
            RequestDirection::HostToDevice
        } else {
            RequestDirection::DeviceToHost
        }
    }
}

/// For GET_DESCRIPTOR requests `wValue` carries the descriptor type in its
/// high byte and the descriptor index in its low byte.
pub(crate) fn descriptor_type_and_index(w_value: u16) -> (Option<DescriptorType>, u8) {
    (
        DescriptorType::from_byte((w_value >> 8) as u8),
        w_value as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_get_device_descriptor_setup() {
        // GET_DESCRIPTOR(DEVICE), wLength 64.
        let setup = SetupPacket::decode(&[0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x40, 0x00]);

        assert_eq!(setup.bm_request_type, 0x80);
        assert_eq!(setup.direction(), RequestDirection::DeviceToHost);
        assert_eq!(setup.kind(), Some(RequestKind::Standard));
        assert_eq!(setup.recipient(), Some(RequestRecipient::Device));
        assert_eq!(setup.b_request, REQUEST_GET_DESCRIPTOR);
        assert_eq!(setup.w_value, 0x0100);
        assert_eq!(setup.w_index, 0);
        assert_eq!(setup.w_length, 64);

        let (descriptor_type, index) = descriptor_type_and_index(setup.w_value);
        assert_eq!(descriptor_type, Some(DescriptorType::Device));
        assert_eq!(index, 0);
    }

    #[test]
    fn decodes_class_interface_request() {
        // SET_IDLE to interface 0.
        let setup = SetupPacket::decode(&[0x21, 0x0a, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);

        assert_eq!(setup.direction(), RequestDirection::HostToDevice);
        assert_eq!(setup.kind(), Some(RequestKind::Class));
        assert_eq!(setup.recipient(), Some(RequestRecipient::Interface));
        assert_eq!(setup.b_request, HID_REQUEST_SET_IDLE);
    }

    #[test]
    fn fields_are_little_endian() {
        let setup = SetupPacket::decode(&[0x80, 0x06, 0x02, 0x03, 0x09, 0x04, 0xff, 0x00]);

        assert_eq!(setup.w_value, 0x0302);
        assert_eq!(setup.w_index, 0x0409);
        assert_eq!(setup.w_length, 0x00ff);
    }

    #[test]
    fn reserved_recipient_is_rejected() {
        let setup = SetupPacket::decode(&[0x1f, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);

        assert_eq!(setup.recipient(), None);
    }
}
