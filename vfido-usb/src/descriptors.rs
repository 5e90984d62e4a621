use byteorder::{LittleEndian, WriteBytesExt};

pub const LANG_ID_EN_US: u16 = 0x0409;

const MAX_PACKET_SIZE: u16 = 64;
const ENDPOINT_INTERVAL: u8 = 255;
const ATTRIBUTE_INTERRUPT: u8 = 0b0000_0011;
const CONFIG_ATTRIBUTE_BASE: u8 = 0b1000_0000;
const CONFIG_ATTRIBUTE_SELF_POWERED: u8 = 0b0100_0000;

pub const INTERFACE_CLASS_HID: u8 = 3;

/// HID Report Descriptor for a FIDO authenticator: one 64-byte input report
/// and one 64-byte output report under the FIDO Alliance usage page.
///
/// See:
/// - http://www.usb.org/developers/hidpage/HUTRR48.pdf
/// - https://fidoalliance.org/specs/fido-v2.1-ps-20210615/fido-client-to-authenticator-protocol-v2.1-ps-20210615.html#usb-discovery
pub const REPORT_DESCRIPTOR: [u8; 34] = [
    0x06, 0xd0, 0xf1, /* Usage Page: FIDO Alliance Page (0xF1D0)     */
    0x09, 0x01, /*       Usage: CTAPHID Authenticator Device (0x01)  */
    0xa1, 0x01, /*       Collection: Application                     */
    0x09, 0x20, /*       - Usage: Input Report Data (0x20)           */
    0x15, 0x00, /*       - Logical Minimum (0)                       */
    0x26, 0xff, 0x00, /* - Logical Maximum (255)                     */
    0x75, 0x08, /*       - Report Size (8)                           */
    0x95, 0x40, /*       - Report Count (64)                         */
    0x81, 0x02, /*       - Input (Data, Absolute, Variable)          */
    0x09, 0x21, /*       - Usage: Output Report Data (0x21)          */
    0x15, 0x00, /*       - Logical Minimum (0)                       */
    0x26, 0xff, 0x00, /* - Logical Maximum (255)                     */
    0x75, 0x08, /*       - Report Size (8)                           */
    0x95, 0x40, /*       - Report Count (64)                         */
    0x91, 0x02, /*       - Output (Data, Absolute, Variable)         */
    0xc0, /*             End Collection                              */
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DescriptorType {
    Device = 1,
    Configuration = 2,
    String = 3,
    Interface = 4,
    Endpoint = 5,
    Hid = 0x21,
    HidReport = 0x22,
}

impl DescriptorType {
    pub fn from_byte(byte: u8) -> Option<DescriptorType> {
        match byte {
            1 => Some(DescriptorType::Device),
            2 => Some(DescriptorType::Configuration),
            3 => Some(DescriptorType::String),
            4 => Some(DescriptorType::Interface),
            5 => Some(DescriptorType::Endpoint),
            0x21 => Some(DescriptorType::Hid),
            0x22 => Some(DescriptorType::HidReport),
            _ => None,
        }
    }
}

/// 18-byte device descriptor, little-endian packed.
#[derive(Clone, Copy, Debug)]
pub struct DeviceDescriptor {
    pub b_length: u8,
    pub b_descriptor_type: DescriptorType,
    pub bcd_usb: u16,
    pub b_device_class: u8,
    pub b_device_subclass: u8,
    pub b_device_protocol: u8,
    pub b_max_packet_size: u8,
    pub id_vendor: u16,
    pub id_product: u16,
    pub bcd_device: u16,
    pub i_manufacturer: u8,
    pub i_product: u8,
    pub i_serial_number: u8,
    pub b_num_configurations: u8,
}

impl DeviceDescriptor {
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.b_length as usize);
        bytes.push(self.b_length);
        bytes.push(self.b_descriptor_type as u8);
        bytes.write_u16::<LittleEndian>(self.bcd_usb).unwrap();
        bytes.push(self.b_device_class);
        bytes.push(self.b_device_subclass);
        bytes.push(self.b_device_protocol);
        bytes.push(self.b_max_packet_size);
        bytes.write_u16::<LittleEndian>(self.id_vendor).unwrap();
        bytes.write_u16::<LittleEndian>(self.id_product).unwrap();
        bytes.write_u16::<LittleEndian>(self.bcd_device).unwrap();
        bytes.push(self.i_manufacturer);
        bytes.push(self.i_product);
        bytes.push(self.i_serial_number);
        bytes.push(self.b_num_configurations);
        bytes
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ConfigurationDescriptor {
    pub b_length: u8,
    pub b_descriptor_type: DescriptorType,
    pub w_total_length: u16,
    pub b_num_interfaces: u8,
    pub b_configuration_value: u8,
    pub i_configuration: u8,
    pub bm_attributes: u8,
    pub b_max_power: u8,
}

impl ConfigurationDescriptor {
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.b_length as usize);
        bytes.push(self.b_length);
        bytes.push(self.b_descriptor_type as u8);
        bytes.write_u16::<LittleEndian>(self.w_total_length).unwrap();
        bytes.push(self.b_num_interfaces);
        bytes.push(self.b_configuration_value);
        bytes.push(self.i_configuration);
        bytes.push(self.bm_attributes);
        bytes.push(self.b_max_power);
        bytes
    }
}

#[derive(Clone, Copy, Debug)]
pub struct InterfaceDescriptor {
    pub b_length: u8,
    pub b_descriptor_type: DescriptorType,
    pub b_interface_number: u8,
    pub b_alternate_setting: u8,
    pub b_num_endpoints: u8,
    pub b_interface_class: u8,
    pub b_interface_subclass: u8,
    pub b_interface_protocol: u8,
    pub i_interface: u8,
}

impl InterfaceDescriptor {
    pub fn encode(&self) -> Vec<u8> {
        vec![
            self.b_length,
            self.b_descriptor_type as u8,
            self.b_interface_number,
            self.b_alternate_setting,
            self.b_num_endpoints,
            self.b_interface_class,
            self.b_interface_subclass,
            self.b_interface_protocol,
            self.i_interface,
        ]
    }
}

#[derive(Clone, Copy, Debug)]
pub struct HidDescriptor {
    pub b_length: u8,
    pub b_descriptor_type: DescriptorType,
    pub bcd_hid: u16,
    pub b_country_code: u8,
    pub b_num_descriptors: u8,
    pub b_class_descriptor_type: DescriptorType,
    pub w_report_descriptor_length: u16,
}

impl HidDescriptor {
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.b_length as usize);
        bytes.push(self.b_length);
        bytes.push(self.b_descriptor_type as u8);
        bytes.write_u16::<LittleEndian>(self.bcd_hid).unwrap();
        bytes.push(self.b_country_code);
        bytes.push(self.b_num_descriptors);
        bytes.push(self.b_class_descriptor_type as u8);
        bytes
            .write_u16::<LittleEndian>(self.w_report_descriptor_length)
            .unwrap();
        bytes
    }
}

#[derive(Clone, Copy, Debug)]
pub struct EndpointDescriptor {
    pub b_length: u8,
    pub b_descriptor_type: DescriptorType,
    pub b_endpoint_address: u8,
    pub bm_attributes: u8,
    pub w_max_packet_size: u16,
    pub b_interval: u8,
}

impl EndpointDescriptor {
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.b_length as usize);
        bytes.push(self.b_length);
        bytes.push(self.b_descriptor_type as u8);
        bytes.push(self.b_endpoint_address);
        bytes.push(self.bm_attributes);
        bytes.write_u16::<LittleEndian>(self.w_max_packet_size).unwrap();
        bytes.push(self.b_interval);
        bytes
    }
}

pub fn device_descriptor() -> DeviceDescriptor {
    DeviceDescriptor {
        b_length: 18,
        b_descriptor_type: DescriptorType::Device,
        bcd_usb: 0x0110,
        b_device_class: 0,
        b_device_subclass: 0,
        b_device_protocol: 0,
        b_max_packet_size: MAX_PACKET_SIZE as u8,
        id_vendor: 0,
        id_product: 0,
        bcd_device: 0x0001,
        i_manufacturer: 1,
        i_product: 2,
        i_serial_number: 3,
        b_num_configurations: 1,
    }
}

fn configuration_descriptor(appended_length: u16) -> ConfigurationDescriptor {
    ConfigurationDescriptor {
        b_length: 9,
        b_descriptor_type: DescriptorType::Configuration,
        w_total_length: 9 + appended_length,
        b_num_interfaces: 1,
        b_configuration_value: 0,
        i_configuration: 4,
        bm_attributes: CONFIG_ATTRIBUTE_BASE | CONFIG_ATTRIBUTE_SELF_POWERED,
        b_max_power: 0,
    }
}

fn interface_descriptor() -> InterfaceDescriptor {
    InterfaceDescriptor {
        b_length: 9,
        b_descriptor_type: DescriptorType::Interface,
        b_interface_number: 0,
        b_alternate_setting: 0,
        b_num_endpoints: 2,
        b_interface_class: INTERFACE_CLASS_HID,
        b_interface_subclass: 0,
        b_interface_protocol: 0,
        i_interface: 5,
    }
}

fn hid_descriptor() -> HidDescriptor {
    HidDescriptor {
        b_length: 9,
        b_descriptor_type: DescriptorType::Hid,
        bcd_hid: 0x0101,
        b_country_code: 0,
        b_num_descriptors: 1,
        b_class_descriptor_type: DescriptorType::HidReport,
        w_report_descriptor_length: REPORT_DESCRIPTOR.len() as u16,
    }
}

fn endpoint_descriptors() -> [EndpointDescriptor; 2] {
    [
        // EP1-IN: interrupt endpoint carrying responses to the host.
        EndpointDescriptor {
            b_length: 7,
            b_descriptor_type: DescriptorType::Endpoint,
            b_endpoint_address: 0b1000_0001,
            bm_attributes: ATTRIBUTE_INTERRUPT,
            w_max_packet_size: MAX_PACKET_SIZE,
            b_interval: ENDPOINT_INTERVAL,
        },
        // EP2-OUT: interrupt endpoint receiving reports from the host.
        EndpointDescriptor {
            b_length: 7,
            b_descriptor_type: DescriptorType::Endpoint,
            b_endpoint_address: 0b0000_0010,
            bm_attributes: ATTRIBUTE_INTERRUPT,
            w_max_packet_size: MAX_PACKET_SIZE,
            b_interval: ENDPOINT_INTERVAL,
        },
    ]
}

/// The full GET_DESCRIPTOR(CONFIGURATION) reply: configuration, interface,
/// HID, and both endpoint descriptors concatenated, with `wTotalLength`
/// covering all five.
pub fn configuration_block() -> Vec<u8> {
    let mut appended = interface_descriptor().encode();
    appended.extend_from_slice(&hid_descriptor().encode());
    for endpoint in endpoint_descriptors() {
        appended.extend_from_slice(&endpoint.encode());
    }

    let mut bytes = configuration_descriptor(appended.len() as u16).encode();
    bytes.extend_from_slice(&appended);
    bytes
}

/// Raw payload of string descriptor `index`: the language-id table for
/// index 0, UTF-16LE text otherwise. Unknown indices are a host or
/// transport bug and abort the device.
pub fn string_descriptor(index: u8) -> Vec<u8> {
    match index {
        0 => {
            let mut bytes = Vec::with_capacity(2);
            bytes.write_u16::<LittleEndian>(LANG_ID_EN_US).unwrap();
            bytes
        }
        1 => utf16_encode("No Company"),
        2 => utf16_encode("Virtual FIDO"),
        3 => utf16_encode("No Serial Number"),
        4 => utf16_encode("String 4"),
        5 => utf16_encode("Default Interface"),
        _ => panic!("invalid string descriptor index: {index}"),
    }
}

fn utf16_encode(message: &str) -> Vec<u8> {
    message.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_descriptor_is_bit_exact() {
        let bytes = device_descriptor().encode();

        assert_eq!(bytes.len(), 18);
        assert_eq!(
            &bytes[..8],
            &[0x12, 0x01, 0x10, 0x01, 0x00, 0x00, 0x00, 0x40]
        );
        // vid/pid zero, bcdDevice 0x0001, string indices 1/2/3, one config.
        assert_eq!(
            &bytes[8..],
            &[0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x02, 0x03, 0x01]
        );
    }

    #[test]
    fn configuration_block_covers_all_descriptors() {
        let bytes = configuration_block();

        assert_eq!(bytes.len(), 41);
        assert_eq!(bytes[0], 0x09);
        assert_eq!(bytes[1], 0x02);
        let total_length = u16::from_le_bytes([bytes[2], bytes[3]]);
        assert_eq!(total_length, 41);
    }

    #[test]
    fn configuration_block_interleaves_interface_hid_endpoints() {
        let bytes = configuration_block();

        // interface descriptor directly after the configuration descriptor
        assert_eq!(bytes[9], 9);
        assert_eq!(bytes[10], DescriptorType::Interface as u8);
        assert_eq!(bytes[14], INTERFACE_CLASS_HID);
        // HID descriptor with the report-map length
        assert_eq!(bytes[18], 9);
        assert_eq!(bytes[19], DescriptorType::Hid as u8);
        let report_length = u16::from_le_bytes([bytes[25], bytes[26]]);
        assert_eq!(report_length as usize, REPORT_DESCRIPTOR.len());
        // the two interrupt endpoints
        assert_eq!(bytes[27], 7);
        assert_eq!(bytes[29], 0b1000_0001);
        assert_eq!(bytes[30], 0b0000_0011);
        assert_eq!(bytes[34], 7);
        assert_eq!(bytes[36], 0b0000_0010);
    }

    #[test]
    fn string_zero_is_the_language_table() {
        assert_eq!(string_descriptor(0), vec![0x09, 0x04]);
    }

    #[test]
    fn product_string_is_utf16le() {
        let payload = string_descriptor(2);

        assert_eq!(payload.len(), 24);
        assert_eq!(&payload[..4], &[b'V', 0x00, b'i', 0x00]);
    }

    #[test]
    #[should_panic(expected = "invalid string descriptor index")]
    fn unknown_string_index_panics() {
        string_descriptor(6);
    }

    #[test]
    fn report_descriptor_declares_fido_usage_page() {
        assert_eq!(REPORT_DESCRIPTOR.len(), 34);
        assert_eq!(&REPORT_DESCRIPTOR[..3], &[0x06, 0xd0, 0xf1]);
        assert_eq!(REPORT_DESCRIPTOR[33], 0xc0);
    }
}
