//! USB HID device emulation for a software FIDO/U2F security key.
//!
//! The device answers control-transfer descriptor queries itself and routes
//! interrupt-endpoint traffic to a delegate, which owns the HID framing
//! layer above it. The transport below it (USB/IP or any other virtual-bus
//! attachment) is an opaque source of transfer submissions.

mod descriptors;
mod device;
mod setup;

pub use descriptors::{
    configuration_block, device_descriptor, string_descriptor, ConfigurationDescriptor,
    DescriptorType, DeviceDescriptor, EndpointDescriptor, HidDescriptor, InterfaceDescriptor,
    LANG_ID_EN_US, REPORT_DESCRIPTOR,
};
pub use device::{DeviceSummary, OnFinish, TransferBuffer, UsbDevice, UsbDeviceDelegate};
pub use setup::{RequestDirection, RequestKind, RequestRecipient, SetupPacket};
