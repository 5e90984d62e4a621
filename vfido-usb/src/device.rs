use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{trace, warn};

use crate::descriptors::{
    configuration_block, device_descriptor, string_descriptor, DescriptorType,
    INTERFACE_CLASS_HID, REPORT_DESCRIPTOR,
};
use crate::setup::{
    descriptor_type_and_index, RequestRecipient, SetupPacket, HID_REQUEST_SET_IDLE,
    HID_REQUEST_SET_PROTOCOL, REQUEST_GET_DESCRIPTOR, REQUEST_GET_STATUS,
    REQUEST_SET_CONFIGURATION,
};

// Endpoint numbering is from the device's point of view: endpoint 1 is the
// interrupt endpoint the device writes responses to (host IN URBs, address
// 0x81), endpoint 2 is the interrupt endpoint the host writes reports to
// (host OUT URBs, address 0x02).
const ENDPOINT_CONTROL: u32 = 0;
const ENDPOINT_OUTPUT: u32 = 1;
const ENDPOINT_INPUT: u32 = 2;

const RESPONSE_TIMEOUT: Duration = Duration::from_millis(1000);

/// A transfer buffer owned by the transport and shared with the device for
/// the lifetime of one URB.
pub type TransferBuffer = Arc<Mutex<Vec<u8>>>;

pub type OnFinish = Box<dyn FnOnce() + Send>;

/// The HID framing layer sitting above the device.
pub trait UsbDeviceDelegate: Send + Sync + 'static {
    /// Cancels a waiting response request. Returns true if `id` was still
    /// pending, in which case its transfer buffer will never be written.
    /// Must be race-safe against a concurrent `get_response` for the same
    /// id.
    fn remove_waiting_request(&self, id: u32) -> bool;

    /// Consumes one report buffer received from the host. Runs the message
    /// layers above the device, so this may block for as long as a user
    /// takes to approve a request.
    fn handle_message(&self, transfer_buffer: TransferBuffer);

    /// Returns the next pending response for request `id`, or `None` if
    /// none arrived within `timeout`. After `None` the request stays
    /// registered until the transport cancels it with
    /// `remove_waiting_request`.
    fn get_response(&self, id: u32, timeout: Duration) -> Option<Vec<u8>>;
}

/// Fixed values of the attach record advertised to a USB/IP client.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DeviceSummary {
    pub busnum: u32,
    pub devnum: u32,
    pub speed: u32,
    pub path: &'static str,
    pub bus_id: &'static str,
    pub id_vendor: u16,
    pub id_product: u16,
    pub bcd_device: u16,
    pub device_class: u8,
    pub device_subclass: u8,
    pub device_protocol: u8,
    pub configuration_value: u8,
    pub num_configurations: u8,
    pub num_interfaces: u8,
    pub interface_class: u8,
    pub interface_subclass: u8,
    pub interface_protocol: u8,
}

struct OutputRequest {
    id: u32,
    transfer_buffer: TransferBuffer,
    on_finish: OnFinish,
}

/// A virtual USB HID device. Control transfers are answered from the
/// descriptor tables; interrupt traffic is routed to the delegate.
pub struct UsbDevice<D> {
    delegate: Arc<D>,
    output_queue: mpsc::Sender<OutputRequest>,
}

impl<D: UsbDeviceDelegate> UsbDevice<D> {
    pub fn new(delegate: Arc<D>) -> UsbDevice<D> {
        let (output_queue, requests) = mpsc::channel::<OutputRequest>();
        let worker_delegate = Arc::clone(&delegate);
        // Responses are copied out by a single worker, one request at a
        // time in submission order, so the host observes reports in the
        // order the layers above produced them. The worker exits when the
        // device is dropped.
        thread::spawn(move || {
            for request in requests {
                match worker_delegate.get_response(request.id, RESPONSE_TIMEOUT) {
                    Some(response) => {
                        copy_into(&request.transfer_buffer, &response);
                        (request.on_finish)();
                    }
                    None => {
                        // Left for the transport to cancel via
                        // remove_waiting_request; the buffer stays
                        // untouched and on_finish is never invoked.
                        warn!(id = request.id, "no response before timeout");
                    }
                }
            }
        });
        UsbDevice {
            delegate,
            output_queue,
        }
    }

    pub fn bus_id(&self) -> &'static str {
        "2-2"
    }

    pub fn device_summary(&self) -> DeviceSummary {
        DeviceSummary {
            busnum: 2,
            devnum: 2,
            speed: 2,
            path: "/device/0",
            bus_id: self.bus_id(),
            id_vendor: 0,
            id_product: 0,
            bcd_device: 0,
            device_class: 0,
            device_subclass: 0,
            device_protocol: 0,
            configuration_value: 0,
            num_configurations: 1,
            num_interfaces: 1,
            interface_class: INTERFACE_CLASS_HID,
            interface_subclass: 0,
            interface_protocol: 0,
        }
    }

    pub fn remove_waiting_request(&self, id: u32) -> bool {
        self.delegate.remove_waiting_request(id)
    }

    /// Routes one URB. Control transfers complete synchronously before this
    /// returns; endpoint-1 completions happen later in submission order;
    /// endpoint-2 buffers are handed off to the delegate and finished
    /// immediately.
    pub fn handle_message(
        &self,
        id: u32,
        on_finish: impl FnOnce() + Send + 'static,
        endpoint: u32,
        setup_bytes: [u8; 8],
        transfer_buffer: TransferBuffer,
    ) {
        trace!(id, endpoint, "usb message");
        match endpoint {
            ENDPOINT_CONTROL => {
                let setup = SetupPacket::decode(&setup_bytes);
                if let Some(reply) = self.handle_control_message(&setup) {
                    copy_into(&transfer_buffer, &reply);
                }
                on_finish();
            }
            ENDPOINT_OUTPUT => {
                let request = OutputRequest {
                    id,
                    transfer_buffer,
                    on_finish: Box::new(on_finish),
                };
                self.output_queue
                    .send(request)
                    .expect("response worker is gone");
            }
            ENDPOINT_INPUT => {
                let delegate = Arc::clone(&self.delegate);
                thread::spawn(move || delegate.handle_message(transfer_buffer));
                on_finish();
            }
            _ => panic!("invalid usb endpoint: {endpoint}"),
        }
    }

    fn handle_control_message(&self, setup: &SetupPacket) -> Option<Vec<u8>> {
        trace!(?setup, "control message");
        match setup.recipient() {
            Some(RequestRecipient::Device) => self.handle_device_request(setup),
            Some(RequestRecipient::Interface) => self.handle_interface_request(setup),
            recipient => panic!("invalid control request recipient: {recipient:?}"),
        }
    }

    fn handle_device_request(&self, setup: &SetupPacket) -> Option<Vec<u8>> {
        match setup.b_request {
            REQUEST_GET_DESCRIPTOR => {
                let (descriptor_type, index) = descriptor_type_and_index(setup.w_value);
                match descriptor_type {
                    Some(descriptor_type) => Some(self.descriptor(descriptor_type, index)),
                    None => panic!("invalid descriptor type: {:#06x}", setup.w_value),
                }
            }
            REQUEST_SET_CONFIGURATION => {
                // Only one configuration exists, nothing to change.
                trace!("SET_CONFIGURATION: no-op");
                None
            }
            REQUEST_GET_STATUS => Some(vec![0x01]), // self-powered
            request => panic!("invalid device bRequest: {request}"),
        }
    }

    fn handle_interface_request(&self, setup: &SetupPacket) -> Option<Vec<u8>> {
        match setup.b_request {
            HID_REQUEST_SET_IDLE | HID_REQUEST_SET_PROTOCOL => {
                // No-ops: always idle, always report protocol.
                trace!(request = setup.b_request, "interface request: no-op");
                None
            }
            REQUEST_GET_DESCRIPTOR => {
                let (descriptor_type, index) = descriptor_type_and_index(setup.w_value);
                match descriptor_type {
                    Some(DescriptorType::HidReport) => Some(REPORT_DESCRIPTOR.to_vec()),
                    _ => panic!(
                        "invalid interface descriptor request: {descriptor_type:?} index {index}"
                    ),
                }
            }
            request => panic!("invalid interface bRequest: {request}"),
        }
    }

    fn descriptor(&self, descriptor_type: DescriptorType, index: u8) -> Vec<u8> {
        trace!(?descriptor_type, index, "get descriptor");
        match descriptor_type {
            DescriptorType::Device => device_descriptor().encode(),
            DescriptorType::Configuration => configuration_block(),
            DescriptorType::String => {
                let payload = string_descriptor(index);
                let mut bytes = Vec::with_capacity(2 + payload.len());
                bytes.push(2 + payload.len() as u8);
                bytes.push(DescriptorType::String as u8);
                bytes.extend_from_slice(&payload);
                bytes
            }
            _ => panic!("invalid descriptor type for device request: {descriptor_type:?}"),
        }
    }
}

/// Copies `data` into the transfer buffer, truncated to the buffer's
/// length. The buffer's length is chosen by the transport from the URB.
fn copy_into(transfer_buffer: &TransferBuffer, data: &[u8]) {
    let mut buffer = transfer_buffer.lock().unwrap();
    let n = data.len().min(buffer.len());
    buffer[..n].copy_from_slice(&data[..n]);
}
