use byteorder::{BigEndian, WriteBytesExt};
use tracing::{debug, trace, warn};

use crate::app_id::AppId;
use crate::constants::*;
use crate::key_handle::{open_key_handle, seal_key_handle, KeyHandle};
use crate::private_key::PrivateKey;
use crate::request::Apdu;
use crate::response::Response;
use crate::FidoClient;

/// The U2F application. Consumes raw messages handed up by the HID layer
/// and produces raw responses, always terminated by a big-endian status
/// word.
pub struct U2fServer<C> {
    client: C,
}

impl<C: FidoClient> U2fServer<C> {
    pub fn new(client: C) -> U2fServer<C> {
        U2fServer { client }
    }

    pub fn handle_message(&self, message: &[u8]) -> Vec<u8> {
        let apdu = match Apdu::decode(message) {
            Ok(apdu) => apdu,
            Err(err) => {
                warn!(%err, "rejecting malformed message");
                return Response::InvalidKeyHandle.into_bytes();
            }
        };
        trace!(
            header = ?apdu.header,
            request_len = apdu.request.len(),
            response_length = apdu.response_length,
            "u2f message"
        );
        let response = match apdu.header.ins {
            VERSION_COMMAND_CODE => Response::Version {
                version_string: String::from("U2F_V2"),
            },
            REGISTER_COMMAND_CODE => self.register(&apdu.request),
            AUTHENTICATE_COMMAND_CODE => self.authenticate(apdu.header.p1, &apdu.request),
            ins => panic!("invalid U2F command: {ins:#04x}"),
        };
        response.into_bytes()
    }

    fn register(&self, request: &[u8]) -> Response {
        // challenge parameter [32 bytes] ‖ application parameter [32 bytes]
        if request.len() != 64 {
            debug!(len = request.len(), "bad registration request length");
            return Response::InvalidKeyHandle;
        }
        let challenge = &request[..32];
        let application = AppId::from_bytes(&request[32..]);

        let private_key = self.client.new_private_key();
        let user_public_key = private_key.public_key_bytes();
        let key_handle = KeyHandle {
            private_key: private_key.to_sec1_der(),
            application_id: application,
        };
        let sealed_handle = seal_key_handle(&self.client.sealing_key(), &key_handle);
        debug_assert!(sealed_handle.len() <= MAX_KEY_HANDLE_LEN);

        if !self.client.approve_registration(&key_handle) {
            debug!("registration denied");
            return Response::TestOfUserPresenceNotSatisfied;
        }

        let attestation_certificate = self.client.create_attestation_certificate(&private_key);

        let mut signature_data =
            Vec::with_capacity(65 + sealed_handle.len() + user_public_key.len());
        signature_data.push(0x00); // reserved
        signature_data.extend_from_slice(application.as_ref());
        signature_data.extend_from_slice(challenge);
        signature_data.extend_from_slice(&sealed_handle);
        signature_data.extend_from_slice(&user_public_key);
        let signature = private_key.sign_sha256(&signature_data);

        Response::Registration {
            user_public_key,
            key_handle: sealed_handle,
            attestation_certificate,
            signature,
        }
    }

    fn authenticate(&self, control: u8, request: &[u8]) -> Response {
        // challenge [32] ‖ application [32] ‖ handle length [1] ‖ handle
        if request.len() < 65 {
            debug!(len = request.len(), "bad authentication request length");
            return Response::InvalidKeyHandle;
        }
        let challenge = &request[..32];
        let application = AppId::from_bytes(&request[32..64]);
        let handle_length = request[64] as usize;
        if request.len() < 65 + handle_length {
            return Response::InvalidKeyHandle;
        }
        let handle_bytes = &request[65..65 + handle_length];

        let key_handle = match open_key_handle(&self.client.sealing_key(), handle_bytes) {
            Ok(key_handle) => key_handle,
            Err(err) => {
                debug!(%err, "could not open key handle");
                return Response::InvalidKeyHandle;
            }
        };
        if key_handle.private_key.is_empty()
            || !key_handle.application_id.eq_consttime(&application)
        {
            debug!("key handle does not match the application");
            return Response::InvalidKeyHandle;
        }

        match control {
            AUTH_CHECK_ONLY => {
                // The handle is valid for this application, but a check-only
                // request never produces a signature.
                Response::TestOfUserPresenceNotSatisfied
            }
            AUTH_ENFORCE_USER_PRESENCE_AND_SIGN | AUTH_DONT_ENFORCE_USER_PRESENCE_AND_SIGN => {
                if control == AUTH_ENFORCE_USER_PRESENCE_AND_SIGN
                    && !self.client.approve_authentication(&key_handle)
                {
                    debug!("authentication denied");
                    return Response::TestOfUserPresenceNotSatisfied;
                }

                let private_key = PrivateKey::from_sec1_der(&key_handle.private_key)
                    .expect("could not decode private key");
                let counter = self.client.next_counter_id();
                let mut signature_data = Vec::with_capacity(32 + 1 + 4 + 32);
                signature_data.extend_from_slice(application.as_ref());
                signature_data.push(0x01); // user presence
                signature_data.write_u32::<BigEndian>(counter).unwrap();
                signature_data.extend_from_slice(challenge);
                let signature = private_key.sign_sha256(&signature_data);

                Response::Authentication { counter, signature }
            }
            control => {
                // No status word is specific to a bad control byte; report
                // it as a length error like hardware keys do.
                debug!(control, "unknown authentication control byte");
                Response::WrongLength
            }
        }
    }
}
