//! U2F (CTAP1) application layer for a software FIDO/U2F security key.
//!
//! Implements the legacy FIDO U2F Raw Message Format: REGISTER,
//! AUTHENTICATE, and VERSION over ISO 7816-style extended-length APDUs.
//! Credentials are stateless: the private key and application id are sealed
//! into the key handle returned to the relying party, and recovered purely
//! by opening the handle on the way back in.

mod app_id;
mod client;
pub mod constants;
mod key_handle;
mod private_key;
mod request;
mod response;
mod server;

pub use app_id::AppId;
pub use client::{SoftwareClient, UserPresence};
pub use key_handle::{open_key_handle, seal_key_handle, KeyHandle, OpenKeyHandleError};
pub use private_key::PrivateKey;
pub use request::{Apdu, ApduDecodeError, MessageHeader};
pub use response::{Response, StatusCode};
pub use server::U2fServer;

/// Authentication counter value. Allocated by the client port per
/// assertion; the application treats it as an opaque monotone clock.
pub type Counter = u32;

/// Capabilities the application consumes from its surroundings: user
/// approval, key generation, attestation-certificate issuance, the sealing
/// key, and the signature counter.
pub trait FidoClient: Send + Sync {
    /// Symmetric key under which key handles are sealed. Stable for the
    /// device's lifetime; handles issued under a different key will not
    /// open.
    fn sealing_key(&self) -> [u8; 32];

    /// Generates a fresh EC P-256 keypair for a new credential.
    fn new_private_key(&self) -> PrivateKey;

    /// Issues an X.509 attestation certificate (DER) against `private_key`.
    fn create_attestation_certificate(&self, private_key: &PrivateKey) -> Vec<u8>;

    /// May block for as long as the user takes to decide.
    fn approve_registration(&self, key_handle: &KeyHandle) -> bool;

    /// May block for as long as the user takes to decide.
    fn approve_authentication(&self, key_handle: &KeyHandle) -> bool;

    /// Next value of the authentication counter. Monotonically
    /// non-decreasing and linearizable across concurrent assertions.
    fn next_counter_id(&self) -> Counter;
}
