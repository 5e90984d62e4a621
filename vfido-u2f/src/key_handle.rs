use std::fmt::{self, Debug};

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::Aes256Gcm;
use minicbor::{Decode, Encode};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

use crate::app_id::AppId;

const NONCE_LEN: usize = 12;

/// Credential material encoded into the opaque handle a relying party
/// holds. The authenticator keeps no record of issued handles; the private
/// key is recovered purely by opening the handle presented back to it.
#[derive(Clone, Eq, PartialEq, Encode, Decode)]
#[cbor(map)]
pub struct KeyHandle {
    /// SEC1 `ECPrivateKey` DER bytes.
    #[cbor(n(1), with = "minicbor::bytes")]
    pub private_key: Vec<u8>,
    #[n(2)]
    pub application_id: AppId,
}

impl Debug for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "KeyHandle")
    }
}

/// Authenticated-encryption envelope around the CBOR-encoded handle.
#[derive(Encode, Decode)]
#[cbor(map)]
struct SealedBox {
    /// AES-256-GCM ciphertext with the 16-byte tag appended.
    #[cbor(n(1), with = "minicbor::bytes")]
    ciphertext: Vec<u8>,
    #[cbor(n(2), with = "minicbor::bytes")]
    nonce: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum OpenKeyHandleError {
    #[error("key handle is not valid CBOR: {0}")]
    Cbor(#[from] minicbor::decode::Error),

    #[error("key handle failed authentication")]
    Decrypt,
}

/// Seals `key_handle` under `sealing_key` with a fresh random nonce and
/// returns the wire encoding presented to relying parties.
pub fn seal_key_handle(sealing_key: &[u8; 32], key_handle: &KeyHandle) -> Vec<u8> {
    let plaintext = minicbor::to_vec(key_handle).unwrap();
    let cipher = Aes256Gcm::new_from_slice(sealing_key).unwrap();
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt(&GenericArray::clone_from_slice(&nonce), plaintext.as_slice())
        .unwrap();
    let sealed = SealedBox {
        ciphertext,
        nonce: nonce.to_vec(),
    };
    minicbor::to_vec(sealed).unwrap()
}

/// Opens a handle previously produced by [`seal_key_handle`]. Fails on
/// anything that is not an authentic envelope under `sealing_key`.
pub fn open_key_handle(
    sealing_key: &[u8; 32],
    sealed_bytes: &[u8],
) -> Result<KeyHandle, OpenKeyHandleError> {
    let sealed: SealedBox = minicbor::decode(sealed_bytes)?;
    if sealed.nonce.len() != NONCE_LEN {
        return Err(OpenKeyHandleError::Decrypt);
    }
    let cipher = Aes256Gcm::new_from_slice(sealing_key).unwrap();
    let plaintext = cipher
        .decrypt(
            &GenericArray::clone_from_slice(&sealed.nonce),
            sealed.ciphertext.as_slice(),
        )
        .map_err(|_| OpenKeyHandleError::Decrypt)?;
    Ok(minicbor::decode(&plaintext)?)
}
