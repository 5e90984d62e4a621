use std::sync::atomic::{AtomicU32, Ordering};

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::ec::EcKey;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::x509::{X509Builder, X509Name, X509NameBuilder};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::key_handle::KeyHandle;
use crate::private_key::{p256_group, PrivateKey};
use crate::{Counter, FidoClient};

const CA_COMMON_NAME: &str = "Virtual FIDO CA";
const CREDENTIAL_COMMON_NAME: &str = "Virtual FIDO";
const CERTIFICATE_DAYS: u32 = 3650;

/// Blocking user-approval seam. Implementations typically prompt a real
/// user; the transfer that carried the request waits on the answer.
pub trait UserPresence: Send + Sync {
    fn approve_registration(&self, key_handle: &KeyHandle) -> bool;
    fn approve_authentication(&self, key_handle: &KeyHandle) -> bool;
}

/// A self-contained client port: random device-lifetime sealing key, an
/// embedded attestation CA issuing per-credential certificates, and an
/// atomic signature counter.
pub struct SoftwareClient<U> {
    user_presence: U,
    sealing_key: [u8; 32],
    certificate_authority: CertificateAuthority,
    counter: AtomicU32,
}

impl<U: UserPresence> SoftwareClient<U> {
    pub fn new(user_presence: U) -> SoftwareClient<U> {
        let mut sealing_key = [0u8; 32];
        OsRng.fill_bytes(&mut sealing_key);
        SoftwareClient {
            user_presence,
            sealing_key,
            certificate_authority: CertificateAuthority::generate(),
            counter: AtomicU32::new(0),
        }
    }

    /// Restores the counter of a previously saved device so assertions
    /// continue from `value` instead of repeating old ones.
    pub fn set_counter(&self, value: Counter) {
        self.counter.store(value, Ordering::SeqCst);
    }
}

impl<U: UserPresence> FidoClient for SoftwareClient<U> {
    fn sealing_key(&self) -> [u8; 32] {
        self.sealing_key
    }

    fn new_private_key(&self) -> PrivateKey {
        PrivateKey::generate()
    }

    fn create_attestation_certificate(&self, private_key: &PrivateKey) -> Vec<u8> {
        self.certificate_authority.issue(private_key)
    }

    fn approve_registration(&self, key_handle: &KeyHandle) -> bool {
        self.user_presence.approve_registration(key_handle)
    }

    fn approve_authentication(&self, key_handle: &KeyHandle) -> bool {
        self.user_presence.approve_authentication(key_handle)
    }

    fn next_counter_id(&self) -> Counter {
        self.counter.fetch_add(1, Ordering::SeqCst)
    }
}

/// Batch attestation authority embedded in the device.
struct CertificateAuthority {
    key: PKey<Private>,
    name: X509Name,
}

impl CertificateAuthority {
    fn generate() -> CertificateAuthority {
        let key = PKey::from_ec_key(EcKey::generate(&p256_group()).unwrap()).unwrap();
        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_nid(Nid::COMMONNAME, CA_COMMON_NAME)
            .unwrap();
        CertificateAuthority {
            key,
            name: name.build(),
        }
    }

    /// Issues an attestation certificate for `subject_key`, DER encoded.
    fn issue(&self, subject_key: &PrivateKey) -> Vec<u8> {
        let subject_pkey = PKey::from_ec_key(subject_key.0.to_owned()).unwrap();

        let mut subject = X509NameBuilder::new().unwrap();
        subject
            .append_entry_by_nid(Nid::COMMONNAME, CREDENTIAL_COMMON_NAME)
            .unwrap();

        let mut builder = X509Builder::new().unwrap();
        builder.set_version(2).unwrap();
        let serial = BigNum::from_u32(OsRng.next_u32()).unwrap();
        builder
            .set_serial_number(&serial.to_asn1_integer().unwrap())
            .unwrap();
        builder.set_subject_name(&subject.build()).unwrap();
        builder.set_issuer_name(&self.name).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(CERTIFICATE_DAYS).unwrap())
            .unwrap();
        builder.set_pubkey(&subject_pkey).unwrap();
        builder.sign(&self.key, MessageDigest::sha256()).unwrap();
        builder.build().to_der().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use openssl::x509::X509;

    use super::*;

    struct ApproveEverything;

    impl UserPresence for ApproveEverything {
        fn approve_registration(&self, _key_handle: &KeyHandle) -> bool {
            true
        }
        fn approve_authentication(&self, _key_handle: &KeyHandle) -> bool {
            true
        }
    }

    #[test]
    fn counters_are_strictly_increasing() {
        let client = SoftwareClient::new(ApproveEverything);

        let mut previous = client.next_counter_id();
        for _ in 0..10 {
            let next = client.next_counter_id();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn set_counter_restores_a_saved_value() {
        let client = SoftwareClient::new(ApproveEverything);

        client.set_counter(0x10);

        assert_eq!(client.next_counter_id(), 0x10);
        assert_eq!(client.next_counter_id(), 0x11);
    }

    #[test]
    fn the_sealing_key_is_stable() {
        let client = SoftwareClient::new(ApproveEverything);

        assert_eq!(client.sealing_key(), client.sealing_key());
    }

    #[test]
    fn issued_certificates_carry_the_credential_key() {
        let client = SoftwareClient::new(ApproveEverything);
        let private_key = client.new_private_key();

        let der = client.create_attestation_certificate(&private_key);

        let certificate = X509::from_der(&der).unwrap();
        let credential_pkey = PKey::from_ec_key(private_key.0.to_owned()).unwrap();
        assert!(certificate
            .public_key()
            .unwrap()
            .public_eq(&credential_pkey));
    }
}
