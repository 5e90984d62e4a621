use std::fmt::{self, Debug};

use openssl::bn::BigNumContext;
use openssl::ec::{EcGroup, EcKey, PointConversionForm};
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::sign::Signer;

/// An EC P-256 private key backing one credential.
pub struct PrivateKey(pub(crate) EcKey<Private>);

impl PrivateKey {
    pub fn generate() -> PrivateKey {
        let group = p256_group();
        PrivateKey(EcKey::generate(&group).unwrap())
    }

    /// Parses a SEC1 `ECPrivateKey` DER structure.
    pub fn from_sec1_der(der: &[u8]) -> Result<PrivateKey, ErrorStack> {
        Ok(PrivateKey(EcKey::private_key_from_der(der)?))
    }

    /// SEC1 `ECPrivateKey` DER encoding.
    pub fn to_sec1_der(&self) -> Vec<u8> {
        self.0.private_key_to_der().unwrap()
    }

    /// Raw ANSI X9.62 uncompressed curve point, `0x04 ‖ X ‖ Y`, 65 bytes.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        let group = p256_group();
        let mut ctx = BigNumContext::new().unwrap();
        self.0
            .public_key()
            .to_bytes(&group, PointConversionForm::UNCOMPRESSED, &mut ctx)
            .unwrap()
    }

    /// ECDSA signature over SHA-256 of `data`, DER encoded.
    pub fn sign_sha256(&self, data: &[u8]) -> Vec<u8> {
        let pkey = PKey::from_ec_key(self.0.to_owned()).unwrap();
        let mut signer = Signer::new(MessageDigest::sha256(), &pkey).unwrap();
        signer.update(data).unwrap();
        signer.sign_to_vec().unwrap()
    }
}

impl Clone for PrivateKey {
    fn clone(&self) -> PrivateKey {
        PrivateKey(self.0.to_owned())
    }
}

impl Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PrivateKey")
    }
}

pub(crate) fn p256_group() -> EcGroup {
    EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap()
}

#[cfg(test)]
mod tests {
    use openssl::ec::EcPoint;
    use openssl::sign::Verifier;

    use super::*;

    #[test]
    fn public_key_is_a_65_byte_uncompressed_point() {
        let key = PrivateKey::generate();

        let bytes = key.public_key_bytes();

        assert_eq!(bytes.len(), 65);
        assert_eq!(bytes[0], 0x04);
    }

    #[test]
    fn sec1_der_round_trips() {
        let key = PrivateKey::generate();

        let recovered = PrivateKey::from_sec1_der(&key.to_sec1_der()).unwrap();

        assert_eq!(recovered.public_key_bytes(), key.public_key_bytes());
    }

    #[test]
    fn signatures_verify_under_the_public_key() {
        let key = PrivateKey::generate();
        let data = b"some signed payload";

        let signature = key.sign_sha256(data);

        let group = p256_group();
        let mut ctx = BigNumContext::new().unwrap();
        let point = EcPoint::from_bytes(&group, &key.public_key_bytes(), &mut ctx).unwrap();
        let public = PKey::from_ec_key(EcKey::from_public_key(&group, &point).unwrap()).unwrap();
        let mut verifier = Verifier::new(MessageDigest::sha256(), &public).unwrap();
        verifier.update(data).unwrap();
        assert!(verifier.verify(&signature).unwrap());
    }

    #[test]
    fn garbage_der_is_rejected() {
        assert!(PrivateKey::from_sec1_der(&[0x30, 0x03, 0x02, 0x01, 0x01]).is_err());
    }
}
