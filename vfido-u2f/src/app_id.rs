use minicbor::{Decode, Encode};
use subtle::ConstantTimeEq;

/// The 32-byte application parameter a relying party registers and
/// authenticates under.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct AppId([u8; 32]);

impl AppId {
    pub fn from_bytes(slice: &[u8]) -> AppId {
        assert_eq!(slice.len(), 32);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);
        AppId(bytes)
    }

    pub fn eq_consttime(&self, other: &AppId) -> bool {
        self.0.ct_eq(&other.0).unwrap_u8() == 1
    }
}

impl AsRef<[u8]> for AppId {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<C> Encode<C> for AppId {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.bytes(&self.0)?.ok()
    }
}

impl<'b, C> Decode<'b, C> for AppId {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        let bytes: minicbor::bytes::ByteArray<32> = Decode::decode(d, ctx)?;
        Ok(AppId(bytes.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compares_in_constant_time() {
        let a = AppId::from_bytes(&[0x17; 32]);
        let b = AppId::from_bytes(&[0x17; 32]);
        let mut other = [0x17; 32];
        other[31] = 0x18;
        let c = AppId::from_bytes(&other);

        assert!(a.eq_consttime(&b));
        assert!(!a.eq_consttime(&c));
    }

    #[test]
    fn round_trips_through_cbor() {
        let id = AppId::from_bytes(&[0x42; 32]);

        let bytes = minicbor::to_vec(id).unwrap();
        let decoded: AppId = minicbor::decode(&bytes).unwrap();

        assert_eq!(decoded, id);
    }
}
