//! Secret key and signature types.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::ZeroizeOnDrop;

/// A 32-byte Ed25519 secret key.
///
/// Does not implement `Debug`, `Display`, or `Serialize`; the bytes are wiped
/// on drop.
#[derive(Clone, PartialEq, Eq, ZeroizeOnDrop)]
pub struct RawKey(pub(crate) [u8; 32]);

impl RawKey {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn decode_hex(s: &str) -> Option<Self> {
        if s.len() != 64 {
            return None;
        }
        let bytes = hex::decode(s).ok()?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Some(Self(out))
    }
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub(crate) [u8; 64]);

impl Signature {
    pub const ZERO: Self = Self([0u8; 64]);

    pub const fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 64]
    }

    pub fn encode_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    pub fn decode_hex(s: &str) -> Option<Self> {
        if s.len() != 128 {
            return None;
        }
        let bytes = hex::decode(s).ok()?;
        let mut out = [0u8; 64];
        out.copy_from_slice(&bytes);
        Some(Self(out))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature(")?;
        for b in &self.0[..4] {
            write!(f, "{:02X}", b)?;
        }
        write!(f, "…)")
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes: Vec<u8> = Deserialize::deserialize(deserializer)?;
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected exactly 64 bytes for Signature"))?;
        Ok(Signature(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_hex_roundtrip() {
        let s = Signature::new([0x7E; 64]);
        assert_eq!(Signature::decode_hex(&s.encode_hex()).unwrap(), s);
    }

    #[test]
    fn signature_zero() {
        assert!(Signature::ZERO.is_zero());
        assert!(!Signature::new([1; 64]).is_zero());
    }

    #[test]
    fn raw_key_hex() {
        let k = RawKey::decode_hex(&"ab".repeat(32)).unwrap();
        assert_eq!(k.as_bytes()[0], 0xAB);
        assert!(RawKey::decode_hex("short").is_none());
    }
}
