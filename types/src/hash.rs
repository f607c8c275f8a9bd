//! The 256-bit block hash type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when parsing a hash from its hex form.
#[derive(Debug, Error)]
pub enum ParseHashError {
    #[error("expected 64 hex characters, got {0}")]
    BadLength(usize),
    #[error("invalid hex: {0}")]
    BadHex(#[from] hex::FromHexError),
}

/// A 32-byte Blake2b block hash.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockHash(pub(crate) [u8; 32]);

impl BlockHash {
    pub const ZERO: Self = Self([0u8; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn encode_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    pub fn decode_hex(s: &str) -> Result<Self, ParseHashError> {
        if s.len() != 64 {
            return Err(ParseHashError::BadLength(s.len()));
        }
        let bytes = hex::decode(s)?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl FromStr for BlockHash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode_hex(s)
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash(")?;
        for b in &self.0[..4] {
            write!(f, "{:02X}", b)?;
        }
        write!(f, "…)")
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let h = BlockHash::new([0xAB; 32]);
        let encoded = h.encode_hex();
        assert_eq!(encoded.len(), 64);
        assert_eq!(BlockHash::decode_hex(&encoded).unwrap(), h);
    }

    #[test]
    fn lowercase_hex_accepted() {
        let h = BlockHash::new([0xCD; 32]);
        let lower = h.encode_hex().to_lowercase();
        assert_eq!(BlockHash::decode_hex(&lower).unwrap(), h);
    }

    #[test]
    fn wrong_length_rejected() {
        assert!(matches!(
            BlockHash::decode_hex("ABCD"),
            Err(ParseHashError::BadLength(4))
        ));
    }

    #[test]
    fn bad_alphabet_rejected() {
        let s = "ZZ".repeat(32);
        assert!(matches!(
            BlockHash::decode_hex(&s),
            Err(ParseHashError::BadHex(_))
        ));
    }

    #[test]
    fn zero_detection() {
        assert!(BlockHash::ZERO.is_zero());
        assert!(!BlockHash::new([1; 32]).is_zero());
    }
}
