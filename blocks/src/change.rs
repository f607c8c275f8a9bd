//! The change block: rotates the representative without moving value.

use crate::error::BlockError;
use crate::send::{json_account, json_hash, json_signature, json_work};
use serde_json::{json, Value};
use vela_crypto::{blake2b_256_multi, encode_account, sign_message};
use vela_types::{Account, BlockHash, RawKey, Signature};

/// Serialized size: previous(32) + representative(32) + signature(64) +
/// work(8).
pub const CHANGE_SIZE: usize = 136;

/// Nominates a new consensus representative for the chain's balance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeBlock {
    pub previous: BlockHash,
    pub representative: Account,
    pub signature: Signature,
    pub work: u64,
}

impl ChangeBlock {
    /// Build and sign a change block.
    pub fn new(
        previous: BlockHash,
        representative: Account,
        prv: &RawKey,
        public: &Account,
        work: u64,
    ) -> Self {
        let mut block = Self {
            previous,
            representative,
            signature: Signature::ZERO,
            work,
        };
        block.signature = sign_message(prv, public, block.hash().as_bytes());
        block
    }

    pub fn hash(&self) -> BlockHash {
        BlockHash::new(blake2b_256_multi(&[
            self.previous.as_bytes(),
            self.representative.as_bytes(),
        ]))
    }

    pub fn root(&self) -> BlockHash {
        self.previous
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(CHANGE_SIZE);
        out.extend_from_slice(self.previous.as_bytes());
        out.extend_from_slice(self.representative.as_bytes());
        out.extend_from_slice(self.signature.as_bytes());
        out.extend_from_slice(&self.work.to_le_bytes());
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, BlockError> {
        if bytes.len() < CHANGE_SIZE {
            return Err(BlockError::Truncated {
                expected: CHANGE_SIZE,
                actual: bytes.len(),
            });
        }
        let mut previous = [0u8; 32];
        previous.copy_from_slice(&bytes[0..32]);
        let mut representative = [0u8; 32];
        representative.copy_from_slice(&bytes[32..64]);
        let mut signature = [0u8; 64];
        signature.copy_from_slice(&bytes[64..128]);
        let mut work = [0u8; 8];
        work.copy_from_slice(&bytes[128..136]);
        Ok(Self {
            previous: BlockHash::new(previous),
            representative: Account::new(representative),
            signature: Signature::new(signature),
            work: u64::from_le_bytes(work),
        })
    }

    pub fn to_json(&self, prefix: &str) -> Value {
        json!({
            "type": "change",
            "previous": self.previous.encode_hex(),
            "representative": encode_account(prefix, &self.representative),
            "signature": self.signature.encode_hex(),
            "work": hex::encode_upper(self.work.to_le_bytes()),
        })
    }

    pub fn from_json(prefix: &str, value: &Value) -> Result<Self, BlockError> {
        Ok(Self {
            previous: json_hash(value, "previous")?,
            representative: json_account(prefix, value, "representative")?,
            signature: json_signature(value)?,
            work: json_work(value)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_crypto::KeyPair;

    fn sample() -> ChangeBlock {
        let kp = KeyPair::from_private(RawKey::new([12u8; 32]));
        ChangeBlock::new(
            BlockHash::new([13u8; 32]),
            Account::new([14u8; 32]),
            &kp.private,
            &kp.public,
            21,
        )
    }

    #[test]
    fn binary_roundtrip() {
        let block = sample();
        let bytes = block.serialize();
        assert_eq!(bytes.len(), CHANGE_SIZE);
        assert_eq!(ChangeBlock::deserialize(&bytes).unwrap(), block);
    }

    #[test]
    fn json_roundtrip() {
        let block = sample();
        assert_eq!(
            ChangeBlock::from_json("vela", &block.to_json("vela")).unwrap(),
            block
        );
    }
}
