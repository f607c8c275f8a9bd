//! The receive block: claims a pending send on this chain.

use crate::error::BlockError;
use crate::send::{json_hash, json_signature, json_work};
use serde_json::{json, Value};
use vela_crypto::{blake2b_256_multi, sign_message};
use vela_types::{Account, BlockHash, RawKey, Signature};

/// Serialized size: previous(32) + source(32) + signature(64) + work(8).
pub const RECEIVE_SIZE: usize = 136;

/// Claims the pending send identified by `source`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiveBlock {
    pub previous: BlockHash,
    pub source: BlockHash,
    pub signature: Signature,
    pub work: u64,
}

impl ReceiveBlock {
    /// Build and sign a receive block.
    pub fn new(
        previous: BlockHash,
        source: BlockHash,
        prv: &RawKey,
        public: &Account,
        work: u64,
    ) -> Self {
        let mut block = Self {
            previous,
            source,
            signature: Signature::ZERO,
            work,
        };
        block.signature = sign_message(prv, public, block.hash().as_bytes());
        block
    }

    pub fn hash(&self) -> BlockHash {
        BlockHash::new(blake2b_256_multi(&[
            self.previous.as_bytes(),
            self.source.as_bytes(),
        ]))
    }

    pub fn root(&self) -> BlockHash {
        self.previous
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(RECEIVE_SIZE);
        out.extend_from_slice(self.previous.as_bytes());
        out.extend_from_slice(self.source.as_bytes());
        out.extend_from_slice(self.signature.as_bytes());
        out.extend_from_slice(&self.work.to_le_bytes());
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, BlockError> {
        if bytes.len() < RECEIVE_SIZE {
            return Err(BlockError::Truncated {
                expected: RECEIVE_SIZE,
                actual: bytes.len(),
            });
        }
        let mut previous = [0u8; 32];
        previous.copy_from_slice(&bytes[0..32]);
        let mut source = [0u8; 32];
        source.copy_from_slice(&bytes[32..64]);
        let mut signature = [0u8; 64];
        signature.copy_from_slice(&bytes[64..128]);
        let mut work = [0u8; 8];
        work.copy_from_slice(&bytes[128..136]);
        Ok(Self {
            previous: BlockHash::new(previous),
            source: BlockHash::new(source),
            signature: Signature::new(signature),
            work: u64::from_le_bytes(work),
        })
    }

    pub fn to_json(&self, _prefix: &str) -> Value {
        json!({
            "type": "receive",
            "previous": self.previous.encode_hex(),
            "source": self.source.encode_hex(),
            "signature": self.signature.encode_hex(),
            "work": hex::encode_upper(self.work.to_le_bytes()),
        })
    }

    pub fn from_json(_prefix: &str, value: &Value) -> Result<Self, BlockError> {
        Ok(Self {
            previous: json_hash(value, "previous")?,
            source: json_hash(value, "source")?,
            signature: json_signature(value)?,
            work: json_work(value)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_crypto::KeyPair;

    fn sample() -> ReceiveBlock {
        let kp = KeyPair::from_private(RawKey::new([4u8; 32]));
        ReceiveBlock::new(
            BlockHash::new([5u8; 32]),
            BlockHash::new([6u8; 32]),
            &kp.private,
            &kp.public,
            7,
        )
    }

    #[test]
    fn binary_roundtrip() {
        let block = sample();
        let bytes = block.serialize();
        assert_eq!(bytes.len(), RECEIVE_SIZE);
        assert_eq!(ReceiveBlock::deserialize(&bytes).unwrap(), block);
    }

    #[test]
    fn json_roundtrip() {
        let block = sample();
        assert_eq!(
            ReceiveBlock::from_json("vela", &block.to_json("vela")).unwrap(),
            block
        );
    }

    #[test]
    fn hash_covers_source() {
        let mut a = sample();
        let h = a.hash();
        a.source = BlockHash::new([9u8; 32]);
        assert_ne!(a.hash(), h);
    }
}
