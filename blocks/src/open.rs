//! The open block: the first block of an account chain.

use crate::error::BlockError;
use crate::send::{json_account, json_hash, json_signature, json_work};
use serde_json::{json, Value};
use vela_crypto::{blake2b_256_multi, encode_account, sign_message};
use vela_types::{Account, BlockHash, RawKey, Signature};

/// Serialized size: source(32) + representative(32) + account(32) +
/// signature(64) + work(8).
pub const OPEN_SIZE: usize = 168;

/// Opens `account`'s chain by claiming the send identified by `source` and
/// nominating `representative`. Its root is the account itself, since there
/// is no previous block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenBlock {
    pub source: BlockHash,
    pub representative: Account,
    pub account: Account,
    pub signature: Signature,
    pub work: u64,
}

impl OpenBlock {
    /// Build and sign an open block. The signer must be `account` itself.
    pub fn new(
        source: BlockHash,
        representative: Account,
        account: Account,
        prv: &RawKey,
        public: &Account,
        work: u64,
    ) -> Self {
        let mut block = Self {
            source,
            representative,
            account,
            signature: Signature::ZERO,
            work,
        };
        block.signature = sign_message(prv, public, block.hash().as_bytes());
        block
    }

    pub fn hash(&self) -> BlockHash {
        BlockHash::new(blake2b_256_multi(&[
            self.source.as_bytes(),
            self.representative.as_bytes(),
            self.account.as_bytes(),
        ]))
    }

    /// An open block has no previous; its fork root is the account key.
    pub fn root(&self) -> BlockHash {
        BlockHash::new(*self.account.as_bytes())
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(OPEN_SIZE);
        out.extend_from_slice(self.source.as_bytes());
        out.extend_from_slice(self.representative.as_bytes());
        out.extend_from_slice(self.account.as_bytes());
        out.extend_from_slice(self.signature.as_bytes());
        out.extend_from_slice(&self.work.to_le_bytes());
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, BlockError> {
        if bytes.len() < OPEN_SIZE {
            return Err(BlockError::Truncated {
                expected: OPEN_SIZE,
                actual: bytes.len(),
            });
        }
        let mut source = [0u8; 32];
        source.copy_from_slice(&bytes[0..32]);
        let mut representative = [0u8; 32];
        representative.copy_from_slice(&bytes[32..64]);
        let mut account = [0u8; 32];
        account.copy_from_slice(&bytes[64..96]);
        let mut signature = [0u8; 64];
        signature.copy_from_slice(&bytes[96..160]);
        let mut work = [0u8; 8];
        work.copy_from_slice(&bytes[160..168]);
        Ok(Self {
            source: BlockHash::new(source),
            representative: Account::new(representative),
            account: Account::new(account),
            signature: Signature::new(signature),
            work: u64::from_le_bytes(work),
        })
    }

    pub fn to_json(&self, prefix: &str) -> Value {
        json!({
            "type": "open",
            "source": self.source.encode_hex(),
            "representative": encode_account(prefix, &self.representative),
            "account": encode_account(prefix, &self.account),
            "signature": self.signature.encode_hex(),
            "work": hex::encode_upper(self.work.to_le_bytes()),
        })
    }

    pub fn from_json(prefix: &str, value: &Value) -> Result<Self, BlockError> {
        Ok(Self {
            source: json_hash(value, "source")?,
            representative: json_account(prefix, value, "representative")?,
            account: json_account(prefix, value, "account")?,
            signature: json_signature(value)?,
            work: json_work(value)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_crypto::KeyPair;

    fn sample() -> OpenBlock {
        let kp = KeyPair::from_private(RawKey::new([8u8; 32]));
        OpenBlock::new(
            BlockHash::new([1u8; 32]),
            kp.public,
            kp.public,
            &kp.private,
            &kp.public,
            11,
        )
    }

    #[test]
    fn binary_roundtrip() {
        let block = sample();
        let bytes = block.serialize();
        assert_eq!(bytes.len(), OPEN_SIZE);
        assert_eq!(OpenBlock::deserialize(&bytes).unwrap(), block);
    }

    #[test]
    fn json_roundtrip() {
        let block = sample();
        assert_eq!(
            OpenBlock::from_json("vela", &block.to_json("vela")).unwrap(),
            block
        );
    }

    #[test]
    fn root_is_account() {
        let block = sample();
        assert_eq!(block.root().as_bytes(), block.account.as_bytes());
    }
}
