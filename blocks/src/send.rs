//! The send block: moves value out of an account chain.

use crate::error::BlockError;
use serde_json::{json, Value};
use vela_crypto::{blake2b_256_multi, decode_account, encode_account, sign_message};
use vela_types::{Account, Amount, BlockHash, RawKey, Signature};

/// Serialized size: previous(32) + destination(32) + balance(16) +
/// signature(64) + work(8).
pub const SEND_SIZE: usize = 152;

/// Transfers value to `destination`. `balance` is the sender's remaining
/// balance *after* the send; the transferred amount is the difference from
/// the previous balance and is never stated explicitly in the block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendBlock {
    pub previous: BlockHash,
    pub destination: Account,
    pub balance: Amount,
    pub signature: Signature,
    pub work: u64,
}

impl SendBlock {
    /// Build and sign a send block.
    pub fn new(
        previous: BlockHash,
        destination: Account,
        balance: Amount,
        prv: &RawKey,
        public: &Account,
        work: u64,
    ) -> Self {
        let mut block = Self {
            previous,
            destination,
            balance,
            signature: Signature::ZERO,
            work,
        };
        block.signature = sign_message(prv, public, block.hash().as_bytes());
        block
    }

    /// Blake2b-256 over the hashables in declaration order.
    pub fn hash(&self) -> BlockHash {
        BlockHash::new(blake2b_256_multi(&[
            self.previous.as_bytes(),
            self.destination.as_bytes(),
            &self.balance.to_be_bytes(),
        ]))
    }

    pub fn root(&self) -> BlockHash {
        self.previous
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SEND_SIZE);
        out.extend_from_slice(self.previous.as_bytes());
        out.extend_from_slice(self.destination.as_bytes());
        out.extend_from_slice(&self.balance.to_be_bytes());
        out.extend_from_slice(self.signature.as_bytes());
        out.extend_from_slice(&self.work.to_le_bytes());
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, BlockError> {
        if bytes.len() < SEND_SIZE {
            return Err(BlockError::Truncated {
                expected: SEND_SIZE,
                actual: bytes.len(),
            });
        }
        let mut previous = [0u8; 32];
        previous.copy_from_slice(&bytes[0..32]);
        let mut destination = [0u8; 32];
        destination.copy_from_slice(&bytes[32..64]);
        let mut balance = [0u8; 16];
        balance.copy_from_slice(&bytes[64..80]);
        let mut signature = [0u8; 64];
        signature.copy_from_slice(&bytes[80..144]);
        let mut work = [0u8; 8];
        work.copy_from_slice(&bytes[144..152]);
        Ok(Self {
            previous: BlockHash::new(previous),
            destination: Account::new(destination),
            balance: Amount::from_be_bytes(balance),
            signature: Signature::new(signature),
            work: u64::from_le_bytes(work),
        })
    }

    pub fn to_json(&self, prefix: &str) -> Value {
        json!({
            "type": "send",
            "previous": self.previous.encode_hex(),
            "destination": encode_account(prefix, &self.destination),
            "balance": hex::encode_upper(self.balance.to_be_bytes()),
            "signature": self.signature.encode_hex(),
            "work": hex::encode_upper(self.work.to_le_bytes()),
        })
    }

    pub fn from_json(prefix: &str, value: &Value) -> Result<Self, BlockError> {
        Ok(Self {
            previous: json_hash(value, "previous")?,
            destination: json_account(prefix, value, "destination")?,
            balance: json_balance(value)?,
            signature: json_signature(value)?,
            work: json_work(value)?,
        })
    }
}

pub(crate) fn json_str<'a>(value: &'a Value, field: &str) -> Result<&'a str, BlockError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| BlockError::BadJson(format!("missing field '{field}'")))
}

pub(crate) fn json_hash(value: &Value, field: &str) -> Result<BlockHash, BlockError> {
    BlockHash::decode_hex(json_str(value, field)?)
        .map_err(|e| BlockError::BadJson(format!("field '{field}': {e}")))
}

pub(crate) fn json_account(
    prefix: &str,
    value: &Value,
    field: &str,
) -> Result<Account, BlockError> {
    decode_account(prefix, json_str(value, field)?)
        .map_err(|_| BlockError::BadJson(format!("field '{field}': bad address")))
}

pub(crate) fn json_signature(value: &Value) -> Result<Signature, BlockError> {
    Signature::decode_hex(json_str(value, "signature")?)
        .ok_or_else(|| BlockError::BadJson("field 'signature': bad hex".into()))
}

pub(crate) fn json_work(value: &Value) -> Result<u64, BlockError> {
    let s = json_str(value, "work")?;
    if s.len() != 16 {
        return Err(BlockError::BadJson("field 'work': expected 16 hex digits".into()));
    }
    let bytes = hex::decode(s).map_err(|e| BlockError::BadJson(format!("field 'work': {e}")))?;
    let mut arr = [0u8; 8];
    arr.copy_from_slice(&bytes);
    Ok(u64::from_le_bytes(arr))
}

fn json_balance(value: &Value) -> Result<Amount, BlockError> {
    let s = json_str(value, "balance")?;
    if s.len() != 32 {
        return Err(BlockError::BadJson("field 'balance': expected 32 hex digits".into()));
    }
    let bytes = hex::decode(s).map_err(|e| BlockError::BadJson(format!("field 'balance': {e}")))?;
    let mut arr = [0u8; 16];
    arr.copy_from_slice(&bytes);
    Ok(Amount::from_be_bytes(arr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_crypto::KeyPair;

    fn sample() -> SendBlock {
        let kp = KeyPair::from_private(RawKey::new([1u8; 32]));
        SendBlock::new(
            BlockHash::new([2u8; 32]),
            Account::new([3u8; 32]),
            Amount::new(1000),
            &kp.private,
            &kp.public,
            0x0123_4567_89AB_CDEF,
        )
    }

    #[test]
    fn binary_roundtrip() {
        let block = sample();
        let bytes = block.serialize();
        assert_eq!(bytes.len(), SEND_SIZE);
        assert_eq!(SendBlock::deserialize(&bytes).unwrap(), block);
    }

    #[test]
    fn truncated_rejected() {
        let bytes = sample().serialize();
        assert!(matches!(
            SendBlock::deserialize(&bytes[..SEND_SIZE - 1]),
            Err(BlockError::Truncated { .. })
        ));
    }

    #[test]
    fn json_roundtrip() {
        let block = sample();
        let value = block.to_json("vela");
        assert_eq!(SendBlock::from_json("vela", &value).unwrap(), block);
    }

    #[test]
    fn hash_excludes_signature_and_work() {
        let mut a = sample();
        let h = a.hash();
        a.signature = Signature::new([0xFF; 64]);
        a.work = 42;
        assert_eq!(a.hash(), h);
    }

    #[test]
    fn hash_covers_balance() {
        let mut a = sample();
        let h = a.hash();
        a.balance = Amount::new(999);
        assert_ne!(a.hash(), h);
    }

    #[test]
    fn signature_verifies_over_hash() {
        let kp = KeyPair::from_private(RawKey::new([1u8; 32]));
        let block = sample();
        assert!(vela_crypto::verify_message(
            &kp.public,
            block.hash().as_bytes(),
            &block.signature
        ));
    }
}
