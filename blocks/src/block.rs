//! The block sum type and its tag dispatch.

use crate::change::{ChangeBlock, CHANGE_SIZE};
use crate::error::BlockError;
use crate::open::{OpenBlock, OPEN_SIZE};
use crate::receive::{ReceiveBlock, RECEIVE_SIZE};
use crate::send::{SendBlock, SEND_SIZE};
use serde_json::Value;
use vela_types::{Account, Amount, BlockHash, Signature};

/// Block type tags as they appear on the wire and in bulk streams.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlockType {
    Invalid = 0,
    /// Stream terminator; never a stored block.
    NotABlock = 1,
    Send = 2,
    Receive = 3,
    Open = 4,
    Change = 5,
}

impl BlockType {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Invalid),
            1 => Some(Self::NotABlock),
            2 => Some(Self::Send),
            3 => Some(Self::Receive),
            4 => Some(Self::Open),
            5 => Some(Self::Change),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Serialized payload size for this variant, if it is a real block.
    pub fn size(&self) -> Option<usize> {
        match self {
            Self::Send => Some(SEND_SIZE),
            Self::Receive => Some(RECEIVE_SIZE),
            Self::Open => Some(OPEN_SIZE),
            Self::Change => Some(CHANGE_SIZE),
            Self::Invalid | Self::NotABlock => None,
        }
    }
}

/// One of the four ledger block variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    Send(SendBlock),
    Receive(ReceiveBlock),
    Open(OpenBlock),
    Change(ChangeBlock),
}

impl Block {
    pub fn block_type(&self) -> BlockType {
        match self {
            Self::Send(_) => BlockType::Send,
            Self::Receive(_) => BlockType::Receive,
            Self::Open(_) => BlockType::Open,
            Self::Change(_) => BlockType::Change,
        }
    }

    pub fn hash(&self) -> BlockHash {
        match self {
            Self::Send(b) => b.hash(),
            Self::Receive(b) => b.hash(),
            Self::Open(b) => b.hash(),
            Self::Change(b) => b.hash(),
        }
    }

    /// The fork root: the previous hash, or the account key for opens.
    pub fn root(&self) -> BlockHash {
        match self {
            Self::Send(b) => b.root(),
            Self::Receive(b) => b.root(),
            Self::Open(b) => b.root(),
            Self::Change(b) => b.root(),
        }
    }

    /// The previous block on this chain; zero for opens.
    pub fn previous(&self) -> BlockHash {
        match self {
            Self::Send(b) => b.previous,
            Self::Receive(b) => b.previous,
            Self::Open(_) => BlockHash::ZERO,
            Self::Change(b) => b.previous,
        }
    }

    /// The referenced send, for variants that claim one.
    pub fn source(&self) -> Option<BlockHash> {
        match self {
            Self::Receive(b) => Some(b.source),
            Self::Open(b) => Some(b.source),
            Self::Send(_) | Self::Change(_) => None,
        }
    }

    /// The nominated representative, for variants that carry one.
    pub fn representative(&self) -> Option<Account> {
        match self {
            Self::Open(b) => Some(b.representative),
            Self::Change(b) => Some(b.representative),
            Self::Send(_) | Self::Receive(_) => None,
        }
    }

    pub fn destination(&self) -> Option<Account> {
        match self {
            Self::Send(b) => Some(b.destination),
            _ => None,
        }
    }

    pub fn balance(&self) -> Option<Amount> {
        match self {
            Self::Send(b) => Some(b.balance),
            _ => None,
        }
    }

    pub fn signature(&self) -> Signature {
        match self {
            Self::Send(b) => b.signature,
            Self::Receive(b) => b.signature,
            Self::Open(b) => b.signature,
            Self::Change(b) => b.signature,
        }
    }

    pub fn work(&self) -> u64 {
        match self {
            Self::Send(b) => b.work,
            Self::Receive(b) => b.work,
            Self::Open(b) => b.work,
            Self::Change(b) => b.work,
        }
    }

    /// Serialize the payload only (the type travels out-of-band, in the
    /// message header or a stream tag).
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Self::Send(b) => b.serialize(),
            Self::Receive(b) => b.serialize(),
            Self::Open(b) => b.serialize(),
            Self::Change(b) => b.serialize(),
        }
    }

    /// Serialize with a leading type tag, the framing used by bulk streams.
    pub fn serialize_with_type(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + OPEN_SIZE);
        out.push(self.block_type().as_u8());
        out.extend_from_slice(&self.serialize());
        out
    }

    /// Deserialize a payload whose type is already known.
    pub fn deserialize(block_type: BlockType, bytes: &[u8]) -> Result<Self, BlockError> {
        match block_type {
            BlockType::Send => SendBlock::deserialize(bytes).map(Self::Send),
            BlockType::Receive => ReceiveBlock::deserialize(bytes).map(Self::Receive),
            BlockType::Open => OpenBlock::deserialize(bytes).map(Self::Open),
            BlockType::Change => ChangeBlock::deserialize(bytes).map(Self::Change),
            BlockType::Invalid | BlockType::NotABlock => {
                Err(BlockError::UnknownType(block_type.as_u8()))
            }
        }
    }

    /// JSON textual form with a `"type"` discriminator.
    pub fn to_json(&self, prefix: &str) -> Value {
        match self {
            Self::Send(b) => b.to_json(prefix),
            Self::Receive(b) => b.to_json(prefix),
            Self::Open(b) => b.to_json(prefix),
            Self::Change(b) => b.to_json(prefix),
        }
    }

    pub fn from_json(prefix: &str, value: &Value) -> Result<Self, BlockError> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| BlockError::BadJson("missing field 'type'".into()))?;
        match kind {
            "send" => SendBlock::from_json(prefix, value).map(Self::Send),
            "receive" => ReceiveBlock::from_json(prefix, value).map(Self::Receive),
            "open" => OpenBlock::from_json(prefix, value).map(Self::Open),
            "change" => ChangeBlock::from_json(prefix, value).map(Self::Change),
            other => Err(BlockError::BadJson(format!("unknown block type '{other}'"))),
        }
    }

    pub fn from_json_str(prefix: &str, text: &str) -> Result<Self, BlockError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| BlockError::BadJson(e.to_string()))?;
        Self::from_json(prefix, &value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_crypto::KeyPair;
    use vela_types::RawKey;

    fn keypair() -> KeyPair {
        KeyPair::from_private(RawKey::new([42u8; 32]))
    }

    fn sample_blocks() -> Vec<Block> {
        let kp = keypair();
        vec![
            Block::Send(SendBlock::new(
                BlockHash::new([1; 32]),
                Account::new([2; 32]),
                Amount::new(500),
                &kp.private,
                &kp.public,
                1,
            )),
            Block::Receive(ReceiveBlock::new(
                BlockHash::new([3; 32]),
                BlockHash::new([4; 32]),
                &kp.private,
                &kp.public,
                2,
            )),
            Block::Open(OpenBlock::new(
                BlockHash::new([5; 32]),
                kp.public,
                kp.public,
                &kp.private,
                &kp.public,
                3,
            )),
            Block::Change(ChangeBlock::new(
                BlockHash::new([6; 32]),
                Account::new([7; 32]),
                &kp.private,
                &kp.public,
                4,
            )),
        ]
    }

    #[test]
    fn typed_binary_roundtrip() {
        for block in sample_blocks() {
            let bytes = block.serialize();
            let decoded = Block::deserialize(block.block_type(), &bytes).unwrap();
            assert_eq!(decoded, block);
            // Re-encoding yields the original bytes.
            assert_eq!(decoded.serialize(), bytes);
        }
    }

    #[test]
    fn tagged_stream_roundtrip() {
        for block in sample_blocks() {
            let bytes = block.serialize_with_type();
            let tag = BlockType::from_u8(bytes[0]).unwrap();
            assert_eq!(tag, block.block_type());
            assert_eq!(Block::deserialize(tag, &bytes[1..]).unwrap(), block);
        }
    }

    #[test]
    fn json_roundtrip_all_variants() {
        for block in sample_blocks() {
            let text = block.to_json("vela").to_string();
            assert_eq!(Block::from_json_str("vela", &text).unwrap(), block);
        }
    }

    #[test]
    fn root_dispatch() {
        let blocks = sample_blocks();
        assert_eq!(blocks[0].root(), BlockHash::new([1; 32]));
        let kp = keypair();
        assert_eq!(blocks[2].root().as_bytes(), kp.public.as_bytes());
    }

    #[test]
    fn unknown_type_is_error() {
        assert!(BlockType::from_u8(9).is_none());
        assert!(matches!(
            Block::deserialize(BlockType::NotABlock, &[]),
            Err(BlockError::UnknownType(1))
        ));
    }

    #[test]
    fn hashes_are_distinct_across_variants() {
        let blocks = sample_blocks();
        for i in 0..blocks.len() {
            for j in (i + 1)..blocks.len() {
                assert_ne!(blocks[i].hash(), blocks[j].hash());
            }
        }
    }

    #[test]
    fn unknown_json_type_rejected() {
        let text = r#"{"type":"state"}"#;
        assert!(matches!(
            Block::from_json_str("vela", text),
            Err(BlockError::BadJson(_))
        ));
    }
}
