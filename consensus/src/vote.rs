//! Representative votes.

use crate::ConsensusError;
use vela_blocks::{Block, BlockType};
use vela_crypto::{blake2b_256_multi, sign_message, verify_message};
use vela_types::{Account, BlockHash, RawKey, Signature};

/// A representative's statement that `block` should win at its root.
///
/// The signature covers `Blake2b-256(block hash ‖ sequence_le64)`, so a
/// replayed vote cannot be re-targeted at another block and sequences order
/// votes from the same representative.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vote {
    pub account: Account,
    pub signature: Signature,
    pub sequence: u64,
    pub block: Block,
}

impl Vote {
    /// Sign a fresh vote.
    pub fn new(account: Account, prv: &RawKey, sequence: u64, block: Block) -> Self {
        let digest = Self::digest(&block.hash(), sequence);
        let signature = sign_message(prv, &account, &digest);
        Self {
            account,
            signature,
            sequence,
            block,
        }
    }

    /// The signed message.
    pub fn digest(block_hash: &BlockHash, sequence: u64) -> [u8; 32] {
        blake2b_256_multi(&[block_hash.as_bytes(), &sequence.to_le_bytes()])
    }

    pub fn verify(&self) -> bool {
        let digest = Self::digest(&self.block.hash(), self.sequence);
        verify_message(&self.account, &digest, &self.signature)
    }

    /// account(32) ‖ signature(64) ‖ sequence(u64 LE) ‖ typed block.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(104 + 1 + self.block.serialize().len());
        out.extend_from_slice(self.account.as_bytes());
        out.extend_from_slice(self.signature.as_bytes());
        out.extend_from_slice(&self.sequence.to_le_bytes());
        out.extend_from_slice(&self.block.serialize_with_type());
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, ConsensusError> {
        if bytes.len() < 105 {
            return Err(ConsensusError::BadVote(format!(
                "vote truncated at {} bytes",
                bytes.len()
            )));
        }
        let mut account = [0u8; 32];
        account.copy_from_slice(&bytes[0..32]);
        let mut signature = [0u8; 64];
        signature.copy_from_slice(&bytes[32..96]);
        let mut sequence = [0u8; 8];
        sequence.copy_from_slice(&bytes[96..104]);
        let block_type = BlockType::from_u8(bytes[104])
            .ok_or_else(|| ConsensusError::BadVote(format!("bad block type {}", bytes[104])))?;
        let block = Block::deserialize(block_type, &bytes[105..])
            .map_err(|e| ConsensusError::BadVote(e.to_string()))?;
        Ok(Self {
            account: Account::new(account),
            signature: Signature::new(signature),
            sequence: u64::from_le_bytes(sequence),
            block,
        })
    }
}
