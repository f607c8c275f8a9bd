//! The four block tables.
//!
//! Each value is the block's fixed-width serialization with a 32-byte
//! successor hash appended. The successor slot is written exactly once, when
//! the block's child arrives; everything before it is immutable. Block
//! hashes are disjoint across the four tables because the ledger never
//! stores the same hash twice.

use crate::transaction::{Readable, WriteTransaction};
use crate::{Store, StoreError};
use heed::types::Bytes;
use heed::Database;
use rand::RngCore;
use vela_blocks::{Block, BlockType};
use vela_types::BlockHash;

/// Probe order for hash lookups across the four tables.
const PROBE_ORDER: [BlockType; 4] = [
    BlockType::Send,
    BlockType::Receive,
    BlockType::Open,
    BlockType::Change,
];

impl Store {
    /// Dispatch to the table owning a block type. A non-variant type here
    /// means the codec let an invalid tag through, which is a programmer
    /// invariant violation.
    fn block_table(&self, block_type: BlockType) -> &Database<Bytes, Bytes> {
        match block_type {
            BlockType::Send => &self.send_blocks,
            BlockType::Receive => &self.receive_blocks,
            BlockType::Open => &self.open_blocks,
            BlockType::Change => &self.change_blocks,
            BlockType::Invalid | BlockType::NotABlock => {
                unreachable!("only real block variants are stored")
            }
        }
    }

    /// Locate the table holding `hash`, returning the type and raw value.
    fn block_probe<'t>(
        &self,
        txn: &'t impl Readable,
        hash: &BlockHash,
    ) -> Result<Option<(BlockType, &'t [u8])>, StoreError> {
        for block_type in PROBE_ORDER {
            let table = self.block_table(block_type);
            if let Some(value) = table.get(txn.ro(), hash.as_bytes())? {
                return Ok(Some((block_type, value)));
            }
        }
        Ok(None)
    }

    /// Store a block and link it from its parent's successor slot.
    pub fn block_put(
        &self,
        txn: &mut WriteTransaction,
        hash: &BlockHash,
        block: &Block,
        successor: BlockHash,
    ) -> Result<(), StoreError> {
        let table = self.block_table(block.block_type());
        let mut value = block.serialize();
        value.extend_from_slice(successor.as_bytes());
        table.put(&mut txn.0, hash.as_bytes(), &value)?;

        let parent = block.previous();
        if !parent.is_zero() {
            self.block_successor_set(txn, &parent, hash)?;
        }
        Ok(())
    }

    pub fn block_get(
        &self,
        txn: &impl Readable,
        hash: &BlockHash,
    ) -> Result<Option<Block>, StoreError> {
        match self.block_probe(txn, hash)? {
            Some((block_type, value)) => {
                let payload_len = value.len().saturating_sub(32);
                let block = Block::deserialize(block_type, &value[..payload_len])
                    .map_err(|e| StoreError::corrupt("blocks", e.to_string()))?;
                Ok(Some(block))
            }
            None => Ok(None),
        }
    }

    pub fn block_exists(&self, txn: &impl Readable, hash: &BlockHash) -> Result<bool, StoreError> {
        Ok(self.block_probe(txn, hash)?.is_some())
    }

    /// The type recovered from which table matched.
    pub fn block_type_of(
        &self,
        txn: &impl Readable,
        hash: &BlockHash,
    ) -> Result<Option<BlockType>, StoreError> {
        Ok(self.block_probe(txn, hash)?.map(|(t, _)| t))
    }

    /// Read the trailing 32 bytes of the stored value.
    pub fn block_successor(
        &self,
        txn: &impl Readable,
        hash: &BlockHash,
    ) -> Result<Option<BlockHash>, StoreError> {
        match self.block_probe(txn, hash)? {
            Some((_, value)) => {
                if value.len() < 32 {
                    return Err(StoreError::corrupt("blocks", "value shorter than successor slot"));
                }
                let mut successor = [0u8; 32];
                successor.copy_from_slice(&value[value.len() - 32..]);
                let successor = BlockHash::new(successor);
                Ok(if successor.is_zero() { None } else { Some(successor) })
            }
            None => Ok(None),
        }
    }

    /// Rewrite a stored block's successor slot.
    pub fn block_successor_set(
        &self,
        txn: &mut WriteTransaction,
        hash: &BlockHash,
        successor: &BlockHash,
    ) -> Result<(), StoreError> {
        let (block_type, old) = match self.block_probe(txn, hash)? {
            Some((block_type, value)) => (block_type, value.to_vec()),
            None => return Ok(()),
        };
        let table = self.block_table(block_type);
        let mut value = old;
        let len = value.len();
        value[len - 32..].copy_from_slice(successor.as_bytes());
        table.put(&mut txn.0, hash.as_bytes(), &value)?;
        Ok(())
    }

    /// Zero a stored block's successor slot (used by rollback).
    pub fn block_successor_clear(
        &self,
        txn: &mut WriteTransaction,
        hash: &BlockHash,
    ) -> Result<(), StoreError> {
        self.block_successor_set(txn, hash, &BlockHash::ZERO)
    }

    pub fn block_del(&self, txn: &mut WriteTransaction, hash: &BlockHash) -> Result<(), StoreError> {
        if let Some((block_type, _)) = self.block_probe(txn, hash)? {
            let table = self.block_table(block_type);
            table.delete(&mut txn.0, hash.as_bytes())?;
        }
        Ok(())
    }

    /// Entry counts per table, probe order.
    pub fn block_counts(&self, txn: &impl Readable) -> Result<[u64; 4], StoreError> {
        Ok([
            self.send_blocks.len(txn.ro())?,
            self.receive_blocks.len(txn.ro())?,
            self.open_blocks.len(txn.ro())?,
            self.change_blocks.len(txn.ro())?,
        ])
    }

    pub fn block_count_total(&self, txn: &impl Readable) -> Result<u64, StoreError> {
        Ok(self.block_counts(txn)?.iter().sum())
    }

    /// A uniformly random stored block: pick a table weighted by entry
    /// count, then the entry at or after a random 256-bit key, wrapping to
    /// the table's first entry.
    pub fn block_random(
        &self,
        txn: &impl Readable,
        rng: &mut dyn RngCore,
    ) -> Result<Option<Block>, StoreError> {
        let counts = self.block_counts(txn)?;
        let total: u64 = counts.iter().sum();
        if total == 0 {
            return Ok(None);
        }
        let mut pick = rng.next_u64() % total;
        let mut chosen = PROBE_ORDER[3];
        for (block_type, count) in PROBE_ORDER.iter().zip(counts.iter()) {
            if pick < *count {
                chosen = *block_type;
                break;
            }
            pick -= count;
        }
        let table = self.block_table(chosen);

        let mut key = [0u8; 32];
        rng.fill_bytes(&mut key);
        let entry = match table
            .range(
                txn.ro(),
                &(std::ops::Bound::Included(&key[..]), std::ops::Bound::Unbounded),
            )?
            .next()
        {
            Some(entry) => Some(entry?),
            None => table.first(txn.ro())?,
        };
        match entry {
            Some((_, value)) => {
                let payload_len = value.len().saturating_sub(32);
                let block = Block::deserialize(chosen, &value[..payload_len])
                    .map_err(|e| StoreError::corrupt("blocks", e.to_string()))?;
                Ok(Some(block))
            }
            None => Ok(None),
        }
    }

    /// Iterate one block table's hashes in key order.
    pub fn blocks_of_type<'t>(
        &self,
        txn: &'t impl Readable,
        block_type: BlockType,
    ) -> Result<impl Iterator<Item = Result<(BlockHash, Block), StoreError>> + 't, StoreError> {
        let table = self.block_table(block_type);
        let iter = table.iter(txn.ro())?.map(move |entry| {
            let (key, value) = entry?;
            let mut hash = [0u8; 32];
            hash.copy_from_slice(key);
            let payload_len = value.len().saturating_sub(32);
            let block = Block::deserialize(block_type, &value[..payload_len])
                .map_err(|e| StoreError::corrupt("blocks", e.to_string()))?;
            Ok((BlockHash::new(hash), block))
        });
        Ok(iter)
    }
}
