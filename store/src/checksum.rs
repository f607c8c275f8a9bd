//! The checksum table: a hierarchical XOR digest of account heads.
//!
//! Keys are a 56-bit prefix plus an 8-bit mask packed into 8 bytes. The live
//! code only maintains slot (0, 0), one digest over all heads, but the
//! keying stays on disk so the digest can later be sharded by account
//! prefix without a format change.

use crate::transaction::{Readable, WriteTransaction};
use crate::{Store, StoreError};
use vela_types::BlockHash;

fn checksum_key(prefix: u64, mask: u8) -> [u8; 8] {
    let mut key = [0u8; 8];
    key[0..7].copy_from_slice(&prefix.to_be_bytes()[1..8]);
    key[7] = mask;
    key
}

impl Store {
    pub fn checksum_get(
        &self,
        txn: &impl Readable,
        prefix: u64,
        mask: u8,
    ) -> Result<Option<BlockHash>, StoreError> {
        match self.checksum.get(txn.ro(), &checksum_key(prefix, mask))? {
            Some(bytes) => {
                if bytes.len() != 32 {
                    return Err(StoreError::corrupt("checksum", "value is not 32 bytes"));
                }
                let mut hash = [0u8; 32];
                hash.copy_from_slice(bytes);
                Ok(Some(BlockHash::new(hash)))
            }
            None => Ok(None),
        }
    }

    pub fn checksum_put(
        &self,
        txn: &mut WriteTransaction,
        prefix: u64,
        mask: u8,
        hash: &BlockHash,
    ) -> Result<(), StoreError> {
        self.checksum
            .put(&mut txn.0, &checksum_key(prefix, mask), hash.as_bytes())?;
        Ok(())
    }

    pub fn checksum_del(
        &self,
        txn: &mut WriteTransaction,
        prefix: u64,
        mask: u8,
    ) -> Result<(), StoreError> {
        self.checksum.delete(&mut txn.0, &checksum_key(prefix, mask))?;
        Ok(())
    }
}
