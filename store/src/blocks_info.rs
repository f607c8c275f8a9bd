//! The blocks_info table: sparse {account, balance} snapshots taken every
//! N blocks on a chain, so `account(hash)` and `balance(hash)` resolve in a
//! bounded number of successor hops.

use crate::transaction::{Readable, WriteTransaction};
use crate::{Store, StoreError};
use vela_types::{Account, Amount, BlockHash};

/// Snapshot interval along a chain.
pub const BLOCK_INFO_INTERVAL: u64 = 32;

/// A snapshot of chain state as of one block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    pub account: Account,
    pub balance: Amount,
}

impl BlockInfo {
    pub fn serialize(&self) -> [u8; 48] {
        let mut out = [0u8; 48];
        out[0..32].copy_from_slice(self.account.as_bytes());
        out[32..48].copy_from_slice(&self.balance.to_be_bytes());
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() != 48 {
            return Err(StoreError::corrupt("blocks_info", "value is not 48 bytes"));
        }
        let mut account = [0u8; 32];
        account.copy_from_slice(&bytes[0..32]);
        let mut balance = [0u8; 16];
        balance.copy_from_slice(&bytes[32..48]);
        Ok(Self {
            account: Account::new(account),
            balance: Amount::from_be_bytes(balance),
        })
    }
}

impl Store {
    pub fn block_info_get(
        &self,
        txn: &impl Readable,
        hash: &BlockHash,
    ) -> Result<Option<BlockInfo>, StoreError> {
        match self.blocks_info.get(txn.ro(), hash.as_bytes())? {
            Some(bytes) => Ok(Some(BlockInfo::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    pub fn block_info_put(
        &self,
        txn: &mut WriteTransaction,
        hash: &BlockHash,
        info: &BlockInfo,
    ) -> Result<(), StoreError> {
        self.blocks_info
            .put(&mut txn.0, hash.as_bytes(), &info.serialize())?;
        Ok(())
    }

    pub fn block_info_del(
        &self,
        txn: &mut WriteTransaction,
        hash: &BlockHash,
    ) -> Result<(), StoreError> {
        self.blocks_info.delete(&mut txn.0, hash.as_bytes())?;
        Ok(())
    }

    pub fn block_info_count(&self, txn: &impl Readable) -> Result<u64, StoreError> {
        Ok(self.blocks_info.len(txn.ro())?)
    }

    pub(crate) fn block_info_clear(&self, txn: &mut WriteTransaction) -> Result<(), StoreError> {
        self.blocks_info.clear(&mut txn.0)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let hash = BlockHash::new([1; 32]);
        let info = BlockInfo {
            account: Account::new([2; 32]),
            balance: Amount::new(1234),
        };

        let mut txn = store.begin_write().unwrap();
        store.block_info_put(&mut txn, &hash, &info).unwrap();
        assert_eq!(store.block_info_get(&txn, &hash).unwrap(), Some(info));
        store.block_info_del(&mut txn, &hash).unwrap();
        assert_eq!(store.block_info_get(&txn, &hash).unwrap(), None);
        txn.abort();
    }
}
