//! The unsynced table: heads of chains that peers may lack, queued for the
//! bootstrap push phase.

use crate::transaction::{Readable, WriteTransaction};
use crate::{Store, StoreError};
use vela_types::BlockHash;

impl Store {
    pub fn unsynced_put(&self, txn: &mut WriteTransaction, hash: &BlockHash) -> Result<(), StoreError> {
        self.unsynced.put(&mut txn.0, hash.as_bytes(), &[])?;
        Ok(())
    }

    pub fn unsynced_del(&self, txn: &mut WriteTransaction, hash: &BlockHash) -> Result<(), StoreError> {
        self.unsynced.delete(&mut txn.0, hash.as_bytes())?;
        Ok(())
    }

    pub fn unsynced_exists(&self, txn: &impl Readable, hash: &BlockHash) -> Result<bool, StoreError> {
        Ok(self.unsynced.get(txn.ro(), hash.as_bytes())?.is_some())
    }

    pub fn unsynced_iter<'t>(
        &self,
        txn: &'t impl Readable,
    ) -> Result<impl Iterator<Item = Result<BlockHash, StoreError>> + 't, StoreError> {
        let iter = self.unsynced.iter(txn.ro())?.map(|entry| {
            let (key, _) = entry?;
            let mut hash = [0u8; 32];
            hash.copy_from_slice(key);
            Ok(BlockHash::new(hash))
        });
        Ok(iter)
    }

    pub fn unsynced_clear(&self, txn: &mut WriteTransaction) -> Result<(), StoreError> {
        self.unsynced.clear(&mut txn.0)?;
        Ok(())
    }
}
