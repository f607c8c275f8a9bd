//! The frontiers table: reverse index from head block hash to account.

use crate::transaction::{Readable, WriteTransaction};
use crate::{Store, StoreError};
use vela_types::{Account, BlockHash};

impl Store {
    pub fn frontier_get(
        &self,
        txn: &impl Readable,
        hash: &BlockHash,
    ) -> Result<Option<Account>, StoreError> {
        match self.frontiers.get(txn.ro(), hash.as_bytes())? {
            Some(bytes) => {
                if bytes.len() != 32 {
                    return Err(StoreError::corrupt("frontiers", "value is not 32 bytes"));
                }
                let mut account = [0u8; 32];
                account.copy_from_slice(bytes);
                Ok(Some(Account::new(account)))
            }
            None => Ok(None),
        }
    }

    pub fn frontier_put(
        &self,
        txn: &mut WriteTransaction,
        hash: &BlockHash,
        account: &Account,
    ) -> Result<(), StoreError> {
        self.frontiers
            .put(&mut txn.0, hash.as_bytes(), account.as_bytes())?;
        Ok(())
    }

    pub fn frontier_del(&self, txn: &mut WriteTransaction, hash: &BlockHash) -> Result<(), StoreError> {
        self.frontiers.delete(&mut txn.0, hash.as_bytes())?;
        Ok(())
    }

    pub fn frontier_count(&self, txn: &impl Readable) -> Result<u64, StoreError> {
        Ok(self.frontiers.len(txn.ro())?)
    }

    /// Iterate every (head, account) pair in hash order.
    pub fn frontiers_iter<'t>(
        &self,
        txn: &'t impl Readable,
    ) -> Result<impl Iterator<Item = Result<(BlockHash, Account), StoreError>> + 't, StoreError>
    {
        let iter = self.frontiers.iter(txn.ro())?.map(|entry| {
            let (key, value) = entry?;
            let mut hash = [0u8; 32];
            hash.copy_from_slice(key);
            if value.len() != 32 {
                return Err(StoreError::corrupt("frontiers", "value is not 32 bytes"));
            }
            let mut account = [0u8; 32];
            account.copy_from_slice(value);
            Ok((BlockHash::new(hash), Account::new(account)))
        });
        Ok(iter)
    }
}
