//! The vote table: the highest-sequence vote observed per representative.
//!
//! Values are opaque here; the consensus crate owns the vote codec. The
//! store only guarantees atomic replacement per account.

use crate::transaction::{Readable, WriteTransaction};
use crate::{Store, StoreError};
use vela_types::Account;

impl Store {
    pub fn vote_get(
        &self,
        txn: &impl Readable,
        account: &Account,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .vote
            .get(txn.ro(), account.as_bytes())?
            .map(|bytes| bytes.to_vec()))
    }

    pub fn vote_put(
        &self,
        txn: &mut WriteTransaction,
        account: &Account,
        value: &[u8],
    ) -> Result<(), StoreError> {
        self.vote.put(&mut txn.0, account.as_bytes(), value)?;
        Ok(())
    }

    pub fn vote_count(&self, txn: &impl Readable) -> Result<u64, StoreError> {
        Ok(self.vote.len(txn.ro())?)
    }

    /// Iterate every representative's stored vote in account order.
    pub fn vote_iter<'t>(
        &self,
        txn: &'t impl Readable,
    ) -> Result<impl Iterator<Item = Result<(Account, Vec<u8>), StoreError>> + 't, StoreError> {
        let iter = self.vote.iter(txn.ro())?.map(|entry| {
            let (key, value) = entry?;
            let mut account = [0u8; 32];
            account.copy_from_slice(key);
            Ok((Account::new(account), value.to_vec()))
        });
        Ok(iter)
    }

    pub(crate) fn vote_clear(&self, txn: &mut WriteTransaction) -> Result<(), StoreError> {
        self.vote.clear(&mut txn.0)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn replacement_is_per_account() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let account = Account::new([1; 32]);

        let mut txn = store.begin_write().unwrap();
        store.vote_put(&mut txn, &account, b"first").unwrap();
        store.vote_put(&mut txn, &account, b"second").unwrap();
        assert_eq!(
            store.vote_get(&txn, &account).unwrap(),
            Some(b"second".to_vec())
        );
        assert_eq!(store.vote_count(&txn).unwrap(), 1);
        txn.abort();
    }
}
