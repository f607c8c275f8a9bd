//! The representation table: running voting weight per representative.

use crate::transaction::{Readable, WriteTransaction};
use crate::{Store, StoreError};
use vela_types::{Account, Amount};

impl Store {
    /// A representative's current weight; zero if never recorded.
    pub fn representation_get(
        &self,
        txn: &impl Readable,
        account: &Account,
    ) -> Result<Amount, StoreError> {
        match self.representation.get(txn.ro(), account.as_bytes())? {
            Some(bytes) => {
                if bytes.len() != 16 {
                    return Err(StoreError::corrupt("representation", "value is not 16 bytes"));
                }
                let mut arr = [0u8; 16];
                arr.copy_from_slice(bytes);
                Ok(Amount::from_be_bytes(arr))
            }
            None => Ok(Amount::ZERO),
        }
    }

    pub fn representation_put(
        &self,
        txn: &mut WriteTransaction,
        account: &Account,
        weight: Amount,
    ) -> Result<(), StoreError> {
        if weight.is_zero() {
            self.representation.delete(&mut txn.0, account.as_bytes())?;
        } else {
            self.representation
                .put(&mut txn.0, account.as_bytes(), &weight.to_be_bytes())?;
        }
        Ok(())
    }

    /// Adjust a representative's weight by a signed delta, saturating at
    /// zero.
    pub fn representation_add(
        &self,
        txn: &mut WriteTransaction,
        account: &Account,
        delta: Amount,
    ) -> Result<(), StoreError> {
        let current = self.representation_get(txn, account)?;
        self.representation_put(txn, account, current.saturating_add(delta))
    }

    pub fn representation_subtract(
        &self,
        txn: &mut WriteTransaction,
        account: &Account,
        delta: Amount,
    ) -> Result<(), StoreError> {
        let current = self.representation_get(txn, account)?;
        self.representation_put(txn, account, current.saturating_sub(delta))
    }

    /// Iterate every representative and its weight.
    pub fn representation_iter<'t>(
        &self,
        txn: &'t impl Readable,
    ) -> Result<impl Iterator<Item = Result<(Account, Amount), StoreError>> + 't, StoreError> {
        let iter = self.representation.iter(txn.ro())?.map(|entry| {
            let (key, value) = entry?;
            let mut account = [0u8; 32];
            account.copy_from_slice(key);
            if value.len() != 16 {
                return Err(StoreError::corrupt("representation", "value is not 16 bytes"));
            }
            let mut arr = [0u8; 16];
            arr.copy_from_slice(value);
            Ok((Account::new(account), Amount::from_be_bytes(arr)))
        });
        Ok(iter)
    }

    pub(crate) fn representation_clear(&self, txn: &mut WriteTransaction) -> Result<(), StoreError> {
        self.representation.clear(&mut txn.0)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_weight_is_zero() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let txn = store.begin_read().unwrap();
        assert_eq!(
            store.representation_get(&txn, &Account::new([1; 32])).unwrap(),
            Amount::ZERO
        );
    }

    #[test]
    fn add_and_subtract() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let rep = Account::new([2; 32]);

        let mut txn = store.begin_write().unwrap();
        store.representation_add(&mut txn, &rep, Amount::new(100)).unwrap();
        store.representation_add(&mut txn, &rep, Amount::new(50)).unwrap();
        assert_eq!(
            store.representation_get(&txn, &rep).unwrap(),
            Amount::new(150)
        );
        store
            .representation_subtract(&mut txn, &rep, Amount::new(150))
            .unwrap();
        assert_eq!(store.representation_get(&txn, &rep).unwrap(), Amount::ZERO);
        txn.abort();
    }

    #[test]
    fn zero_weight_removes_entry() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let rep = Account::new([3; 32]);

        let mut txn = store.begin_write().unwrap();
        store.representation_put(&mut txn, &rep, Amount::new(10)).unwrap();
        store.representation_put(&mut txn, &rep, Amount::ZERO).unwrap();
        let entries: Vec<_> = store
            .representation_iter(&txn)
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert!(entries.is_empty());
        txn.abort();
    }
}
