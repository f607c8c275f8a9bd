//! The metadata table. Key 1 holds the schema version.

use crate::transaction::{Readable, WriteTransaction};
use crate::{Store, StoreError};

/// Well-known meta key for the schema version.
const VERSION_KEY: [u8; 1] = [1];

impl Store {
    pub fn version_get(&self, txn: &impl Readable) -> Result<Option<u32>, StoreError> {
        match self.meta.get(txn.ro(), &VERSION_KEY)? {
            Some(bytes) => {
                if bytes.len() != 4 {
                    return Err(StoreError::corrupt("meta", "version cell is not 4 bytes"));
                }
                let mut arr = [0u8; 4];
                arr.copy_from_slice(bytes);
                Ok(Some(u32::from_be_bytes(arr)))
            }
            None => Ok(None),
        }
    }

    pub fn version_put(&self, txn: &mut WriteTransaction, version: u32) -> Result<(), StoreError> {
        self.meta
            .put(&mut txn.0, &VERSION_KEY, &version.to_be_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn version_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let mut txn = store.begin_write().unwrap();
        store.version_put(&mut txn, 7).unwrap();
        assert_eq!(store.version_get(&txn).unwrap(), Some(7));
        txn.abort();
    }
}
