//! The unchecked table: blocks whose predecessor is not yet known, keyed by
//! the missing hash. Multiple blocks may wait on the same dependency, so the
//! table allows duplicate keys.

use crate::transaction::{Readable, WriteTransaction};
use crate::{Store, StoreError};
use vela_blocks::{Block, BlockType};
use vela_types::BlockHash;

fn decode_entry(value: &[u8]) -> Result<Block, StoreError> {
    if value.is_empty() {
        return Err(StoreError::corrupt("unchecked", "empty entry"));
    }
    let block_type = BlockType::from_u8(value[0])
        .ok_or_else(|| StoreError::corrupt("unchecked", format!("bad type byte {}", value[0])))?;
    Block::deserialize(block_type, &value[1..])
        .map_err(|e| StoreError::corrupt("unchecked", e.to_string()))
}

impl Store {
    /// Queue `block` until the block named by `dependency` arrives.
    pub fn unchecked_put(
        &self,
        txn: &mut WriteTransaction,
        dependency: &BlockHash,
        block: &Block,
    ) -> Result<(), StoreError> {
        self.unchecked.put(
            &mut txn.0,
            dependency.as_bytes(),
            &block.serialize_with_type(),
        )?;
        Ok(())
    }

    /// All blocks waiting on `dependency`.
    pub fn unchecked_get(
        &self,
        txn: &impl Readable,
        dependency: &BlockHash,
    ) -> Result<Vec<Block>, StoreError> {
        let mut out = Vec::new();
        if let Some(iter) = self
            .unchecked
            .get_duplicates(txn.ro(), dependency.as_bytes())?
        {
            for entry in iter {
                let (_, value) = entry?;
                out.push(decode_entry(value)?);
            }
        }
        Ok(out)
    }

    /// Remove one specific waiting block.
    pub fn unchecked_del(
        &self,
        txn: &mut WriteTransaction,
        dependency: &BlockHash,
        block: &Block,
    ) -> Result<(), StoreError> {
        self.unchecked.delete_one_duplicate(
            &mut txn.0,
            dependency.as_bytes(),
            &block.serialize_with_type(),
        )?;
        Ok(())
    }

    /// Remove every block waiting on `dependency`.
    pub fn unchecked_del_all(
        &self,
        txn: &mut WriteTransaction,
        dependency: &BlockHash,
    ) -> Result<(), StoreError> {
        self.unchecked.delete(&mut txn.0, dependency.as_bytes())?;
        Ok(())
    }

    pub fn unchecked_count(&self, txn: &impl Readable) -> Result<u64, StoreError> {
        Ok(self.unchecked.len(txn.ro())?)
    }

    pub fn unchecked_clear(&self, txn: &mut WriteTransaction) -> Result<(), StoreError> {
        self.unchecked.clear(&mut txn.0)?;
        Ok(())
    }

    /// Iterate every (dependency, block) pair.
    pub fn unchecked_iter<'t>(
        &self,
        txn: &'t impl Readable,
    ) -> Result<impl Iterator<Item = Result<(BlockHash, Block), StoreError>> + 't, StoreError> {
        let iter = self.unchecked.iter(txn.ro())?.map(|entry| {
            let (key, value) = entry?;
            let mut hash = [0u8; 32];
            hash.copy_from_slice(key);
            Ok((BlockHash::new(hash), decode_entry(value)?))
        });
        Ok(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vela_blocks::ReceiveBlock;
    use vela_crypto::KeyPair;
    use vela_types::RawKey;

    fn receive(previous: u8, source: u8) -> Block {
        let kp = KeyPair::from_private(RawKey::new([33u8; 32]));
        Block::Receive(ReceiveBlock::new(
            BlockHash::new([previous; 32]),
            BlockHash::new([source; 32]),
            &kp.private,
            &kp.public,
            0,
        ))
    }

    #[test]
    fn multiple_blocks_under_one_dependency() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let dep = BlockHash::new([0xAA; 32]);

        let mut txn = store.begin_write().unwrap();
        store.unchecked_put(&mut txn, &dep, &receive(1, 2)).unwrap();
        store.unchecked_put(&mut txn, &dep, &receive(3, 4)).unwrap();
        assert_eq!(store.unchecked_count(&txn).unwrap(), 2);

        let waiting = store.unchecked_get(&txn, &dep).unwrap();
        assert_eq!(waiting.len(), 2);
        txn.abort();
    }

    #[test]
    fn delete_one_leaves_the_other() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let dep = BlockHash::new([0xBB; 32]);
        let a = receive(1, 2);
        let b = receive(3, 4);

        let mut txn = store.begin_write().unwrap();
        store.unchecked_put(&mut txn, &dep, &a).unwrap();
        store.unchecked_put(&mut txn, &dep, &b).unwrap();
        store.unchecked_del(&mut txn, &dep, &a).unwrap();

        let waiting = store.unchecked_get(&txn, &dep).unwrap();
        assert_eq!(waiting, vec![b]);
        txn.abort();
    }

    #[test]
    fn del_all_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let dep1 = BlockHash::new([0x01; 32]);
        let dep2 = BlockHash::new([0x02; 32]);

        let mut txn = store.begin_write().unwrap();
        store.unchecked_put(&mut txn, &dep1, &receive(1, 2)).unwrap();
        store.unchecked_put(&mut txn, &dep2, &receive(3, 4)).unwrap();
        store.unchecked_del_all(&mut txn, &dep1).unwrap();
        assert_eq!(store.unchecked_count(&txn).unwrap(), 1);
        store.unchecked_clear(&mut txn).unwrap();
        assert_eq!(store.unchecked_count(&txn).unwrap(), 0);
        txn.abort();
    }

    #[test]
    fn unknown_dependency_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let txn = store.begin_read().unwrap();
        assert!(store
            .unchecked_get(&txn, &BlockHash::new([9; 32]))
            .unwrap()
            .is_empty());
    }
}
