//! The pending table: sends applied to the ledger but not yet claimed by a
//! matching receive or open on the destination chain.

use crate::transaction::{Readable, WriteTransaction};
use crate::{Store, StoreError};
use vela_types::{Account, Amount, BlockHash};

/// Composite key: destination account ‖ send block hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PendingKey {
    pub destination: Account,
    pub hash: BlockHash,
}

impl PendingKey {
    pub fn new(destination: Account, hash: BlockHash) -> Self {
        Self { destination, hash }
    }

    pub fn serialize(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[0..32].copy_from_slice(self.destination.as_bytes());
        out[32..64].copy_from_slice(self.hash.as_bytes());
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() != 64 {
            return Err(StoreError::corrupt("pending", "key is not 64 bytes"));
        }
        let mut destination = [0u8; 32];
        destination.copy_from_slice(&bytes[0..32]);
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[32..64]);
        Ok(Self {
            destination: Account::new(destination),
            hash: BlockHash::new(hash),
        })
    }
}

/// Value: sending account ‖ amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingInfo {
    pub source: Account,
    pub amount: Amount,
}

impl PendingInfo {
    pub fn serialize(&self) -> [u8; 48] {
        let mut out = [0u8; 48];
        out[0..32].copy_from_slice(self.source.as_bytes());
        out[32..48].copy_from_slice(&self.amount.to_be_bytes());
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() != 48 {
            return Err(StoreError::corrupt("pending", "value is not 48 bytes"));
        }
        let mut source = [0u8; 32];
        source.copy_from_slice(&bytes[0..32]);
        let mut amount = [0u8; 16];
        amount.copy_from_slice(&bytes[32..48]);
        Ok(Self {
            source: Account::new(source),
            amount: Amount::from_be_bytes(amount),
        })
    }
}

impl Store {
    pub fn pending_get(
        &self,
        txn: &impl Readable,
        key: &PendingKey,
    ) -> Result<Option<PendingInfo>, StoreError> {
        match self.pending.get(txn.ro(), &key.serialize())? {
            Some(bytes) => Ok(Some(PendingInfo::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    pub fn pending_exists(&self, txn: &impl Readable, key: &PendingKey) -> Result<bool, StoreError> {
        Ok(self.pending.get(txn.ro(), &key.serialize())?.is_some())
    }

    pub fn pending_put(
        &self,
        txn: &mut WriteTransaction,
        key: &PendingKey,
        info: &PendingInfo,
    ) -> Result<(), StoreError> {
        self.pending
            .put(&mut txn.0, &key.serialize(), &info.serialize())?;
        Ok(())
    }

    pub fn pending_del(&self, txn: &mut WriteTransaction, key: &PendingKey) -> Result<(), StoreError> {
        self.pending.delete(&mut txn.0, &key.serialize())?;
        Ok(())
    }

    pub fn pending_count(&self, txn: &impl Readable) -> Result<u64, StoreError> {
        Ok(self.pending.len(txn.ro())?)
    }

    /// All pending entries destined for one account (prefix scan).
    pub fn pending_for_account<'t>(
        &self,
        txn: &'t impl Readable,
        destination: &Account,
    ) -> Result<impl Iterator<Item = Result<(PendingKey, PendingInfo), StoreError>> + 't, StoreError>
    {
        let prefix = *destination.as_bytes();
        let iter = self
            .pending
            .prefix_iter(txn.ro(), &prefix)?
            .map(|entry| {
                let (key, value) = entry?;
                Ok((PendingKey::deserialize(key)?, PendingInfo::deserialize(value)?))
            });
        Ok(iter)
    }

    /// Iterate every pending entry in key order.
    pub fn pending_iter<'t>(
        &self,
        txn: &'t impl Readable,
    ) -> Result<impl Iterator<Item = Result<(PendingKey, PendingInfo), StoreError>> + 't, StoreError>
    {
        let iter = self.pending.iter(txn.ro())?.map(|entry| {
            let (key, value) = entry?;
            Ok((PendingKey::deserialize(key)?, PendingInfo::deserialize(value)?))
        });
        Ok(iter)
    }
}
