//! The accounts table: per-account head pointer and cached chain stats.

use crate::transaction::{Readable, WriteTransaction};
use crate::{Store, StoreError};
use vela_types::{Account, Amount, BlockHash};

/// Record size: head(32) + rep_block(32) + open_block(32) + balance(16) +
/// modified(8) + block_count(8).
pub const ACCOUNT_INFO_SIZE: usize = 128;

/// Latest information about an account chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountInfo {
    /// The chain's frontier block.
    pub head: BlockHash,
    /// Hash of the most recent block carrying a representative (the open, or
    /// the latest change).
    pub rep_block: BlockHash,
    /// Hash of the chain's first block.
    pub open_block: BlockHash,
    /// Balance after `head`.
    pub balance: Amount,
    /// Seconds since epoch of the last modification.
    pub modified: u64,
    /// Chain length.
    pub block_count: u64,
}

impl AccountInfo {
    pub fn serialize(&self) -> [u8; ACCOUNT_INFO_SIZE] {
        let mut out = [0u8; ACCOUNT_INFO_SIZE];
        out[0..32].copy_from_slice(self.head.as_bytes());
        out[32..64].copy_from_slice(self.rep_block.as_bytes());
        out[64..96].copy_from_slice(self.open_block.as_bytes());
        out[96..112].copy_from_slice(&self.balance.to_be_bytes());
        out[112..120].copy_from_slice(&self.modified.to_be_bytes());
        out[120..128].copy_from_slice(&self.block_count.to_be_bytes());
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() != ACCOUNT_INFO_SIZE {
            return Err(StoreError::corrupt(
                "accounts",
                format!("record is {} bytes, expected {ACCOUNT_INFO_SIZE}", bytes.len()),
            ));
        }
        let mut head = [0u8; 32];
        head.copy_from_slice(&bytes[0..32]);
        let mut rep_block = [0u8; 32];
        rep_block.copy_from_slice(&bytes[32..64]);
        let mut open_block = [0u8; 32];
        open_block.copy_from_slice(&bytes[64..96]);
        let mut balance = [0u8; 16];
        balance.copy_from_slice(&bytes[96..112]);
        let mut modified = [0u8; 8];
        modified.copy_from_slice(&bytes[112..120]);
        let mut block_count = [0u8; 8];
        block_count.copy_from_slice(&bytes[120..128]);
        Ok(Self {
            head: BlockHash::new(head),
            rep_block: BlockHash::new(rep_block),
            open_block: BlockHash::new(open_block),
            balance: Amount::from_be_bytes(balance),
            modified: u64::from_be_bytes(modified),
            block_count: u64::from_be_bytes(block_count),
        })
    }
}

impl Store {
    pub fn account_get(
        &self,
        txn: &impl Readable,
        account: &Account,
    ) -> Result<Option<AccountInfo>, StoreError> {
        match self.accounts.get(txn.ro(), account.as_bytes())? {
            Some(bytes) => Ok(Some(AccountInfo::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    pub fn account_exists(&self, txn: &impl Readable, account: &Account) -> Result<bool, StoreError> {
        Ok(self.accounts.get(txn.ro(), account.as_bytes())?.is_some())
    }

    pub fn account_put(
        &self,
        txn: &mut WriteTransaction,
        account: &Account,
        info: &AccountInfo,
    ) -> Result<(), StoreError> {
        self.accounts
            .put(&mut txn.0, account.as_bytes(), &info.serialize())?;
        Ok(())
    }

    pub fn account_del(&self, txn: &mut WriteTransaction, account: &Account) -> Result<(), StoreError> {
        self.accounts.delete(&mut txn.0, account.as_bytes())?;
        Ok(())
    }

    pub fn account_count(&self, txn: &impl Readable) -> Result<u64, StoreError> {
        Ok(self.accounts.len(txn.ro())?)
    }

    /// Iterate accounts in ascending key order, starting at `start`
    /// (inclusive).
    pub fn accounts_begin<'t>(
        &self,
        txn: &'t impl Readable,
        start: &Account,
    ) -> Result<impl Iterator<Item = Result<(Account, AccountInfo), StoreError>> + 't, StoreError>
    {
        let start_key = *start.as_bytes();
        let iter = self
            .accounts
            .range(
                txn.ro(),
                &(std::ops::Bound::Included(&start_key[..]), std::ops::Bound::Unbounded),
            )?
            .map(|entry| {
                let (key, value) = entry?;
                let mut account = [0u8; 32];
                account.copy_from_slice(key);
                Ok((Account::new(account), AccountInfo::deserialize(value)?))
            });
        Ok(iter)
    }

    /// Iterate all accounts in ascending key order.
    pub fn accounts_iter<'t>(
        &self,
        txn: &'t impl Readable,
    ) -> Result<impl Iterator<Item = Result<(Account, AccountInfo), StoreError>> + 't, StoreError>
    {
        self.accounts_begin(txn, &Account::ZERO)
    }
}
