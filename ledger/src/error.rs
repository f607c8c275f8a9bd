//! Ledger errors.
//!
//! Note the split: expected per-block outcomes are [`crate::ProcessResult`]
//! values returned in `Ok`; this error type covers store failures and
//! internal inconsistencies only.

use thiserror::Error;
use vela_store::StoreError;
use vela_types::BlockHash;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("block {0} missing while walking a chain")]
    MissingBlock(BlockHash),

    #[error("genesis is absent from the store")]
    MissingGenesis,

    #[error("ledger inconsistency: {0}")]
    Inconsistent(String),
}
