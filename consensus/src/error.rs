//! Consensus errors.

use thiserror::Error;
use vela_ledger::LedgerError;
use vela_store::StoreError;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("malformed vote: {0}")]
    BadVote(String),
}
