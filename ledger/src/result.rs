//! Per-block processing outcomes.

use vela_types::{Account, Amount};

/// The verdict for one processed block. These are expected outcomes, not
/// errors: every inbound block lands on exactly one of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessResult {
    /// Accepted and applied.
    Progress,
    /// Ed25519 verification failed over the block hash.
    BadSignature,
    /// Hash already present in the store.
    Old,
    /// A send's new balance exceeds the prior balance.
    NegativeSpend,
    /// Another block already references the same root.
    Fork,
    /// Source send missing from pending (absent or already consumed).
    Unreceivable,
    /// `previous` is not in the store.
    GapPrevious,
    /// The referenced send is not in the store.
    GapSource,
    /// A receive/open names a source that is not a send.
    NotReceiveFromSend,
    /// An open's account does not match the send's destination.
    AccountMismatch,
    /// An attempt to open the all-zero account.
    OpenedBurnAccount,
}

/// `ProcessResult` plus the context callers need without re-deriving it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessReturn {
    pub code: ProcessResult,
    /// The account the block belongs to (when it could be determined).
    pub account: Account,
    /// The amount moved by the block (zero for change).
    pub amount: Amount,
    /// For sends, the destination whose pending set gained an entry.
    pub pending_account: Account,
}

impl ProcessReturn {
    pub fn code(code: ProcessResult) -> Self {
        Self {
            code,
            account: Account::ZERO,
            amount: Amount::ZERO,
            pending_account: Account::ZERO,
        }
    }
}
