//! Vote validation and generation against the persistent vote table.

use crate::vote::Vote;
use crate::ConsensusError;
use std::collections::HashMap;
use std::sync::Mutex;
use vela_blocks::Block;
use vela_store::{Store, WriteTransaction};
use vela_types::{Account, RawKey};
use std::sync::Arc;

/// Classification of an incoming vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteCode {
    /// Strictly newer than anything stored; now persisted.
    Vote,
    /// Not newer than the stored vote for this account.
    Replay,
    /// Signature did not verify.
    Invalid,
}

/// The classification plus the authoritative vote: the incoming one for
/// `Vote`/`Invalid`, the stored one for `Replay`.
#[derive(Clone, Debug)]
pub struct VoteResult {
    pub code: VoteCode,
    pub vote: Vote,
}

/// Enforces per-representative sequence monotonicity over the vote table,
/// with a write-through sequence cache for generation.
pub struct VoteProcessor {
    store: Arc<Store>,
    sequences: Mutex<HashMap<Account, u64>>,
}

impl VoteProcessor {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            sequences: Mutex::new(HashMap::new()),
        }
    }

    /// Validate one vote and persist it when it supersedes the stored one.
    pub fn validate(
        &self,
        txn: &mut WriteTransaction,
        vote: &Vote,
    ) -> Result<VoteResult, ConsensusError> {
        if !vote.verify() {
            return Ok(VoteResult {
                code: VoteCode::Invalid,
                vote: vote.clone(),
            });
        }
        if let Some(stored_bytes) = self.store.vote_get(txn, &vote.account)? {
            let stored = Vote::deserialize(&stored_bytes)?;
            if stored.sequence >= vote.sequence {
                return Ok(VoteResult {
                    code: VoteCode::Replay,
                    vote: stored,
                });
            }
        }
        self.store.vote_put(txn, &vote.account, &vote.serialize())?;
        self.sequences
            .lock()
            .unwrap()
            .insert(vote.account, vote.sequence);
        Ok(VoteResult {
            code: VoteCode::Vote,
            vote: vote.clone(),
        })
    }

    /// Produce and persist this node's next vote for `block`.
    pub fn generate(
        &self,
        txn: &mut WriteTransaction,
        account: Account,
        prv: &RawKey,
        block: Block,
    ) -> Result<Vote, ConsensusError> {
        let cached = self.sequences.lock().unwrap().get(&account).copied();
        let current = match cached {
            Some(sequence) => sequence,
            None => match self.store.vote_get(txn, &account)? {
                Some(bytes) => Vote::deserialize(&bytes)?.sequence,
                None => 0,
            },
        };
        let vote = Vote::new(account, prv, current + 1, block);
        self.store.vote_put(txn, &account, &vote.serialize())?;
        self.sequences.lock().unwrap().insert(account, vote.sequence);
        Ok(vote)
    }
}
