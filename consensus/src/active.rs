//! The active election set: one election per contested root.

use crate::election::Election;
use crate::vote::Vote;
use crate::votes::TallyResult;
use crate::ConsensusError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use vela_blocks::Block;
use vela_ledger::{Ledger, ProcessResult};
use vela_types::{Amount, BlockHash, GENESIS_AMOUNT};

/// How many elections are announced per round, lowest root hash first.
const ANNOUNCE_BATCH: usize = 32;

/// Default quorum floor so single-node test networks make progress: a small
/// fraction of the genesis supply.
pub fn default_minimum_weight() -> Amount {
    Amount::new(GENESIS_AMOUNT.raw() >> 20)
}

type ConfirmCallback = Box<dyn FnOnce(Block) + Send>;

struct Entry {
    election: Election,
    on_confirm: Option<ConfirmCallback>,
}

/// The result of one announcement round.
pub struct AnnounceRound {
    /// Winners to rebroadcast as confirm_req.
    pub announce: Vec<Block>,
    /// Winners confirmed this round (by the unchallenged-rounds rule).
    pub confirmed: Vec<Block>,
}

/// All ongoing elections, guarded by one mutex. Ledger side effects and
/// confirmation callbacks run with the mutex released.
pub struct ActiveElections {
    ledger: Arc<Ledger>,
    roots: Mutex<HashMap<BlockHash, Entry>>,
    online_weight: Mutex<Amount>,
    minimum_weight: Amount,
}

impl ActiveElections {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self::with_minimum_weight(ledger, default_minimum_weight())
    }

    pub fn with_minimum_weight(ledger: Arc<Ledger>, minimum_weight: Amount) -> Self {
        Self {
            ledger,
            roots: Mutex::new(HashMap::new()),
            online_weight: Mutex::new(Amount::ZERO),
            minimum_weight,
        }
    }

    pub fn set_online_weight(&self, weight: Amount) {
        *self.online_weight.lock().unwrap() = weight;
    }

    /// `max(online_weight / 2 + 1, minimum_weight)`.
    pub fn quorum(&self) -> Amount {
        let online = *self.online_weight.lock().unwrap();
        let majority = Amount::new(online.raw() / 2).saturating_add(Amount::new(1));
        majority.max(self.minimum_weight)
    }

    /// Register an election for `block`'s root. Returns `false` when one
    /// already exists.
    pub fn start(&self, block: Block, on_confirm: impl FnOnce(Block) + Send + 'static) -> bool {
        let root = block.root();
        let mut roots = self.roots.lock().unwrap();
        if roots.contains_key(&root) {
            return false;
        }
        tracing::info!(%root, winner = %block.hash(), "election started");
        roots.insert(
            root,
            Entry {
                election: Election::new(block),
                on_confirm: Some(Box::new(on_confirm)),
            },
        );
        true
    }

    pub fn active(&self, root: &BlockHash) -> bool {
        self.roots.lock().unwrap().contains_key(root)
    }

    pub fn len(&self) -> usize {
        self.roots.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Route a vote to its election. Returns the winner when this vote
    /// confirmed the election.
    pub fn vote(&self, vote: &Vote) -> Result<Option<Block>, ConsensusError> {
        let root = vote.block.root();
        let quorum = self.quorum();
        let confirmed_entry = {
            let mut roots = self.roots.lock().unwrap();
            let Some(entry) = roots.get_mut(&root) else {
                return Ok(None);
            };
            let txn = self.ledger.store.begin_read()?;
            match entry.election.vote(&self.ledger, &txn, vote, quorum)? {
                TallyResult::Confirm => roots.remove(&root),
                TallyResult::Changed | TallyResult::Vote => None,
            }
        };
        match confirmed_entry {
            Some(entry) => {
                let winner = entry.election.last_winner.clone();
                self.apply_confirmation(entry)?;
                Ok(Some(winner))
            }
            None => Ok(None),
        }
    }

    /// One timer-driven announcement round over the lowest-rooted elections.
    pub fn announce_round(&self) -> Result<AnnounceRound, ConsensusError> {
        let (announce, done) = {
            let mut roots = self.roots.lock().unwrap();
            let mut keys: Vec<BlockHash> = roots.keys().copied().collect();
            keys.sort();
            keys.truncate(ANNOUNCE_BATCH);

            let mut announce = Vec::new();
            let mut done = Vec::new();
            for key in keys {
                let Some(entry) = roots.get_mut(&key) else {
                    continue;
                };
                if entry.election.announce() {
                    if let Some(entry) = roots.remove(&key) {
                        done.push(entry);
                    }
                } else {
                    announce.push(entry.election.last_winner.clone());
                }
            }
            (announce, done)
        };

        let mut confirmed = Vec::with_capacity(done.len());
        for entry in done {
            let winner = entry.election.last_winner.clone();
            self.apply_confirmation(entry)?;
            confirmed.push(winner);
        }
        Ok(AnnounceRound { announce, confirmed })
    }

    /// Make the ledger agree with a confirmed winner, then notify.
    fn apply_confirmation(&self, mut entry: Entry) -> Result<(), ConsensusError> {
        let winner = entry.election.last_winner.clone();
        let root = entry.election.votes.id;

        let mut txn = self.ledger.store.begin_write()?;
        match self.ledger.block_at_root(&txn, &root)? {
            Some(existing) if existing.hash() == winner.hash() => {
                txn.abort();
            }
            Some(existing) => {
                let losing = existing.hash();
                tracing::info!(%root, winner = %winner.hash(), %losing, "fork resolved against ledger");
                self.ledger.rollback(&mut txn, &losing)?;
                let outcome = self.ledger.process(&mut txn, &winner)?;
                if outcome.code != ProcessResult::Progress {
                    tracing::warn!(code = ?outcome.code, "confirmed winner did not apply");
                }
                txn.commit()?;
            }
            None => {
                let outcome = self.ledger.process(&mut txn, &winner)?;
                if outcome.code != ProcessResult::Progress {
                    tracing::debug!(code = ?outcome.code, "confirmed winner not applicable");
                }
                txn.commit()?;
            }
        }

        if let Some(callback) = entry.on_confirm.take() {
            callback(winner);
        }
        Ok(())
    }
}
