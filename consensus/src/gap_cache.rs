//! Short-term memory of blocks whose predecessor is unknown.
//!
//! When enough voting weight endorses a block we cannot yet connect, the
//! missing history is worth fetching: the cache reports the threshold
//! crossing so the node can aim a bootstrap at the peers that voted.

use crate::vote::Vote;
use crate::votes::Votes;
use crate::ConsensusError;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use vela_blocks::Block;
use vela_ledger::Ledger;
use vela_types::{Amount, BlockHash};

/// Bounded number of remembered gap blocks.
const MAX_ENTRIES: usize = 256;

/// Entries older than this are dropped by `purge_old`.
const MAX_AGE: Duration = Duration::from_secs(10);

/// Fraction of online supply (as a divisor) that triggers a bootstrap.
const BOOTSTRAP_FRACTION: u128 = 16;

struct GapInformation {
    arrival: Instant,
    hash: BlockHash,
    votes: Votes,
}

/// Arrival-ordered cache of gap blocks, unique per block hash.
pub struct GapCache {
    entries: Mutex<VecDeque<GapInformation>>,
}

impl Default for GapCache {
    fn default() -> Self {
        Self::new()
    }
}

impl GapCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Remember a block that arrived without its predecessor. The oldest
    /// entry is evicted on overflow.
    pub fn add(&self, block: &Block) {
        let hash = block.hash();
        let mut entries = self.entries.lock().unwrap();
        if entries.iter().any(|entry| entry.hash == hash) {
            return;
        }
        if entries.len() >= MAX_ENTRIES {
            entries.pop_front();
        }
        entries.push_back(GapInformation {
            arrival: Instant::now(),
            hash,
            votes: Votes::new(block),
        });
    }

    /// Tally a vote against a remembered gap block. Returns the block hash
    /// once the accumulated weight crosses the bootstrap threshold.
    pub fn vote(
        &self,
        ledger: &Ledger,
        online_weight: Amount,
        vote: &Vote,
    ) -> Result<Option<BlockHash>, ConsensusError> {
        let voted_hash = vote.block.hash();
        let mut entries = self.entries.lock().unwrap();
        let Some(entry) = entries.iter_mut().find(|entry| entry.hash == voted_hash) else {
            return Ok(None);
        };
        if !entry.votes.vote(vote) {
            return Ok(None);
        }
        let txn = ledger.store.begin_read()?;
        let threshold = bootstrap_threshold(online_weight);
        match ledger.winner(&txn, &entry.votes.rep_votes)? {
            Some((weight, _)) if weight >= threshold && !threshold.is_zero() => {
                tracing::info!(block = %entry.hash, %weight, "gap block crossed bootstrap threshold");
                Ok(Some(entry.hash))
            }
            _ => Ok(None),
        }
    }

    /// Drop entries older than the retention window.
    pub fn purge_old(&self) {
        let cutoff = Instant::now() - MAX_AGE;
        let mut entries = self.entries.lock().unwrap();
        while entries
            .front()
            .map(|entry| entry.arrival < cutoff)
            .unwrap_or(false)
        {
            entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn bootstrap_threshold(online_weight: Amount) -> Amount {
    Amount::new(online_weight.raw() / BOOTSTRAP_FRACTION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;
    use vela_blocks::SendBlock;
    use vela_crypto::KeyPair;
    use vela_ledger::Genesis;
    use vela_store::Store;
    use vela_types::{Account, Network, RawKey};

    fn send(kp: &KeyPair, previous: u8) -> Block {
        Block::Send(SendBlock::new(
            BlockHash::new([previous; 32]),
            Account::new([1; 32]),
            Amount::new(1),
            &kp.private,
            &kp.public,
            0,
        ))
    }

    #[test]
    fn capacity_evicts_oldest() {
        let cache = GapCache::new();
        let kp = KeyPair::from_private(RawKey::new([90u8; 32]));
        for n in 0..=MAX_ENTRIES {
            cache.add(&send(&kp, n as u8));
        }
        assert_eq!(cache.len(), MAX_ENTRIES);
    }

    #[test]
    fn duplicate_blocks_not_recorded_twice() {
        let cache = GapCache::new();
        let kp = KeyPair::from_private(RawKey::new([91u8; 32]));
        let block = send(&kp, 1);
        cache.add(&block);
        cache.add(&block);
        assert_eq!(cache.len(), 1);
    }

    /// A genesis-weight vote for a remembered gap block crosses the 1/16
    /// online-supply threshold.
    #[test]
    fn heavy_vote_triggers_bootstrap_signal() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());
        let ledger = Ledger::new(store.clone(), Network::Test);
        let genesis = Genesis::new(Network::Test);
        let genesis_keys = KeyPair::from_private(Network::Test.genesis_key());
        let mut txn = store.begin_write().unwrap();
        genesis.initialize(&store, &mut txn).unwrap();
        txn.commit().unwrap();

        let cache = GapCache::new();
        let gap_block = send(&genesis_keys, 0x77);
        cache.add(&gap_block);

        let vote = Vote::new(genesis_keys.public, &genesis_keys.private, 1, gap_block.clone());
        let online = Amount::new(1 << 30);
        let triggered = cache.vote(&ledger, online, &vote).unwrap();
        assert_eq!(triggered, Some(gap_block.hash()));
    }

    #[test]
    fn vote_for_unknown_block_is_ignored() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());
        let ledger = Ledger::new(store.clone(), Network::Test);
        let kp = KeyPair::from_private(RawKey::new([92u8; 32]));

        let cache = GapCache::new();
        let vote = Vote::new(kp.public, &kp.private, 1, send(&kp, 5));
        assert_eq!(cache.vote(&ledger, Amount::new(100), &vote).unwrap(), None);
    }
}
