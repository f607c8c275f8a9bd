//! The per-root vote set: latest block observed from each representative.

use crate::vote::Vote;
use std::collections::HashMap;
use vela_blocks::Block;
use vela_types::{Account, BlockHash};

/// Outcome of folding one vote into an election's tally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TallyResult {
    /// Recorded; the winner is unchanged and quorum is not reached.
    Vote,
    /// The provisional winner changed.
    Changed,
    /// The winner's weight passed the quorum threshold.
    Confirm,
}

/// All votes received for one fork root.
#[derive(Clone, Debug)]
pub struct Votes {
    /// Root block hash of the fork.
    pub id: BlockHash,
    /// Latest block each representative voted for.
    pub rep_votes: HashMap<Account, Block>,
}

impl Votes {
    pub fn new(block: &Block) -> Self {
        Self {
            id: block.root(),
            rep_votes: HashMap::new(),
        }
    }

    /// Record a vote. Returns `false` when the vote is for another root or
    /// repeats the representative's current choice.
    pub fn vote(&mut self, vote: &Vote) -> bool {
        if vote.block.root() != self.id {
            return false;
        }
        match self.rep_votes.get(&vote.account) {
            Some(existing) if *existing == vote.block => false,
            _ => {
                self.rep_votes.insert(vote.account, vote.block.clone());
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_blocks::SendBlock;
    use vela_crypto::KeyPair;
    use vela_types::{Amount, RawKey};

    fn send(kp: &KeyPair, balance: u128) -> Block {
        Block::Send(SendBlock::new(
            BlockHash::new([5; 32]),
            Account::new([6; 32]),
            Amount::new(balance),
            &kp.private,
            &kp.public,
            0,
        ))
    }

    #[test]
    fn vote_for_wrong_root_ignored() {
        let kp = KeyPair::from_private(RawKey::new([30u8; 32]));
        let a = send(&kp, 10);
        let mut votes = Votes::new(&a);

        let other_root = Block::Send(SendBlock::new(
            BlockHash::new([9; 32]),
            Account::new([6; 32]),
            Amount::new(10),
            &kp.private,
            &kp.public,
            0,
        ));
        let vote = Vote::new(kp.public, &kp.private, 1, other_root);
        assert!(!votes.vote(&vote));
        assert!(votes.rep_votes.is_empty());
    }

    #[test]
    fn re_vote_replaces_block() {
        let kp = KeyPair::from_private(RawKey::new([31u8; 32]));
        let a = send(&kp, 10);
        let b = send(&kp, 20);
        let mut votes = Votes::new(&a);

        assert!(votes.vote(&Vote::new(kp.public, &kp.private, 1, a.clone())));
        // Same block again: no change.
        assert!(!votes.vote(&Vote::new(kp.public, &kp.private, 2, a)));
        // Switch to the competitor.
        assert!(votes.vote(&Vote::new(kp.public, &kp.private, 3, b.clone())));
        assert_eq!(votes.rep_votes.len(), 1);
        assert_eq!(votes.rep_votes.values().next().unwrap(), &b);
    }
}
