//! A single election: one contested fork root.

use crate::vote::Vote;
use crate::votes::{TallyResult, Votes};
use crate::ConsensusError;
use std::time::Instant;
use vela_blocks::Block;
use vela_ledger::Ledger;
use vela_store::Readable;
use vela_types::Amount;

/// Announcement rounds without a winner change after which the provisional
/// winner is confirmed even without full quorum.
pub const CONTESTED_CUTOFF: u32 = 4;

/// State for one active fork root.
pub struct Election {
    pub votes: Votes,
    /// The current best block for this root.
    pub last_winner: Block,
    /// When the last vote arrived.
    pub last_vote: Instant,
    /// Announcement rounds since the winner last changed.
    pub announcements: u32,
    pub confirmed: bool,
}

impl Election {
    /// Start an election with `block` as the presumptive winner.
    pub fn new(block: Block) -> Self {
        Self {
            votes: Votes::new(&block),
            last_winner: block,
            last_vote: Instant::now(),
            announcements: 0,
            confirmed: false,
        }
    }

    /// Fold in one vote and re-run the weighted tally.
    pub fn vote(
        &mut self,
        ledger: &Ledger,
        txn: &impl Readable,
        vote: &Vote,
        quorum: Amount,
    ) -> Result<TallyResult, ConsensusError> {
        if self.confirmed {
            return Ok(TallyResult::Vote);
        }
        if !self.votes.vote(vote) {
            return Ok(TallyResult::Vote);
        }
        self.last_vote = Instant::now();
        self.tally(ledger, txn, quorum)
    }

    /// Recompute the provisional winner and check quorum.
    pub fn tally(
        &mut self,
        ledger: &Ledger,
        txn: &impl Readable,
        quorum: Amount,
    ) -> Result<TallyResult, ConsensusError> {
        let Some((weight, winner)) = ledger.winner(txn, &self.votes.rep_votes)? else {
            return Ok(TallyResult::Vote);
        };
        let changed = winner.hash() != self.last_winner.hash();
        if changed {
            self.last_winner = winner;
            self.announcements = 0;
        }
        if weight >= quorum {
            self.confirmed = true;
            return Ok(TallyResult::Confirm);
        }
        Ok(if changed {
            TallyResult::Changed
        } else {
            TallyResult::Vote
        })
    }

    /// Count one announcement round. Returns `true` when the election has
    /// gone unchallenged long enough to confirm without quorum.
    pub fn announce(&mut self) -> bool {
        if self.confirmed {
            return false;
        }
        self.announcements += 1;
        if self.announcements >= CONTESTED_CUTOFF {
            self.confirmed = true;
            return true;
        }
        false
    }
}
