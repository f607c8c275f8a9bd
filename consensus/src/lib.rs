//! Consensus: weighted voting over conflicting forks.
//!
//! Representatives vote on blocks; each fork root gets at most one active
//! election, which tallies the latest vote per representative weighted by
//! the ledger. A winner past quorum (or uncontested through enough
//! announcement rounds) is confirmed, the losing chain segment is rolled
//! back, and the election retires.

pub mod active;
pub mod election;
pub mod error;
pub mod gap_cache;
pub mod vote;
pub mod vote_processor;
pub mod votes;

pub use active::{ActiveElections, AnnounceRound};
pub use election::Election;
pub use error::ConsensusError;
pub use gap_cache::GapCache;
pub use vote::Vote;
pub use vote_processor::{VoteCode, VoteProcessor, VoteResult};
pub use votes::{TallyResult, Votes};
