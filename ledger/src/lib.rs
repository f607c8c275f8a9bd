//! The ledger: validation, application, and rollback of blocks.
//!
//! `Ledger::process` is the single entry point through which blocks reach
//! the store; it enforces conservation of value across per-account chains
//! linked by send/receive pairs. `Ledger::rollback` is its exact inverse,
//! used when consensus confirms a competing fork.

pub mod error;
pub mod genesis;
pub mod integrity;
pub mod ledger;
pub mod result;

pub use error::LedgerError;
pub use genesis::Genesis;
pub use integrity::{check_integrity, IntegrityReport};
pub use ledger::Ledger;
pub use result::{ProcessResult, ProcessReturn};
