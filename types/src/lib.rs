//! Fundamental types for the vela protocol.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: accounts, block hashes, amounts, keys, timestamps, and the
//! per-network parameter presets.

pub mod account;
pub mod amount;
pub mod hash;
pub mod keys;
pub mod network;
pub mod time;

pub use account::Account;
pub use amount::{Amount, GENESIS_AMOUNT};
pub use hash::{BlockHash, ParseHashError};
pub use keys::{RawKey, Signature};
pub use network::Network;
pub use time::Timestamp;
