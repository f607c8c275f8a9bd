//! Cryptographic primitives for the vela protocol.
//!
//! Hashing is Blake2b throughout. Signatures are Ed25519 with Blake2b-512 as
//! the internal hash (instead of SHA-512), matching the signing scheme used
//! on the wire and in the ledger.

pub mod address;
pub mod hash;
pub mod keys;
pub mod sign;

pub use address::{decode_account, encode_account, BadAddress};
pub use hash::{blake2b_256, blake2b_256_multi};
pub use keys::{deterministic_key, KeyPair};
pub use sign::{derive_public_key, sign_message, verify_message};
