//! Block proof-of-work.
//!
//! Every block carries a 64-bit nonce. A block is acceptable when
//! `Blake2b-64(nonce_le ‖ root)` is at least the network threshold. Work is
//! an anti-spam gate, not a consensus mechanism; thresholds live on
//! [`vela_types::Network`]. Production nonce generation is external
//! (CPU/GPU backends); the searcher here serves tests and the dev CLI.

pub mod difficulty;
pub mod generator;
pub mod validator;

pub use difficulty::{from_multiplier, to_multiplier};
pub use generator::generate_work;
pub use validator::{validate_work, work_value};
