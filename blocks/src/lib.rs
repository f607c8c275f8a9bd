//! The block model.
//!
//! Every account owns an independent hash-chain built from four block
//! variants: `open` starts a chain, `send` moves value out, `receive` claims
//! a pending send, and `change` rotates the consensus representative. Blocks
//! are immutable once constructed; the ledger links them through stored
//! successor slots, never by mutating the block itself.

pub mod block;
pub mod change;
pub mod error;
pub mod open;
pub mod receive;
pub mod send;

pub use block::{Block, BlockType};
pub use change::ChangeBlock;
pub use error::BlockError;
pub use open::OpenBlock;
pub use receive::ReceiveBlock;
pub use send::SendBlock;
