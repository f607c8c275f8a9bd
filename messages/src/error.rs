//! Wire decoding errors.
//!
//! Each variant maps to a statistics counter; a malformed datagram is
//! dropped and counted, never fatal.

use thiserror::Error;
use vela_blocks::BlockError;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("message truncated: need {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("bad network magic {0:02X}{1:02X}")]
    BadMagic(u8, u8),

    #[error("unknown message type {0}")]
    UnknownType(u8),

    #[error("header names block type {0}, which is not a block variant")]
    UnknownBlockType(u8),

    #[error("block payload: {0}")]
    Block(#[from] BlockError),

    #[error("malformed vote payload: {0}")]
    BadVote(String),

    #[error("block work does not meet the network threshold")]
    InsufficientWork,
}

impl MessageError {
    /// The statistics counter this failure class increments.
    pub fn counter(&self) -> &'static str {
        match self {
            Self::Truncated { .. } => "malformed_message",
            Self::BadMagic(_, _) => "bad_network",
            Self::UnknownType(_) => "unknown_type",
            Self::UnknownBlockType(_) => "malformed_message",
            Self::Block(_) => "malformed_message",
            Self::BadVote(_) => "malformed_message",
            Self::InsufficientWork => "insufficient_work",
        }
    }
}
