//! Block codec errors.

use thiserror::Error;

/// Failure to decode a block from its binary or JSON form.
#[derive(Debug, Error)]
pub enum BlockError {
    #[error("block payload truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("unknown block type byte {0}")]
    UnknownType(u8),

    #[error("malformed block JSON: {0}")]
    BadJson(String),
}
