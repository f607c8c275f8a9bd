//! Store errors.

use thiserror::Error;

/// Failures at the storage layer.
///
/// Corruption and version mismatches are fatal to node startup; the rest
/// surface to callers for context.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("lmdb error: {0}")]
    Lmdb(#[from] heed::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt record in table '{table}': {reason}")]
    Corrupt {
        table: &'static str,
        reason: String,
    },

    #[error("database schema version {0} is newer than this node supports")]
    VersionFromFuture(u32),
}

impl StoreError {
    pub(crate) fn corrupt(table: &'static str, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            table,
            reason: reason.into(),
        }
    }
}
