//! Transaction handles.
//!
//! Thin wrappers over heed's `RoTxn`/`RwTxn` so the rest of the workspace
//! never names heed types. Iterators and borrowed reads are bound to the
//! transaction's lifetime; a transaction is released when dropped, and a
//! write transaction persists nothing unless [`WriteTransaction::commit`]
//! is called.

use crate::StoreError;
use heed::{RoTxn, RwTxn};

/// Anything a read can run against: a read transaction, or a write
/// transaction observing its own uncommitted state.
pub trait Readable {
    fn ro(&self) -> &RoTxn<'_>;
}

/// A snapshot-isolated read transaction.
pub struct ReadTransaction<'env>(pub(crate) RoTxn<'env>);

/// The single write transaction; readers are unaffected while it is open.
pub struct WriteTransaction<'env>(pub(crate) RwTxn<'env>);

impl Readable for ReadTransaction<'_> {
    fn ro(&self) -> &RoTxn<'_> {
        &self.0
    }
}

impl Readable for WriteTransaction<'_> {
    fn ro(&self) -> &RoTxn<'_> {
        &self.0
    }
}

impl WriteTransaction<'_> {
    /// Atomically publish every write made under this transaction.
    pub fn commit(self) -> Result<(), StoreError> {
        self.0.commit().map_err(Into::into)
    }

    /// Discard all writes. Dropping has the same effect; this form reads
    /// better at call sites that abort deliberately.
    pub fn abort(self) {}
}
