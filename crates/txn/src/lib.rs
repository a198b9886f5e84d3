//! Transactional layer over the entity store.
//!
//! Wraps a [`cellspace_kernel::Store`] so that every batch of writes runs as
//! an atomic transaction: on success the caller gets replayable redo and
//! undo logs plus change sets; on failure the store is rolled back to its
//! pre-transaction state and the error propagates.

mod ops;
mod transaction;

pub use ops::WriteOp;
pub use transaction::{Transaction, TransactionResult, TransactionStore};
