//! Per-index transaction ownership
//!
//! A transaction belongs to the thread that opened it. Other threads that
//! begin a transaction or write to the same index wait on the index's condvar
//! until the owner commits or rolls back.

use parking_lot::{Condvar, MutexGuard};
use std::thread::{self, ThreadId};

use super::ports::IndexError;

#[derive(Debug, Default)]
pub(crate) struct TransactionOwner(Option<ThreadId>);

impl TransactionOwner {
    /// Open and owned by the calling thread
    pub fn is_mine(&self) -> bool {
        self.0 == Some(thread::current().id())
    }

    fn held_elsewhere(&self) -> bool {
        self.0.is_some() && !self.is_mine()
    }

    /// Claim the transaction for the calling thread, which must already hold its turn
    pub fn claim(&mut self, index: &str) -> Result<(), IndexError> {
        if self.is_mine() {
            return Err(IndexError::InvalidInput(format!(
                "This thread already has a transaction open on {}",
                index
            )));
        }
        self.0 = Some(thread::current().id());
        Ok(())
    }

    /// Give the transaction up; only its owner may
    pub fn release(&mut self, index: &str) -> Result<(), IndexError> {
        if !self.is_mine() {
            return Err(IndexError::InvalidInput(format!(
                "No transaction open on {} for this thread",
                index
            )));
        }
        self.0 = None;
        Ok(())
    }
}

/// Block until no other thread owns the transaction of the guarded state
pub(crate) fn wait_turn<T>(
    guard: &mut MutexGuard<'_, T>,
    released: &Condvar,
    owner: impl Fn(&T) -> &TransactionOwner,
) {
    while owner(&**guard).held_elsewhere() {
        released.wait(guard);
    }
}
