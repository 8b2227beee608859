//! Per-customer serialization of ledger mutations.

use std::sync::Arc;

use dashmap::DashMap;
use ledgerbook_shared::types::CustomerId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per customer.
///
/// Holding a customer's guard excludes every other mutation of that
/// customer's ledger, so cascades never interleave. Different customers
/// proceed in parallel. A customer's mutex is dropped from the table once
/// nobody holds or waits for it.
#[derive(Default)]
pub struct CustomerLocks {
    locks: DashMap<CustomerId, Arc<Mutex<()>>>,
}

/// Exclusive access to one customer's ledger, released on drop.
#[must_use = "the customer is unlocked as soon as the guard is dropped"]
pub struct CustomerLockGuard<'a> {
    locks: &'a DashMap<CustomerId, Arc<Mutex<()>>>,
    customer_id: CustomerId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl CustomerLocks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a customer's ledger.
    pub async fn acquire(&self, customer_id: CustomerId) -> CustomerLockGuard<'_> {
        // Clone the Arc out so the shard lock is released before awaiting.
        let lock = self.locks.entry(customer_id).or_default().clone();
        let guard = lock.lock_owned().await;
        CustomerLockGuard {
            locks: &self.locks,
            customer_id,
            guard: Some(guard),
        }
    }

    /// Number of customers currently locked or awaited.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Returns true if no customer is locked or awaited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for CustomerLockGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters hold their own clone, and `acquire` clones under the shard
        // lock, so a count of one means the table holds the only reference.
        self.locks
            .remove_if(&self.customer_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
