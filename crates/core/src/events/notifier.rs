//! Change events and the ports that consume them.

use ledgerbook_shared::types::{CustomerId, EntryId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::workflow::ApprovalState;

/// Kind of change a committed mutation made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// A record was created.
    Created,
    /// A record was changed.
    Updated,
    /// A record was removed.
    Deleted,
}

/// A committed change to one ledger record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// What happened.
    pub change: ChangeKind,
    /// The record.
    pub entry_id: EntryId,
    /// The record's customer.
    pub customer_id: CustomerId,
    /// Approval state after the change, `None` once removed.
    pub state: Option<ApprovalState>,
}

impl LedgerEvent {
    /// A record was created in `state`.
    #[must_use]
    pub fn created(entry_id: EntryId, customer_id: CustomerId, state: ApprovalState) -> Self {
        Self {
            change: ChangeKind::Created,
            entry_id,
            customer_id,
            state: Some(state),
        }
    }

    /// A record now in `state` was changed.
    #[must_use]
    pub fn updated(entry_id: EntryId, customer_id: CustomerId, state: ApprovalState) -> Self {
        Self {
            change: ChangeKind::Updated,
            entry_id,
            customer_id,
            state: Some(state),
        }
    }

    /// A record was removed.
    #[must_use]
    pub fn deleted(entry_id: EntryId, customer_id: CustomerId) -> Self {
        Self {
            change: ChangeKind::Deleted,
            entry_id,
            customer_id,
            state: None,
        }
    }
}

/// Receives change events for push delivery.
pub trait ChangeNotifier: Send + Sync {
    /// Publish an event. Must not block.
    fn notify(&self, event: LedgerEvent);
}

/// Receives "ledger changed for customer X" signals.
pub trait CacheInvalidator: Send + Sync {
    /// Drop anything precomputed for the customer.
    fn ledger_changed(&self, customer_id: CustomerId);
}

/// Notifier that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn notify(&self, _event: LedgerEvent) {}
}

/// Fans events out to every subscriber over a `tokio` broadcast channel.
///
/// Slow subscribers miss events rather than slowing down mutations.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<LedgerEvent>,
}

impl BroadcastNotifier {
    /// Create a notifier buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn notify(&self, event: LedgerEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("No subscribers for ledger event");
        }
    }
}
