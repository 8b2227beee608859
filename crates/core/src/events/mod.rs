//! Change notification and cache invalidation.
//!
//! The ledger service emits a [`LedgerEvent`] and a "ledger changed" signal
//! after every committed mutation. Delivery and fan-out belong to whoever
//! implements the ports.

mod cache;
mod notifier;

pub use cache::SummaryCache;
pub use notifier::{
    BroadcastNotifier, CacheInvalidator, ChangeKind, ChangeNotifier, LedgerEvent, NoopNotifier,
};
