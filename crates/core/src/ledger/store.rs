//! Ledger Entry Store port.

use std::future::Future;

use ledgerbook_shared::types::{CustomerId, EntryId, SupplierId};
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::{ChainCursor, LedgerEntry, LedgerRecord};

/// Repository trait for ledger persistence.
///
/// Implemented by the db crate on PostgreSQL and by [`super::MemoryLedgerStore`].
/// Balances are computed by the caller; the store never derives them.
///
/// Chain queries (`find_later_entries`, `find_prior_entry`) only return entries
/// whose state participates in the balance chain, ordered by [`ChainCursor`].
pub trait LedgerStore: Send + Sync {
    /// Find a record by ID.
    fn get(
        &self,
        id: EntryId,
    ) -> impl Future<Output = Result<Option<LedgerRecord>, LedgerError>> + Send;

    /// Insert a new record.
    fn insert(&self, record: LedgerRecord)
    -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// Replace an existing record.
    ///
    /// Fails with `EntryNotFound` if the record does not exist.
    fn update(&self, record: LedgerRecord)
    -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// Overwrite the stored balance of an entry.
    fn update_balance(
        &self,
        id: EntryId,
        balance: Decimal,
    ) -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// Remove a record, returning it if it existed.
    ///
    /// Attachment files are not touched; the caller owns their cleanup.
    fn delete(
        &self,
        id: EntryId,
    ) -> impl Future<Output = Result<Option<LedgerRecord>, LedgerError>> + Send;

    /// Chain entries strictly after `after`, ascending. `None` means from the start.
    fn find_later_entries(
        &self,
        customer_id: CustomerId,
        after: Option<ChainCursor>,
    ) -> impl Future<Output = Result<Vec<LedgerEntry>, LedgerError>> + Send;

    /// The chain entry immediately before `before`, if any.
    fn find_prior_entry(
        &self,
        customer_id: CustomerId,
        before: ChainCursor,
    ) -> impl Future<Output = Result<Option<LedgerEntry>, LedgerError>> + Send;

    /// Every record of a customer, in chain order, pending creations included.
    fn list_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> impl Future<Output = Result<Vec<LedgerRecord>, LedgerError>> + Send;

    /// Records awaiting approval, oldest first, optionally for one customer.
    fn list_pending(
        &self,
        customer_id: Option<CustomerId>,
    ) -> impl Future<Output = Result<Vec<LedgerRecord>, LedgerError>> + Send;

    /// Check if a customer exists.
    fn customer_exists(
        &self,
        customer_id: CustomerId,
    ) -> impl Future<Output = Result<bool, LedgerError>> + Send;

    /// Check if a supplier exists.
    fn supplier_exists(
        &self,
        supplier_id: SupplierId,
    ) -> impl Future<Output = Result<bool, LedgerError>> + Send;
}
