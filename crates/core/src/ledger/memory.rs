//! In-process [`LedgerStore`] used by tests and throwaway environments.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use ledgerbook_shared::types::{CustomerId, EntryId, SupplierId};
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::store::LedgerStore;
use super::types::{ChainCursor, LedgerEntry, LedgerRecord};

const UNLIMITED: usize = usize::MAX;

#[derive(Default)]
struct Tables {
    customers: HashSet<CustomerId>,
    suppliers: HashSet<SupplierId>,
    records: HashMap<EntryId, LedgerRecord>,
}

/// Ledger store keeping everything in a hash map.
pub struct MemoryLedgerStore {
    tables: RwLock<Tables>,
    /// Balance updates still allowed before injected failures start.
    balance_update_budget: AtomicUsize,
}

impl Default for MemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedgerStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            balance_update_budget: AtomicUsize::new(UNLIMITED),
        }
    }

    /// Register a customer.
    pub fn add_customer(&self, customer_id: CustomerId) -> Result<(), LedgerError> {
        self.write()?.customers.insert(customer_id);
        Ok(())
    }

    /// Register a supplier.
    pub fn add_supplier(&self, supplier_id: SupplierId) -> Result<(), LedgerError> {
        self.write()?.suppliers.insert(supplier_id);
        Ok(())
    }

    /// Make every balance update after the next `successes` fail.
    ///
    /// Used to exercise partial cascade recovery.
    #[cfg(test)]
    pub(crate) fn fail_balance_updates_after(&self, successes: usize) {
        self.balance_update_budget
            .store(successes, Ordering::SeqCst);
    }

    /// Stop injecting balance update failures.
    #[cfg(test)]
    pub(crate) fn heal(&self) {
        self.balance_update_budget
            .store(UNLIMITED, Ordering::SeqCst);
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, LedgerError> {
        self.tables
            .read()
            .map_err(|_| LedgerError::store("ledger store lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, LedgerError> {
        self.tables
            .write()
            .map_err(|_| LedgerError::store("ledger store lock poisoned"))
    }

    fn take_balance_update_budget(&self) -> bool {
        self.balance_update_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                UNLIMITED => Some(UNLIMITED),
                0 => None,
                n => Some(n - 1),
            })
            .is_ok()
    }

    fn chain_of(tables: &Tables, customer_id: CustomerId) -> Vec<LedgerEntry> {
        let mut chain: Vec<LedgerEntry> = tables
            .records
            .values()
            .filter(|r| r.customer_id() == customer_id && r.in_balance_chain())
            .map(|r| r.entry().clone())
            .collect();
        chain.sort_by_key(LedgerEntry::cursor);
        chain
    }
}

impl LedgerStore for MemoryLedgerStore {
    async fn get(&self, id: EntryId) -> Result<Option<LedgerRecord>, LedgerError> {
        Ok(self.read()?.records.get(&id).cloned())
    }

    async fn insert(&self, record: LedgerRecord) -> Result<(), LedgerError> {
        let mut tables = self.write()?;
        let id = record.id();
        if tables.records.contains_key(&id) {
            return Err(LedgerError::store(format!("duplicate entry id {id}")));
        }
        tables.records.insert(id, record);
        Ok(())
    }

    async fn update(&self, record: LedgerRecord) -> Result<(), LedgerError> {
        let mut tables = self.write()?;
        let slot = tables
            .records
            .get_mut(&record.id())
            .ok_or(LedgerError::EntryNotFound(record.id()))?;
        *slot = record;
        Ok(())
    }

    async fn update_balance(&self, id: EntryId, balance: Decimal) -> Result<(), LedgerError> {
        if !self.take_balance_update_budget() {
            return Err(LedgerError::store(format!(
                "injected failure updating balance of {id}"
            )));
        }

        let mut tables = self.write()?;
        let record = tables
            .records
            .get_mut(&id)
            .ok_or(LedgerError::EntryNotFound(id))?;
        record.entry_mut().balance = balance;
        Ok(())
    }

    async fn delete(&self, id: EntryId) -> Result<Option<LedgerRecord>, LedgerError> {
        Ok(self.write()?.records.remove(&id))
    }

    async fn find_later_entries(
        &self,
        customer_id: CustomerId,
        after: Option<ChainCursor>,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let tables = self.read()?;
        let chain = Self::chain_of(&tables, customer_id);
        Ok(match after {
            Some(cursor) => chain
                .into_iter()
                .filter(|e| e.cursor() > cursor)
                .collect(),
            None => chain,
        })
    }

    async fn find_prior_entry(
        &self,
        customer_id: CustomerId,
        before: ChainCursor,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        let tables = self.read()?;
        Ok(Self::chain_of(&tables, customer_id)
            .into_iter()
            .take_while(|e| e.cursor() < before)
            .last())
    }

    async fn list_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<LedgerRecord>, LedgerError> {
        let tables = self.read()?;
        let mut records: Vec<LedgerRecord> = tables
            .records
            .values()
            .filter(|r| r.customer_id() == customer_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.entry().cursor());
        Ok(records)
    }

    async fn list_pending(
        &self,
        customer_id: Option<CustomerId>,
    ) -> Result<Vec<LedgerRecord>, LedgerError> {
        let tables = self.read()?;
        let mut records: Vec<LedgerRecord> = tables
            .records
            .values()
            .filter(|r| r.approval_state().is_pending())
            .filter(|r| customer_id.is_none_or(|c| r.customer_id() == c))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.entry().cursor());
        Ok(records)
    }

    async fn customer_exists(&self, customer_id: CustomerId) -> Result<bool, LedgerError> {
        Ok(self.read()?.customers.contains(&customer_id))
    }

    async fn supplier_exists(&self, supplier_id: SupplierId) -> Result<bool, LedgerError> {
        Ok(self.read()?.suppliers.contains(&supplier_id))
    }
}
