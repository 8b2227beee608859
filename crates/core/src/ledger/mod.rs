//! Customer ledgers and running-balance maintenance.
//!
//! Every customer's approved entries form a balance chain ordered by
//! creation time. Each entry stores the running balance after it, so any
//! change to the chain recalculates every later entry.
//!
//! # Modules
//!
//! - `types` - Entries, records, inputs and summaries
//! - `error` - Ledger error types
//! - `validation` - Input validation
//! - `store` - Ledger store port
//! - `memory` - In-process store
//! - `balance` - Balance chain recalculation
//! - `locks` - Per-customer mutation locks
//! - `service` - Ledger service orchestrating mutations

pub mod balance;
pub mod error;
pub mod locks;
pub mod memory;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;

#[cfg(test)]
mod balance_props;

pub use balance::{
    CascadeOutcome, CascadePlan, CascadeStep, ChainViolation, balance_before, chain_violations,
    rebalance_from, recalculate_from,
};
pub use error::{LedgerError, ValidationError};
pub use locks::{CustomerLockGuard, CustomerLocks};
pub use memory::MemoryLedgerStore;
pub use service::LedgerService;
pub use store::LedgerStore;
pub use types::{
    AttachmentDisposition, AttachmentMerge, ChainCursor, CreateEntryInput, CustomerSummary,
    EditEntryInput, EntryFields, LedgerEntry, LedgerRecord, PendingCreation, ProposedEdit,
    TransactionKind, ValidatedCreate,
};
pub use validation::{validate_create, validate_edit};
