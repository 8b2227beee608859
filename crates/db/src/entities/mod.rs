//! `SeaORM` entities.

pub mod customers;
pub mod ledger_entries;
pub mod suppliers;
