//! Core business logic for Ledgerbook.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Persistence, file storage, caching and change notification are reached
//! through ports that other crates implement.
//!
//! # Modules
//!
//! - `ledger` - Ledger entries, running-balance recalculation and the ledger service
//! - `workflow` - Approval state machine for creations and edits
//! - `staging` - Pending creations and proposed edits awaiting approval
//! - `attachment` - Attachment file storage
//! - `events` - Change notification and cache invalidation

pub mod attachment;
pub mod events;
pub mod ledger;
pub mod staging;
pub mod workflow;
