//! Approval workflow for ledger entries.
//!
//! This module implements the approval state machine that decides whether a
//! mutation applies directly, is staged for approval, or is refused.
//!
//! # Modules
//!
//! - `types` - Approval states, actions and granted transitions
//! - `approval` - Actor identity and roles
//! - `error` - Workflow-specific error types
//! - `service` - State transition logic

pub mod approval;
pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use approval::{Actor, ActorRole};
pub use error::WorkflowError;
pub use service::{SupersedePolicy, WorkflowService};
pub use types::{ApprovalState, LedgerAction, Transition};
