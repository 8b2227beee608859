//! Workflow error types for the approval lifecycle.

use ledgerbook_shared::types::EntryId;
use thiserror::Error;

use crate::workflow::approval::ActorRole;
use crate::workflow::types::{ApprovalState, LedgerAction};

/// Errors raised when a requested transition is not allowed.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The action is not legal in the entry's current state.
    #[error("Cannot {action} an entry in state {state}")]
    InvalidTransition {
        /// The entry's current state.
        state: ApprovalState,
        /// The attempted action.
        action: LedgerAction,
    },

    /// The actor's role does not allow the action.
    #[error("Role {role} is not allowed to {action} this entry")]
    NotAuthorized {
        /// The actor's role.
        role: ActorRole,
        /// The attempted action.
        action: LedgerAction,
    },

    /// A proposal is already outstanding and superseding it is disabled.
    #[error("Entry {0} already has a pending change awaiting approval")]
    PendingChangeConflict(EntryId),
}

impl WorkflowError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidTransition { .. } => 422,
            Self::NotAuthorized { .. } => 403,
            Self::PendingChangeConflict(_) => 409,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::NotAuthorized { .. } => "NOT_AUTHORIZED",
            Self::PendingChangeConflict(_) => "PENDING_CHANGE_CONFLICT",
        }
    }
}
