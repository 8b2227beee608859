//! Ledger error types.
//!
//! Not-found, transition, validation and cascade errors share one enum so the
//! request boundary can map each to a status code.

use ledgerbook_shared::AppError;
use ledgerbook_shared::types::{CustomerId, EntryId, SupplierId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::ChainCursor;
use crate::attachment::AttachmentError;
use crate::workflow::{ActorRole, ApprovalState, LedgerAction, WorkflowError};

/// A missing or malformed field in a creation or edit request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was not supplied.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Amount is zero or negative.
    #[error("amount must be positive")]
    NonPositiveAmount,

    /// Amount carries more decimal places than the ledger stores.
    #[error("amount must have at most {max_scale} decimal places")]
    AmountTooPrecise {
        /// Maximum number of decimal places.
        max_scale: u32,
    },

    /// A free text field is too long.
    #[error("{field} must be at most {max} characters")]
    FieldTooLong {
        /// The offending field.
        field: &'static str,
        /// Maximum length in characters.
        max: usize,
    },
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Not Found ==========
    /// Entry not found.
    #[error("Entry not found: {0}")]
    EntryNotFound(EntryId),

    /// Customer not found.
    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerId),

    /// Supplier not found.
    #[error("Supplier not found: {0}")]
    SupplierNotFound(SupplierId),

    /// The entry has no outstanding proposal.
    #[error("No pending change for entry {0}")]
    ProposalNotFound(EntryId),

    // ========== Workflow ==========
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

    /// A proposal is already outstanding for the entry.
    #[error("Entry {0} already has a pending change awaiting approval")]
    PendingChangeConflict(EntryId),

    // ========== Validation ==========
    /// Request failed validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    // ========== Consistency ==========
    /// A balance cascade stopped partway.
    ///
    /// Re-running the recalculation from `anchor` restores the chain.
    #[error(
        "Balance cascade for customer {customer_id} failed after {applied} entries ({remaining} remaining): {reason}"
    )]
    PartialCascadeFailure {
        /// The customer whose chain is inconsistent.
        customer_id: CustomerId,
        /// Entries strictly after this point were being recalculated.
        anchor: Option<ChainCursor>,
        /// Balance the cascade started from.
        pivot: Decimal,
        /// Entries processed before the failure.
        applied: usize,
        /// Entries not yet processed.
        remaining: usize,
        /// The underlying store failure.
        reason: String,
    },

    // ========== Infrastructure ==========
    /// Attachment storage failed.
    #[error("Attachment error: {0}")]
    Attachment(#[from] AttachmentError),

    /// Ledger store failed.
    #[error("Store error: {0}")]
    Store(String),
}

impl LedgerError {
    /// Create a store error.
    #[must_use]
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::CustomerNotFound(_) => "CUSTOMER_NOT_FOUND",
            Self::SupplierNotFound(_) => "SUPPLIER_NOT_FOUND",
            Self::ProposalNotFound(_) => "PROPOSAL_NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::NotAuthorized { .. } => "NOT_AUTHORIZED",
            Self::PendingChangeConflict(_) => "PENDING_CHANGE_CONFLICT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::PartialCascadeFailure { .. } => "PARTIAL_CASCADE_FAILURE",
            Self::Attachment(_) => "ATTACHMENT_IO_FAILURE",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotAuthorized { .. } => 403,
            Self::EntryNotFound(_)
            | Self::CustomerNotFound(_)
            | Self::SupplierNotFound(_)
            | Self::ProposalNotFound(_) => 404,
            Self::PendingChangeConflict(_) => 409,
            Self::InvalidTransition { .. } => 422,
            Self::PartialCascadeFailure { .. } | Self::Attachment(_) | Self::Store(_) => 500,
        }
    }

    /// Returns true if retrying the operation can succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PartialCascadeFailure { .. } | Self::Store(_))
    }
}

impl From<WorkflowError> for LedgerError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::InvalidTransition { state, action } => {
                Self::InvalidTransition { state, action }
            }
            WorkflowError::NotAuthorized { role, action } => Self::NotAuthorized { role, action },
            WorkflowError::PendingChangeConflict(id) => Self::PendingChangeConflict(id),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::EntryNotFound(_)
            | LedgerError::CustomerNotFound(_)
            | LedgerError::SupplierNotFound(_)
            | LedgerError::ProposalNotFound(_) => Self::NotFound(message),
            LedgerError::InvalidTransition { .. } => Self::InvalidTransition(message),
            LedgerError::NotAuthorized { .. } => Self::Forbidden(message),
            LedgerError::PendingChangeConflict(_) => Self::Conflict(message),
            LedgerError::Validation(_) => Self::Validation(message),
            LedgerError::PartialCascadeFailure { .. } => Self::Consistency(message),
            LedgerError::Attachment(_) => Self::Storage(message),
            LedgerError::Store(_) => Self::Database(message),
        }
    }
}
