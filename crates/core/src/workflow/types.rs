//! Workflow domain types for the ledger approval lifecycle.
//!
//! This module defines the approval states an entry can be in, the actions
//! actors request against an entry, and the transitions the state machine
//! grants in response.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Approval state of a ledger entry.
///
/// The valid transitions are:
/// - Approved → PendingEditApproval (standard edit)
/// - Approved → Approved (privileged edit, in place)
/// - PendingEditApproval → Approved (approve or reject)
/// - PendingCreateApproval → Approved (approve)
/// - PendingCreateApproval → deleted (reject)
/// - any → deleted (privileged delete)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    /// Entry is live and part of the customer's balance chain.
    Approved,
    /// Entry was proposed by a standard actor and is not in the balance chain yet.
    PendingCreateApproval,
    /// Entry is live; a proposed edit is waiting for approval.
    PendingEditApproval,
}

impl ApprovalState {
    /// Returns the string representation of the state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::PendingCreateApproval => "pending_create_approval",
            Self::PendingEditApproval => "pending_edit_approval",
        }
    }

    /// Parses a state from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "approved" => Some(Self::Approved),
            "pending_create_approval" => Some(Self::PendingCreateApproval),
            "pending_edit_approval" => Some(Self::PendingEditApproval),
            _ => None,
        }
    }

    /// Returns true if entries in this state contribute to the running balance.
    #[must_use]
    pub fn in_balance_chain(&self) -> bool {
        matches!(self, Self::Approved | Self::PendingEditApproval)
    }

    /// Returns true if an approver still has to act on the entry.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::PendingCreateApproval | Self::PendingEditApproval)
    }
}

impl fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mutation an actor asks to perform on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerAction {
    /// Record a new entry.
    Create,
    /// Change an existing entry.
    Edit,
    /// Remove an entry.
    Delete,
    /// Accept a pending creation or edit.
    Approve,
    /// Refuse a pending creation or edit.
    Reject,
    /// Re-run balance recalculation for a customer.
    Recalculate,
}

impl LedgerAction {
    /// Returns the string representation of the action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Recalculate => "recalculate",
        }
    }
}

impl fmt::Display for LedgerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transition granted by the workflow service.
///
/// Each variant tells the ledger service which mutation to carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Privileged creation, straight into the balance chain.
    CreateApproved,
    /// Standard creation, held as a pending creation.
    StageCreation,
    /// Privileged edit of a live entry, applied in place.
    EditInPlace,
    /// Edit of an entry that is still a pending creation.
    ReviseCreation,
    /// Standard edit of a live entry, staged as a proposed edit.
    StageEdit,
    /// Standard edit of an entry whose proposed edit is still outstanding.
    ReplaceEdit,
    /// Approval of a pending creation.
    ApproveCreation,
    /// Approval of a proposed edit.
    ApproveEdit,
    /// Rejection of a pending creation (entry is removed).
    RejectCreation,
    /// Rejection of a proposed edit (entry is untouched).
    RejectEdit,
    /// Privileged removal of an entry.
    Delete,
}

impl Transition {
    /// Returns the approval state after the transition, or `None` when the
    /// entry no longer exists.
    #[must_use]
    pub fn resulting_state(&self) -> Option<ApprovalState> {
        match self {
            Self::CreateApproved
            | Self::EditInPlace
            | Self::ApproveCreation
            | Self::ApproveEdit
            | Self::RejectEdit => Some(ApprovalState::Approved),
            Self::StageCreation | Self::ReviseCreation => {
                Some(ApprovalState::PendingCreateApproval)
            }
            Self::StageEdit | Self::ReplaceEdit => Some(ApprovalState::PendingEditApproval),
            Self::RejectCreation | Self::Delete => None,
        }
    }

    /// Returns true if the transition changes the customer's balance chain.
    #[must_use]
    pub fn rebalances(&self) -> bool {
        matches!(
            self,
            Self::EditInPlace | Self::ApproveCreation | Self::ApproveEdit | Self::Delete
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_as_str() {
        assert_eq!(ApprovalState::Approved.as_str(), "approved");
        assert_eq!(
            ApprovalState::PendingCreateApproval.as_str(),
            "pending_create_approval"
        );
        assert_eq!(
            ApprovalState::PendingEditApproval.as_str(),
            "pending_edit_approval"
        );
    }

    #[test]
    fn test_state_parse() {
        assert_eq!(
            ApprovalState::parse("APPROVED"),
            Some(ApprovalState::Approved)
        );
        assert_eq!(
            ApprovalState::parse("pending_edit_approval"),
            Some(ApprovalState::PendingEditApproval)
        );
        assert_eq!(ApprovalState::parse("posted"), None);
    }

    #[test]
    fn test_balance_chain_membership() {
        assert!(ApprovalState::Approved.in_balance_chain());
        assert!(ApprovalState::PendingEditApproval.in_balance_chain());
        assert!(!ApprovalState::PendingCreateApproval.in_balance_chain());
    }

    #[test]
    fn test_state_pending() {
        assert!(!ApprovalState::Approved.is_pending());
        assert!(ApprovalState::PendingEditApproval.is_pending());
        assert!(ApprovalState::PendingCreateApproval.is_pending());
    }

    #[test]
    fn test_transition_resulting_state() {
        assert_eq!(
            Transition::StageEdit.resulting_state(),
            Some(ApprovalState::PendingEditApproval)
        );
        assert_eq!(
            Transition::RejectEdit.resulting_state(),
            Some(ApprovalState::Approved)
        );
        assert_eq!(Transition::RejectCreation.resulting_state(), None);
        assert_eq!(Transition::Delete.resulting_state(), None);
    }

    #[test]
    fn test_transition_rebalances() {
        assert!(Transition::ApproveCreation.rebalances());
        assert!(Transition::ApproveEdit.rebalances());
        assert!(Transition::EditInPlace.rebalances());
        assert!(Transition::Delete.rebalances());
        assert!(!Transition::RejectEdit.rebalances());
        assert!(!Transition::RejectCreation.rebalances());
        assert!(!Transition::StageEdit.rebalances());
    }
}
