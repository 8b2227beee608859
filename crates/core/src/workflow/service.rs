//! Workflow service for ledger approval transitions.
//!
//! This module implements the state machine deciding which mutation an actor
//! may perform on an entry, given the entry's approval state.

use ledgerbook_shared::types::{CustomerId, EntryId};

use crate::workflow::approval::Actor;
use crate::workflow::error::WorkflowError;
use crate::workflow::types::{ApprovalState, LedgerAction, Transition};

/// How to treat a change proposed while another one is still outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupersedePolicy {
    /// The newest proposal replaces the outstanding one.
    #[default]
    LatestWins,
    /// The newest proposal is refused with a conflict.
    Reject,
}

impl SupersedePolicy {
    /// Builds the policy from the `reject_superseding_proposals` setting.
    #[must_use]
    pub fn from_flag(reject_superseding: bool) -> Self {
        if reject_superseding {
            Self::Reject
        } else {
            Self::LatestWins
        }
    }
}

/// Stateless service validating ledger transitions.
pub struct WorkflowService;

impl WorkflowService {
    /// Decide how a creation request for `customer_id` is recorded.
    ///
    /// # Returns
    /// * `Ok(Transition::CreateApproved)` for privileged actors
    /// * `Ok(Transition::StageCreation)` for standard actors on their own customer
    /// * `Err(WorkflowError::NotAuthorized)` for standard actors on another customer
    pub fn create(actor: &Actor, customer_id: CustomerId) -> Result<Transition, WorkflowError> {
        if !actor.can_act_for(customer_id) {
            return Err(WorkflowError::NotAuthorized {
                role: actor.role,
                action: LedgerAction::Create,
            });
        }

        if actor.is_privileged() {
            Ok(Transition::CreateApproved)
        } else {
            Ok(Transition::StageCreation)
        }
    }

    /// Validate `action` against an existing entry.
    ///
    /// # Arguments
    /// * `actor` - The requesting actor
    /// * `entry_id` - The entry the action targets
    /// * `owner` - The customer owning the entry
    /// * `state` - The entry's current approval state
    /// * `action` - The requested action (not `Create`)
    /// * `policy` - Treatment of a second proposal while one is outstanding
    pub fn transition(
        actor: &Actor,
        entry_id: EntryId,
        owner: CustomerId,
        state: ApprovalState,
        action: LedgerAction,
        policy: SupersedePolicy,
    ) -> Result<Transition, WorkflowError> {
        if !actor.can_act_for(owner) {
            return Err(WorkflowError::NotAuthorized {
                role: actor.role,
                action,
            });
        }

        if actor.is_privileged() {
            Self::privileged_transition(state, action)
        } else {
            Self::standard_transition(entry_id, state, action, policy)
        }
    }

    fn privileged_transition(
        state: ApprovalState,
        action: LedgerAction,
    ) -> Result<Transition, WorkflowError> {
        use ApprovalState::{Approved, PendingCreateApproval, PendingEditApproval};

        match (state, action) {
            (Approved, LedgerAction::Edit) => Ok(Transition::EditInPlace),
            (PendingCreateApproval, LedgerAction::Edit) => Ok(Transition::ReviseCreation),
            (_, LedgerAction::Delete) => Ok(Transition::Delete),
            (PendingCreateApproval, LedgerAction::Approve) => Ok(Transition::ApproveCreation),
            (PendingEditApproval, LedgerAction::Approve) => Ok(Transition::ApproveEdit),
            (PendingCreateApproval, LedgerAction::Reject) => Ok(Transition::RejectCreation),
            (PendingEditApproval, LedgerAction::Reject) => Ok(Transition::RejectEdit),
            // An outstanding proposal must be resolved before a direct edit.
            _ => Err(WorkflowError::InvalidTransition { state, action }),
        }
    }

    fn standard_transition(
        entry_id: EntryId,
        state: ApprovalState,
        action: LedgerAction,
        policy: SupersedePolicy,
    ) -> Result<Transition, WorkflowError> {
        use ApprovalState::{Approved, PendingCreateApproval, PendingEditApproval};

        if action != LedgerAction::Edit {
            return Err(WorkflowError::NotAuthorized {
                role: crate::workflow::ActorRole::Standard,
                action,
            });
        }

        match (state, policy) {
            (Approved, _) => Ok(Transition::StageEdit),
            (PendingEditApproval, SupersedePolicy::LatestWins) => Ok(Transition::ReplaceEdit),
            (PendingCreateApproval, SupersedePolicy::LatestWins) => Ok(Transition::ReviseCreation),
            (PendingEditApproval | PendingCreateApproval, SupersedePolicy::Reject) => {
                Err(WorkflowError::PendingChangeConflict(entry_id))
            }
        }
    }
}
