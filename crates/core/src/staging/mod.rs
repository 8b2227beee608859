//! Pending change staging.
//!
//! Proposed edits and pending creations live beside the approved ledger until
//! an approver resolves them. Staging functions are pure: they transform a
//! [`LedgerRecord`] and report which attachment files lost their owner, and
//! the caller persists the record and deletes those files.

use crate::attachment::AttachmentRef;
use crate::ledger::{
    AttachmentDisposition, EntryFields, LedgerEntry, LedgerError, LedgerRecord, ProposedEdit,
};
use crate::workflow::{ApprovalState, LedgerAction};

/// An approver's decision on a staged change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Accept the change.
    Approve,
    /// Discard the change.
    Reject,
}

impl Decision {
    fn action(self) -> LedgerAction {
        match self {
            Self::Approve => LedgerAction::Approve,
            Self::Reject => LedgerAction::Reject,
        }
    }
}

/// Result of staging a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedOutcome {
    /// The record to persist.
    pub record: LedgerRecord,
    /// Attachments of the superseded proposal, to delete now.
    pub superseded: Vec<AttachmentRef>,
}

/// What is left of a record after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedRecord {
    /// The entry is live. After an approval its balance is stale until the
    /// chain is recalculated.
    Approved(LedgerEntry),
    /// The entry must be removed.
    Removed(LedgerEntry),
}

/// Result of resolving a staged change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The resolved record.
    pub outcome: ResolvedRecord,
    /// Attachments no longer owned by anything, to delete.
    pub discarded: Vec<AttachmentRef>,
}

/// Stateless staging operations.
pub struct PendingStaging;

impl PendingStaging {
    /// Attach a proposed edit to a live entry, replacing any earlier proposal.
    ///
    /// The entry's own fields and attachments are untouched.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` for pending creations, which are revised
    /// with [`Self::revise_creation`] instead.
    pub fn stage(
        record: LedgerRecord,
        proposal: ProposedEdit,
    ) -> Result<StagedOutcome, LedgerError> {
        match record {
            LedgerRecord::Approved(entry) => Ok(StagedOutcome {
                record: LedgerRecord::PendingEdit(entry, proposal),
                superseded: Vec::new(),
            }),
            LedgerRecord::PendingEdit(entry, previous) => Ok(StagedOutcome {
                record: LedgerRecord::PendingEdit(entry, proposal),
                superseded: previous.attachments,
            }),
            LedgerRecord::PendingCreate(_) => Err(LedgerError::InvalidTransition {
                state: ApprovalState::PendingCreateApproval,
                action: LedgerAction::Edit,
            }),
        }
    }

    /// Overwrite the fields of a pending creation.
    ///
    /// The provisional balance is left to the caller.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the record is not a pending creation.
    pub fn revise_creation(
        record: LedgerRecord,
        fields: EntryFields,
        incoming: Vec<AttachmentRef>,
        disposition: AttachmentDisposition,
    ) -> Result<StagedOutcome, LedgerError> {
        let state = record.approval_state();
        let LedgerRecord::PendingCreate(mut pending) = record else {
            return Err(LedgerError::InvalidTransition {
                state,
                action: LedgerAction::Edit,
            });
        };

        let live = std::mem::take(&mut pending.entry.attachments);
        let merge = disposition.merge(live, incoming);
        pending.entry.apply_fields(fields);
        pending.entry.attachments = merge.kept;

        Ok(StagedOutcome {
            record: LedgerRecord::PendingCreate(pending),
            superseded: merge.discarded,
        })
    }

    /// Resolve the staged change of a record.
    ///
    /// Approving an edit copies the proposed fields into the entry and applies
    /// the attachment disposition. Rejecting an edit returns the entry exactly
    /// as it was. Rejecting a creation removes the entry.
    ///
    /// # Errors
    ///
    /// Returns `ProposalNotFound` if nothing is staged for the record.
    pub fn resolve(record: LedgerRecord, decision: Decision) -> Result<Resolution, LedgerError> {
        match (record, decision) {
            (LedgerRecord::PendingEdit(mut entry, proposal), Decision::Approve) => {
                let live = std::mem::take(&mut entry.attachments);
                let merge = proposal
                    .attachment_disposition
                    .merge(live, proposal.attachments);
                entry.apply_fields(proposal.fields);
                entry.attachments = merge.kept;
                Ok(Resolution {
                    outcome: ResolvedRecord::Approved(entry),
                    discarded: merge.discarded,
                })
            }
            (LedgerRecord::PendingEdit(entry, proposal), Decision::Reject) => Ok(Resolution {
                outcome: ResolvedRecord::Approved(entry),
                discarded: proposal.attachments,
            }),
            (LedgerRecord::PendingCreate(pending), Decision::Approve) => Ok(Resolution {
                outcome: ResolvedRecord::Approved(pending.entry),
                discarded: Vec::new(),
            }),
            (LedgerRecord::PendingCreate(pending), Decision::Reject) => {
                let discarded = pending.entry.attachments.clone();
                Ok(Resolution {
                    outcome: ResolvedRecord::Removed(pending.entry),
                    discarded,
                })
            }
            (LedgerRecord::Approved(entry), decision) => {
                tracing::debug!(
                    entry_id = %entry.id,
                    action = %decision.action(),
                    "Nothing staged to resolve"
                );
                Err(LedgerError::ProposalNotFound(entry.id))
            }
        }
    }
}
