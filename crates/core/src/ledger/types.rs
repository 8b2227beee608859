//! Ledger domain types.
//!
//! A customer's ledger is a chain of entries ordered by creation time. Each
//! entry stores the running balance as of and including itself. Records that
//! wait for approval are modelled as explicit variants of [`LedgerRecord`].

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use ledgerbook_shared::types::{CustomerId, EntryId, SupplierId, UserId};

use crate::attachment::{AttachmentRef, NewAttachment};
use crate::workflow::ApprovalState;

/// Kind of a ledger transaction.
///
/// Amounts are always positive; the sign comes from the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Increases what the customer owes.
    Invoice,
    /// Decreases what the customer owes.
    Payment,
    /// Goods returned by the customer; decreases what they owe.
    Return,
}

impl TransactionKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Payment => "payment",
            Self::Return => "return",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "invoice" => Some(Self::Invoice),
            "payment" => Some(Self::Payment),
            "return" => Some(Self::Return),
            _ => None,
        }
    }

    /// Returns the amount with the sign this kind contributes to the balance.
    #[must_use]
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            Self::Invoice => amount,
            Self::Payment | Self::Return => -amount,
        }
    }

    /// Applies an amount of this kind to a running balance.
    #[must_use]
    pub fn apply(self, running: Decimal, amount: Decimal) -> Decimal {
        running + self.signed(amount)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Position of an entry in its customer's balance chain.
///
/// Ordered by creation time; entries created in the same instant are ordered
/// by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainCursor {
    /// Creation timestamp of the entry.
    pub created_at: DateTime<Utc>,
    /// The entry's id.
    pub entry_id: EntryId,
}

impl ChainCursor {
    /// Create a cursor.
    #[must_use]
    pub fn new(created_at: DateTime<Utc>, entry_id: EntryId) -> Self {
        Self {
            created_at,
            entry_id,
        }
    }
}

impl fmt::Display for ChainCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.entry_id, self.created_at.to_rfc3339())
    }
}

/// The mutable fields of an entry, validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFields {
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Positive amount.
    pub amount: Decimal,
    /// Business-effective date.
    pub transaction_date: NaiveDate,
    /// Free text notes.
    pub notes: Option<String>,
    /// Free text document reference.
    pub document: Option<String>,
}

/// One recorded transaction for a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry ID.
    pub id: EntryId,
    /// Owning customer.
    pub customer_id: CustomerId,
    /// Supplier the transaction is with.
    pub supplier_id: SupplierId,
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Positive amount.
    pub amount: Decimal,
    /// Running balance as of and including this entry.
    pub balance: Decimal,
    /// Free text notes.
    pub notes: Option<String>,
    /// Free text document reference.
    pub document: Option<String>,
    /// Attachment files owned by the entry.
    pub attachments: Vec<AttachmentRef>,
    /// Business-effective date. Does not affect chain order.
    pub transaction_date: NaiveDate,
    /// Creation timestamp. Defines chain order.
    pub created_at: DateTime<Utc>,
    /// User who created the entry.
    pub created_by: UserId,
}

impl LedgerEntry {
    /// Returns the entry's position in the balance chain.
    #[must_use]
    pub fn cursor(&self) -> ChainCursor {
        ChainCursor::new(self.created_at, self.id)
    }

    /// Returns the signed contribution of this entry to the balance.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        self.kind.signed(self.amount)
    }

    /// Returns the mutable fields of the entry.
    #[must_use]
    pub fn fields(&self) -> EntryFields {
        EntryFields {
            kind: self.kind,
            amount: self.amount,
            transaction_date: self.transaction_date,
            notes: self.notes.clone(),
            document: self.document.clone(),
        }
    }

    /// Overwrites the mutable fields. The balance is left to the caller.
    pub fn apply_fields(&mut self, fields: EntryFields) {
        self.kind = fields.kind;
        self.amount = fields.amount;
        self.transaction_date = fields.transaction_date;
        self.notes = fields.notes;
        self.document = fields.document;
    }
}

/// What happens to the live entry's attachments when an edit is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentDisposition {
    /// Drop every attachment, including the ones sent with the edit.
    Remove,
    /// Swap the live attachments for the ones sent with the edit.
    Replace,
    /// Keep the live attachments and add the ones sent with the edit.
    #[default]
    Keep,
}

/// Attachment sets after applying an [`AttachmentDisposition`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentMerge {
    /// Attachments the entry owns afterwards.
    pub kept: Vec<AttachmentRef>,
    /// Attachments whose files must be deleted.
    pub discarded: Vec<AttachmentRef>,
}

impl AttachmentDisposition {
    /// Combines the live attachments with the incoming ones.
    #[must_use]
    pub fn merge(self, live: Vec<AttachmentRef>, incoming: Vec<AttachmentRef>) -> AttachmentMerge {
        match self {
            Self::Remove => {
                let mut discarded = live;
                discarded.extend(incoming);
                AttachmentMerge {
                    kept: Vec::new(),
                    discarded,
                }
            }
            Self::Replace => AttachmentMerge {
                kept: incoming,
                discarded: live,
            },
            Self::Keep => {
                let mut kept = live;
                kept.extend(incoming);
                AttachmentMerge {
                    kept,
                    discarded: Vec::new(),
                }
            }
        }
    }
}

/// A change to a live entry awaiting approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedEdit {
    /// The fields to substitute into the entry.
    pub fields: EntryFields,
    /// Attachment files sent with the proposal, owned by the proposal.
    pub attachments: Vec<AttachmentRef>,
    /// What happens to the entry's attachments on approval.
    pub attachment_disposition: AttachmentDisposition,
    /// User who proposed the edit.
    pub proposed_by: UserId,
    /// When the edit was proposed.
    pub proposed_at: DateTime<Utc>,
}

/// An entry awaiting creation approval.
///
/// Its balance is provisional and it is not part of the balance chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCreation {
    /// The proposed entry.
    pub entry: LedgerEntry,
}

impl PendingCreation {
    /// Wrap an entry as a pending creation.
    #[must_use]
    pub fn new(entry: LedgerEntry) -> Self {
        Self { entry }
    }
}

/// A stored ledger record in one of its approval states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerRecord {
    /// Live entry without outstanding changes.
    Approved(LedgerEntry),
    /// Entry awaiting creation approval.
    PendingCreate(PendingCreation),
    /// Live entry with a proposed edit awaiting approval.
    PendingEdit(LedgerEntry, ProposedEdit),
}

impl LedgerRecord {
    /// Returns the approval state of the record.
    #[must_use]
    pub fn approval_state(&self) -> ApprovalState {
        match self {
            Self::Approved(_) => ApprovalState::Approved,
            Self::PendingCreate(_) => ApprovalState::PendingCreateApproval,
            Self::PendingEdit(..) => ApprovalState::PendingEditApproval,
        }
    }

    /// Returns true if the record's entry contributes to the running balance.
    #[must_use]
    pub fn in_balance_chain(&self) -> bool {
        self.approval_state().in_balance_chain()
    }

    /// Returns the entry carried by the record.
    #[must_use]
    pub fn entry(&self) -> &LedgerEntry {
        match self {
            Self::Approved(entry) | Self::PendingEdit(entry, _) => entry,
            Self::PendingCreate(pending) => &pending.entry,
        }
    }

    /// Returns the entry carried by the record, mutably.
    pub fn entry_mut(&mut self) -> &mut LedgerEntry {
        match self {
            Self::Approved(entry) | Self::PendingEdit(entry, _) => entry,
            Self::PendingCreate(pending) => &mut pending.entry,
        }
    }

    /// Consumes the record and returns its entry.
    #[must_use]
    pub fn into_entry(self) -> LedgerEntry {
        match self {
            Self::Approved(entry) | Self::PendingEdit(entry, _) => entry,
            Self::PendingCreate(pending) => pending.entry,
        }
    }

    /// Returns the outstanding proposed edit, if any.
    #[must_use]
    pub fn proposal(&self) -> Option<&ProposedEdit> {
        match self {
            Self::PendingEdit(_, proposal) => Some(proposal),
            _ => None,
        }
    }

    /// Returns the entry ID.
    #[must_use]
    pub fn id(&self) -> EntryId {
        self.entry().id
    }

    /// Returns the owning customer.
    #[must_use]
    pub fn customer_id(&self) -> CustomerId {
        self.entry().customer_id
    }

    /// Returns every attachment owned by the record and its proposal.
    #[must_use]
    pub fn owned_attachments(&self) -> Vec<AttachmentRef> {
        let mut all = self.entry().attachments.clone();
        if let Some(proposal) = self.proposal() {
            all.extend(proposal.attachments.iter().cloned());
        }
        all
    }
}

/// Request to record a new entry.
///
/// Required fields are optional here so that missing ones are reported by
/// validation instead of failing deserialization.
#[derive(Debug, Clone, Default)]
pub struct CreateEntryInput {
    /// Owning customer.
    pub customer_id: Option<CustomerId>,
    /// Supplier the transaction is with.
    pub supplier_id: Option<SupplierId>,
    /// Transaction kind.
    pub kind: Option<TransactionKind>,
    /// Amount, must be positive.
    pub amount: Option<Decimal>,
    /// Business-effective date.
    pub transaction_date: Option<NaiveDate>,
    /// Free text notes.
    pub notes: Option<String>,
    /// Free text document reference.
    pub document: Option<String>,
    /// Files to attach.
    pub attachments: Vec<NewAttachment>,
}

/// Request to change an existing entry.
#[derive(Debug, Clone, Default)]
pub struct EditEntryInput {
    /// Transaction kind.
    pub kind: Option<TransactionKind>,
    /// Amount, must be positive.
    pub amount: Option<Decimal>,
    /// Business-effective date.
    pub transaction_date: Option<NaiveDate>,
    /// Free text notes.
    pub notes: Option<String>,
    /// Free text document reference.
    pub document: Option<String>,
    /// Files to attach.
    pub attachments: Vec<NewAttachment>,
    /// What happens to the entry's current attachments.
    pub attachment_disposition: AttachmentDisposition,
}

/// A validated creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCreate {
    /// Owning customer.
    pub customer_id: CustomerId,
    /// Supplier the transaction is with.
    pub supplier_id: SupplierId,
    /// The entry's fields.
    pub fields: EntryFields,
}

/// Totals over a customer's balance chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSummary {
    /// The customer.
    pub customer_id: CustomerId,
    /// Sum of invoice amounts.
    pub invoice_total: Decimal,
    /// Sum of payment amounts.
    pub payment_total: Decimal,
    /// Sum of return amounts.
    pub return_total: Decimal,
    /// Balance of the last entry in the chain.
    pub balance: Decimal,
    /// Number of entries in the chain.
    pub entry_count: usize,
    /// Number of records waiting for approval.
    pub pending_count: usize,
}

impl CustomerSummary {
    /// Summarize a customer's records, given in chain order.
    #[must_use]
    pub fn from_records(customer_id: CustomerId, records: &[LedgerRecord]) -> Self {
        let mut summary = Self {
            customer_id,
            invoice_total: Decimal::ZERO,
            payment_total: Decimal::ZERO,
            return_total: Decimal::ZERO,
            balance: Decimal::ZERO,
            entry_count: 0,
            pending_count: 0,
        };

        for record in records {
            if record.approval_state().is_pending() {
                summary.pending_count += 1;
            }
            if !record.in_balance_chain() {
                continue;
            }

            let entry = record.entry();
            match entry.kind {
                TransactionKind::Invoice => summary.invoice_total += entry.amount,
                TransactionKind::Payment => summary.payment_total += entry.amount,
                TransactionKind::Return => summary.return_total += entry.amount,
            }
            summary.balance = entry.balance;
            summary.entry_count += 1;
        }

        summary
    }

    /// Balance implied by the totals.
    #[must_use]
    pub fn computed_balance(&self) -> Decimal {
        self.invoice_total - self.payment_total - self.return_total
    }
}
