//! Ledger service orchestrating mutations of customer ledgers.
//!
//! Every mutating operation follows the same path: validate the request, ask
//! the workflow service which transition applies, persist the record, run the
//! balance cascade when the chain changed, then signal cache invalidation and
//! publish a change event. Mutations of one customer's ledger are serialized
//! with a per-customer lock.

use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use ledgerbook_shared::config::LedgerSettings;
use ledgerbook_shared::types::{CustomerId, EntryId};
use rust_decimal::Decimal;

use super::balance::{
    CascadeOutcome, ChainViolation, balance_before, chain_violations, rebalance_from,
    recalculate_from,
};
use super::error::LedgerError;
use super::locks::CustomerLocks;
use super::store::LedgerStore;
use super::types::{
    ChainCursor, CreateEntryInput, CustomerSummary, EditEntryInput, LedgerEntry, LedgerRecord,
    PendingCreation, ProposedEdit,
};
use super::validation::{validate_create, validate_edit};
use crate::attachment::{AttachmentRef, AttachmentStore, NewAttachment};
use crate::events::{CacheInvalidator, ChangeNotifier, LedgerEvent, NoopNotifier, SummaryCache};
use crate::staging::{Decision, PendingStaging, ResolvedRecord};
use crate::workflow::{Actor, LedgerAction, SupersedePolicy, Transition, WorkflowService};

/// Orchestrates ledger mutations for all customers.
pub struct LedgerService<S, A> {
    store: Arc<S>,
    attachments: Arc<A>,
    locks: CustomerLocks,
    summaries: SummaryCache,
    invalidators: Vec<Arc<dyn CacheInvalidator>>,
    notifier: Arc<dyn ChangeNotifier>,
    policy: SupersedePolicy,
}

impl<S: LedgerStore, A: AttachmentStore> LedgerService<S, A> {
    /// Create a ledger service.
    ///
    /// The service's own summary cache is registered as a cache invalidator.
    #[must_use]
    pub fn new(store: Arc<S>, attachments: Arc<A>, settings: &LedgerSettings) -> Self {
        let summaries = SummaryCache::from_settings(settings);
        Self {
            store,
            attachments,
            locks: CustomerLocks::new(),
            invalidators: vec![Arc::new(summaries.clone())],
            summaries,
            notifier: Arc::new(NoopNotifier),
            policy: SupersedePolicy::from_flag(settings.reject_superseding_proposals),
        }
    }

    /// Publish change events to `notifier`.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn ChangeNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Signal ledger changes to an additional cache.
    #[must_use]
    pub fn with_cache_invalidator(mut self, invalidator: Arc<dyn CacheInvalidator>) -> Self {
        self.invalidators.push(invalidator);
        self
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Record a new entry.
    ///
    /// Privileged actors create approved entries; standard actors create
    /// pending creations that stay out of the balance chain until approved.
    pub async fn create_entry(
        &self,
        actor: &Actor,
        input: CreateEntryInput,
    ) -> Result<LedgerRecord, LedgerError> {
        let validated = validate_create(&input)?;
        let customer_id = validated.customer_id;
        let transition = WorkflowService::create(actor, customer_id)?;

        if !self.store.customer_exists(customer_id).await? {
            return Err(LedgerError::CustomerNotFound(customer_id));
        }
        if !self.store.supplier_exists(validated.supplier_id).await? {
            return Err(LedgerError::SupplierNotFound(validated.supplier_id));
        }

        let _guard = self.locks.acquire(customer_id).await;
        let attachments = self.store_attachments(customer_id, input.attachments).await?;

        let id = EntryId::new();
        // Stored timestamps have microsecond precision.
        let created_at = Utc::now().trunc_subsecs(6);
        let cursor = ChainCursor::new(created_at, id);
        let prior = match balance_before(self.store.as_ref(), customer_id, cursor).await {
            Ok(prior) => prior,
            Err(err) => {
                self.discard_attachments(&attachments).await;
                return Err(err);
            }
        };

        let fields = validated.fields;
        let entry = LedgerEntry {
            id,
            customer_id,
            supplier_id: validated.supplier_id,
            kind: fields.kind,
            amount: fields.amount,
            balance: fields.kind.apply(prior, fields.amount),
            notes: fields.notes,
            document: fields.document,
            attachments,
            transaction_date: fields.transaction_date,
            created_at,
            created_by: actor.user_id,
        };
        let record = if transition == Transition::CreateApproved {
            LedgerRecord::Approved(entry)
        } else {
            LedgerRecord::PendingCreate(PendingCreation::new(entry))
        };

        if let Err(err) = self.store.insert(record.clone()).await {
            self.discard_attachments(&record.entry().attachments).await;
            return Err(err);
        }

        // New entries land at the end of the chain, so this is normally a no-op.
        let cascade = if record.in_balance_chain() {
            recalculate_from(
                self.store.as_ref(),
                customer_id,
                Some(cursor),
                record.entry().balance,
            )
            .await
            .map(drop)
        } else {
            Ok(())
        };

        let state = record.approval_state();
        tracing::info!(
            entry_id = %id,
            customer_id = %customer_id,
            state = %state,
            "Ledger entry created"
        );
        self.committed(LedgerEvent::created(id, customer_id, state));
        cascade?;

        Ok(record)
    }

    /// Change an entry.
    ///
    /// Privileged edits of approved entries apply in place and rebalance the
    /// chain. Standard edits are staged as a proposed edit. Edits of a pending
    /// creation revise it and keep it pending.
    pub async fn edit_entry(
        &self,
        actor: &Actor,
        entry_id: EntryId,
        input: EditEntryInput,
    ) -> Result<LedgerRecord, LedgerError> {
        let fields = validate_edit(&input)?;
        let customer_id = self.load(entry_id).await?.customer_id();

        let _guard = self.locks.acquire(customer_id).await;
        let record = self.load(entry_id).await?;
        let transition = WorkflowService::transition(
            actor,
            entry_id,
            customer_id,
            record.approval_state(),
            LedgerAction::Edit,
            self.policy,
        )?;

        let incoming = self.store_attachments(customer_id, input.attachments).await?;
        let disposition = input.attachment_disposition;

        let (updated, discarded) = match transition {
            Transition::EditInPlace => {
                let mut entry = record.into_entry();
                let live = std::mem::take(&mut entry.attachments);
                let merge = disposition.merge(live, incoming.clone());
                entry.apply_fields(fields);
                entry.attachments = merge.kept;
                (LedgerRecord::Approved(entry), merge.discarded)
            }
            Transition::ReviseCreation => {
                let staged =
                    PendingStaging::revise_creation(record, fields, incoming.clone(), disposition)?;
                let mut revised = staged.record;
                let entry = revised.entry_mut();
                let prior = balance_before(self.store.as_ref(), customer_id, entry.cursor()).await;
                match prior {
                    Ok(prior) => entry.balance = entry.kind.apply(prior, entry.amount),
                    Err(err) => {
                        self.discard_attachments(&incoming).await;
                        return Err(err);
                    }
                }
                (revised, staged.superseded)
            }
            Transition::StageEdit | Transition::ReplaceEdit => {
                let proposal = ProposedEdit {
                    fields,
                    attachments: incoming.clone(),
                    attachment_disposition: disposition,
                    proposed_by: actor.user_id,
                    proposed_at: Utc::now(),
                };
                let staged = PendingStaging::stage(record, proposal)?;
                (staged.record, staged.superseded)
            }
            _ => {
                self.discard_attachments(&incoming).await;
                return Err(LedgerError::InvalidTransition {
                    state: record.approval_state(),
                    action: LedgerAction::Edit,
                });
            }
        };

        if let Err(err) = self.store.update(updated.clone()).await {
            self.discard_attachments(&incoming).await;
            return Err(err);
        }
        self.discard_attachments(&discarded).await;

        let cascade = if transition.rebalances() {
            rebalance_from(self.store.as_ref(), customer_id, updated.entry().cursor())
                .await
                .map(drop)
        } else {
            Ok(())
        };

        let state = updated.approval_state();
        tracing::info!(
            entry_id = %entry_id,
            customer_id = %customer_id,
            state = %state,
            transition = ?transition,
            "Ledger entry edited"
        );
        self.committed(Self::event_for(transition, entry_id, customer_id));
        cascade?;

        self.load(entry_id).await
    }

    /// Remove an entry and its attachment files, then rebalance later entries.
    pub async fn delete_entry(
        &self,
        actor: &Actor,
        entry_id: EntryId,
    ) -> Result<LedgerRecord, LedgerError> {
        let customer_id = self.load(entry_id).await?.customer_id();

        let _guard = self.locks.acquire(customer_id).await;
        let record = self.load(entry_id).await?;
        let transition = WorkflowService::transition(
            actor,
            entry_id,
            customer_id,
            record.approval_state(),
            LedgerAction::Delete,
            self.policy,
        )?;

        let removed = self
            .store
            .delete(entry_id)
            .await?
            .ok_or(LedgerError::EntryNotFound(entry_id))?;

        // Entries after the removed one restart from its predecessor.
        let cascade = if removed.in_balance_chain() {
            rebalance_from(self.store.as_ref(), customer_id, removed.entry().cursor())
                .await
                .map(drop)
        } else {
            Ok(())
        };
        self.discard_attachments(&removed.owned_attachments()).await;

        tracing::info!(
            entry_id = %entry_id,
            customer_id = %customer_id,
            state = %removed.approval_state(),
            "Ledger entry deleted"
        );
        self.committed(Self::event_for(transition, entry_id, customer_id));
        cascade?;

        Ok(removed)
    }

    /// Approve a pending creation or proposed edit.
    ///
    /// The entry's balance is recomputed against its current predecessor and
    /// every later entry is rebalanced.
    pub async fn approve(
        &self,
        actor: &Actor,
        entry_id: EntryId,
    ) -> Result<LedgerEntry, LedgerError> {
        let customer_id = self.load(entry_id).await?.customer_id();

        let _guard = self.locks.acquire(customer_id).await;
        let record = self.load(entry_id).await?;
        let state = record.approval_state();
        let transition = WorkflowService::transition(
            actor,
            entry_id,
            customer_id,
            state,
            LedgerAction::Approve,
            self.policy,
        )?;

        let resolution = PendingStaging::resolve(record, Decision::Approve)?;
        let ResolvedRecord::Approved(entry) = resolution.outcome else {
            return Err(LedgerError::InvalidTransition {
                state,
                action: LedgerAction::Approve,
            });
        };
        let cursor = entry.cursor();

        self.store.update(LedgerRecord::Approved(entry)).await?;
        self.discard_attachments(&resolution.discarded).await;

        let cascade = rebalance_from(self.store.as_ref(), customer_id, cursor).await;

        tracing::info!(
            entry_id = %entry_id,
            customer_id = %customer_id,
            transition = ?transition,
            "Pending change approved"
        );
        self.committed(Self::event_for(transition, entry_id, customer_id));
        cascade?;

        Ok(self.load(entry_id).await?.into_entry())
    }

    /// Reject a pending creation or proposed edit.
    ///
    /// A rejected edit leaves the entry exactly as it was and returns it. A
    /// rejected creation is removed and `None` is returned. The balance chain
    /// is never touched.
    pub async fn reject(
        &self,
        actor: &Actor,
        entry_id: EntryId,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        let customer_id = self.load(entry_id).await?.customer_id();

        let _guard = self.locks.acquire(customer_id).await;
        let record = self.load(entry_id).await?;
        let transition = WorkflowService::transition(
            actor,
            entry_id,
            customer_id,
            record.approval_state(),
            LedgerAction::Reject,
            self.policy,
        )?;

        let resolution = PendingStaging::resolve(record, Decision::Reject)?;
        let kept = match resolution.outcome {
            ResolvedRecord::Approved(entry) => {
                self.store
                    .update(LedgerRecord::Approved(entry.clone()))
                    .await?;
                Some(entry)
            }
            ResolvedRecord::Removed(_) => {
                self.store.delete(entry_id).await?;
                None
            }
        };
        self.discard_attachments(&resolution.discarded).await;

        tracing::info!(
            entry_id = %entry_id,
            customer_id = %customer_id,
            removed = kept.is_none(),
            "Pending change rejected"
        );
        self.committed(Self::event_for(transition, entry_id, customer_id));

        Ok(kept)
    }

    /// Re-run the balance cascade for a customer after `anchor`.
    ///
    /// This is the recovery path after a `PartialCascadeFailure`: pass the
    /// anchor it reported, or `None` to rebuild the whole chain. The pivot is
    /// read from the store. Safe to repeat.
    pub async fn recalculate(
        &self,
        actor: &Actor,
        customer_id: CustomerId,
        anchor: Option<ChainCursor>,
    ) -> Result<CascadeOutcome, LedgerError> {
        if !actor.is_privileged() {
            return Err(LedgerError::NotAuthorized {
                role: actor.role,
                action: LedgerAction::Recalculate,
            });
        }
        if !self.store.customer_exists(customer_id).await? {
            return Err(LedgerError::CustomerNotFound(customer_id));
        }

        let _guard = self.locks.acquire(customer_id).await;
        let pivot = self.pivot_at(customer_id, anchor).await?;
        let outcome = recalculate_from(self.store.as_ref(), customer_id, anchor, pivot).await?;

        tracing::info!(
            customer_id = %customer_id,
            anchor = ?anchor,
            pivot = %pivot,
            examined = outcome.examined,
            updated = outcome.updated,
            "Balance chain recalculated"
        );
        if outcome.updated > 0 {
            self.invalidate(customer_id);
        }

        Ok(outcome)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Returns every entry of the customer's chain whose balance is wrong.
    pub async fn verify_customer_chain(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<ChainViolation>, LedgerError> {
        let chain = self.store.find_later_entries(customer_id, None).await?;
        Ok(chain_violations(&chain))
    }

    /// Totals and current balance of a customer's chain.
    pub async fn customer_summary(
        &self,
        customer_id: CustomerId,
    ) -> Result<CustomerSummary, LedgerError> {
        if let Some(summary) = self.summaries.get(customer_id) {
            return Ok(summary);
        }
        if !self.store.customer_exists(customer_id).await? {
            return Err(LedgerError::CustomerNotFound(customer_id));
        }

        // Mutations invalidate under this lock, so the read below cannot
        // straddle a commit.
        let _guard = self.locks.acquire(customer_id).await;
        if let Some(summary) = self.summaries.get(customer_id) {
            return Ok(summary);
        }
        let records = self.store.list_by_customer(customer_id).await?;
        let summary = CustomerSummary::from_records(customer_id, &records);
        self.summaries.insert(summary.clone());
        Ok(summary)
    }

    /// Records awaiting approval that the actor can see.
    ///
    /// Privileged actors see every customer; standard actors their own.
    pub async fn list_pending(&self, actor: &Actor) -> Result<Vec<LedgerRecord>, LedgerError> {
        if actor.is_privileged() {
            return self.store.list_pending(None).await;
        }
        match actor.customer_id {
            Some(customer_id) => self.store.list_pending(Some(customer_id)).await,
            None => Ok(Vec::new()),
        }
    }

    /// Find a record by ID.
    pub async fn get_entry(&self, entry_id: EntryId) -> Result<LedgerRecord, LedgerError> {
        self.load(entry_id).await
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn load(&self, entry_id: EntryId) -> Result<LedgerRecord, LedgerError> {
        self.store
            .get(entry_id)
            .await?
            .ok_or(LedgerError::EntryNotFound(entry_id))
    }

    async fn pivot_at(
        &self,
        customer_id: CustomerId,
        anchor: Option<ChainCursor>,
    ) -> Result<Decimal, LedgerError> {
        let Some(anchor) = anchor else {
            return Ok(Decimal::ZERO);
        };

        match self.store.get(anchor.entry_id).await? {
            Some(record)
                if record.in_balance_chain()
                    && record.customer_id() == customer_id
                    && record.entry().cursor() == anchor =>
            {
                Ok(record.entry().balance)
            }
            _ => balance_before(self.store.as_ref(), customer_id, anchor).await,
        }
    }

    /// Store uploaded files, removing the ones already stored if one fails.
    async fn store_attachments(
        &self,
        customer_id: CustomerId,
        files: Vec<NewAttachment>,
    ) -> Result<Vec<AttachmentRef>, LedgerError> {
        let mut stored = Vec::with_capacity(files.len());
        for file in files {
            match self.attachments.store(customer_id, file).await {
                Ok(attachment) => stored.push(attachment),
                Err(err) => {
                    self.discard_attachments(&stored).await;
                    return Err(err.into());
                }
            }
        }
        Ok(stored)
    }

    /// Best-effort deletion; failures are logged and never fail the mutation.
    async fn discard_attachments(&self, attachments: &[AttachmentRef]) {
        for attachment in attachments {
            if let Err(err) = self.attachments.delete(attachment).await {
                tracing::warn!(
                    attachment_id = %attachment.id,
                    storage_key = %attachment.storage_key,
                    error = %err,
                    "Failed to delete attachment file"
                );
            }
        }
    }

    fn invalidate(&self, customer_id: CustomerId) {
        for invalidator in &self.invalidators {
            invalidator.ledger_changed(customer_id);
        }
    }

    /// Change event for a completed transition.
    fn event_for(
        transition: Transition,
        entry_id: EntryId,
        customer_id: CustomerId,
    ) -> LedgerEvent {
        match transition.resulting_state() {
            Some(state) => LedgerEvent::updated(entry_id, customer_id, state),
            None => LedgerEvent::deleted(entry_id, customer_id),
        }
    }

    fn committed(&self, event: LedgerEvent) {
        self.invalidate(event.customer_id);
        self.notifier.notify(event);
    }
}
