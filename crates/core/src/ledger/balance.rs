//! Balance Recalculation Engine.
//!
//! Every entry in a customer's chain stores `previous balance ± amount`, in
//! creation order. After a mutation changes an amount, a kind, or chain
//! membership, the entries after the change point are recalculated here.
//!
//! A cascade is built as a [`CascadePlan`]: the full list of target balances
//! is computed up front from amounts and kinds, then persisted one entry at a
//! time while a progress index advances. Re-running a cascade from the same
//! anchor recomputes the same plan and skips entries that already hold their
//! target balance, so a retry after a partial failure restores the chain.

use ledgerbook_shared::types::{CustomerId, EntryId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::store::LedgerStore;
use super::types::{ChainCursor, LedgerEntry};

/// One entry of a cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeStep {
    /// The entry to update.
    pub entry_id: EntryId,
    /// Balance stored before the cascade.
    pub previous: Decimal,
    /// Balance the entry must end up with.
    pub balance: Decimal,
}

impl CascadeStep {
    /// Returns true if the stored balance already matches.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.previous == self.balance
    }
}

/// Result of running a cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeOutcome {
    /// Entries examined.
    pub examined: usize,
    /// Entries whose balance was rewritten.
    pub updated: usize,
    /// Balance of the last entry, or the pivot when there was none.
    pub final_balance: Decimal,
}

/// A resumable batch of balance updates for one customer.
#[derive(Debug, Clone)]
pub struct CascadePlan {
    customer_id: CustomerId,
    anchor: Option<ChainCursor>,
    pivot: Decimal,
    steps: Vec<CascadeStep>,
    next: usize,
}

impl CascadePlan {
    /// Plan the balances of `entries`, which must be the customer's chain
    /// entries strictly after `anchor` in ascending order.
    #[must_use]
    pub fn build(
        customer_id: CustomerId,
        anchor: Option<ChainCursor>,
        pivot: Decimal,
        entries: &[LedgerEntry],
    ) -> Self {
        let mut running = pivot;
        let steps = entries
            .iter()
            .map(|entry| {
                running = entry.kind.apply(running, entry.amount);
                CascadeStep {
                    entry_id: entry.id,
                    previous: entry.balance,
                    balance: running,
                }
            })
            .collect();

        Self {
            customer_id,
            anchor,
            pivot,
            steps,
            next: 0,
        }
    }

    /// Returns every planned step.
    #[must_use]
    pub fn steps(&self) -> &[CascadeStep] {
        &self.steps
    }

    /// Returns the steps not yet processed.
    #[must_use]
    pub fn remaining(&self) -> &[CascadeStep] {
        &self.steps[self.next..]
    }

    /// Returns true once every step has been processed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.next == self.steps.len()
    }

    /// Returns the balance of the last planned entry, or the pivot.
    #[must_use]
    pub fn final_balance(&self) -> Decimal {
        self.steps.last().map_or(self.pivot, |s| s.balance)
    }

    /// Persist the remaining steps.
    ///
    /// Steps whose stored balance already matches are skipped. On a store
    /// failure the progress index stays on the failed step and a
    /// `PartialCascadeFailure` carrying the anchor and pivot is returned.
    pub async fn apply<S: LedgerStore>(
        &mut self,
        store: &S,
    ) -> Result<CascadeOutcome, LedgerError> {
        let mut updated = 0;

        while let Some(step) = self.steps.get(self.next).copied() {
            if !step.is_noop() {
                if let Err(err) = store.update_balance(step.entry_id, step.balance).await {
                    let failure = LedgerError::PartialCascadeFailure {
                        customer_id: self.customer_id,
                        anchor: self.anchor,
                        pivot: self.pivot,
                        applied: self.next,
                        remaining: self.steps.len() - self.next,
                        reason: err.to_string(),
                    };
                    tracing::error!(
                        customer_id = %self.customer_id,
                        anchor = ?self.anchor,
                        pivot = %self.pivot,
                        failed_entry = %step.entry_id,
                        applied = self.next,
                        remaining = self.steps.len() - self.next,
                        error = %err,
                        "Balance cascade interrupted; ledger chain is inconsistent until recalculated"
                    );
                    return Err(failure);
                }
                updated += 1;
            }
            self.next += 1;
        }

        Ok(CascadeOutcome {
            examined: self.steps.len(),
            updated,
            final_balance: self.final_balance(),
        })
    }
}

/// Balance of the chain entry immediately before `cursor`, or zero.
pub async fn balance_before<S: LedgerStore>(
    store: &S,
    customer_id: CustomerId,
    cursor: ChainCursor,
) -> Result<Decimal, LedgerError> {
    Ok(store
        .find_prior_entry(customer_id, cursor)
        .await?
        .map_or(Decimal::ZERO, |prior| prior.balance))
}

/// Recalculate every chain entry strictly after `anchor`, starting from `pivot`.
///
/// Always reads fresh entries from the store.
pub async fn recalculate_from<S: LedgerStore>(
    store: &S,
    customer_id: CustomerId,
    anchor: Option<ChainCursor>,
    pivot: Decimal,
) -> Result<CascadeOutcome, LedgerError> {
    let entries = store.find_later_entries(customer_id, anchor).await?;
    let mut plan = CascadePlan::build(customer_id, anchor, pivot, &entries);

    tracing::debug!(
        customer_id = %customer_id,
        anchor = ?anchor,
        pivot = %pivot,
        entries = entries.len(),
        "Recalculating balance chain"
    );

    plan.apply(store).await
}

/// Recalculate the chain from the entry at `cursor` onward.
///
/// The anchor is the nearest chain entry before `cursor` and the pivot is its
/// balance, or no anchor and zero when there is none. Works whether or not
/// the entry at `cursor` still exists, which makes it the cascade for edits,
/// approvals and deletions alike.
pub async fn rebalance_from<S: LedgerStore>(
    store: &S,
    customer_id: CustomerId,
    cursor: ChainCursor,
) -> Result<CascadeOutcome, LedgerError> {
    let prior = store.find_prior_entry(customer_id, cursor).await?;
    let (anchor, pivot) = match prior {
        Some(entry) => (Some(entry.cursor()), entry.balance),
        None => (None, Decimal::ZERO),
    };
    recalculate_from(store, customer_id, anchor, pivot).await
}

/// An entry whose stored balance breaks the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainViolation {
    /// The entry.
    pub entry_id: EntryId,
    /// Balance implied by the previous entry.
    pub expected: Decimal,
    /// Balance actually stored.
    pub actual: Decimal,
}

/// Check a complete chain, given in ascending order from the first entry.
#[must_use]
pub fn chain_violations(entries: &[LedgerEntry]) -> Vec<ChainViolation> {
    let mut running = Decimal::ZERO;
    let mut violations = Vec::new();

    for entry in entries {
        let expected = entry.kind.apply(running, entry.amount);
        if entry.balance != expected {
            violations.push(ChainViolation {
                entry_id: entry.id,
                expected,
                actual: entry.balance,
            });
        }
        // Continue from the stored value so one bad entry is reported once.
        running = entry.balance;
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedgerStore;
    use crate::ledger::types::{LedgerRecord, TransactionKind};
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use ledgerbook_shared::types::{SupplierId, UserId};
    use rust_decimal_macros::dec;

    fn entry(
        customer_id: CustomerId,
        second: i64,
        kind: TransactionKind,
        amount: Decimal,
        balance: Decimal,
    ) -> LedgerEntry {
        LedgerEntry {
            id: EntryId::new(),
            customer_id,
            supplier_id: SupplierId::new(),
            kind,
            amount,
            balance,
            notes: None,
            document: None,
            attachments: vec![],
            transaction_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
                + Duration::seconds(second),
            created_by: UserId::new(),
        }
    }

    async fn seed(store: &MemoryLedgerStore, entries: &[LedgerEntry]) {
        for e in entries {
            store
                .insert(LedgerRecord::Approved(e.clone()))
                .await
                .unwrap();
        }
    }

    #[test]
    fn test_plan_accumulates_from_pivot() {
        let customer = CustomerId::new();
        let entries = vec![
            entry(customer, 1, TransactionKind::Invoice, dec!(100), dec!(0)),
            entry(customer, 2, TransactionKind::Payment, dec!(40), dec!(0)),
            entry(customer, 3, TransactionKind::Return, dec!(10), dec!(0)),
        ];

        let plan = CascadePlan::build(customer, None, dec!(5), &entries);
        let balances: Vec<_> = plan.steps().iter().map(|s| s.balance).collect();
        assert_eq!(balances, vec![dec!(105), dec!(65), dec!(55)]);
        assert_eq!(plan.final_balance(), dec!(55));
        assert!(!plan.is_complete());
    }

    #[test]
    fn test_empty_plan_is_complete() {
        let plan = CascadePlan::build(CustomerId::new(), None, dec!(12), &[]);
        assert!(plan.is_complete());
        assert_eq!(plan.final_balance(), dec!(12));
    }

    #[tokio::test]
    async fn test_recalculate_from_start() {
        let store = MemoryLedgerStore::new();
        let customer = CustomerId::new();
        let entries = vec![
            entry(customer, 1, TransactionKind::Invoice, dec!(100), dec!(1)),
            entry(customer, 2, TransactionKind::Payment, dec!(40), dec!(2)),
        ];
        seed(&store, &entries).await;

        let outcome = recalculate_from(&store, customer, None, Decimal::ZERO)
            .await
            .unwrap();
        assert_eq!(outcome.examined, 2);
        assert_eq!(outcome.updated, 2);
        assert_eq!(outcome.final_balance, dec!(60));

        let chain = store.find_later_entries(customer, None).await.unwrap();
        assert!(chain_violations(&chain).is_empty());
    }

    #[tokio::test]
    async fn test_rerun_skips_correct_entries() {
        let store = MemoryLedgerStore::new();
        let customer = CustomerId::new();
        let entries = vec![
            entry(customer, 1, TransactionKind::Invoice, dec!(100), dec!(100)),
            entry(customer, 2, TransactionKind::Payment, dec!(40), dec!(60)),
        ];
        seed(&store, &entries).await;

        let outcome = recalculate_from(&store, customer, None, Decimal::ZERO)
            .await
            .unwrap();
        assert_eq!(outcome.examined, 2);
        assert_eq!(outcome.updated, 0);
    }

    #[tokio::test]
    async fn test_rebalance_uses_prior_entry_as_pivot() {
        let store = MemoryLedgerStore::new();
        let customer = CustomerId::new();
        let entries = vec![
            entry(customer, 1, TransactionKind::Invoice, dec!(100), dec!(100)),
            entry(customer, 2, TransactionKind::Invoice, dec!(50), dec!(0)),
            entry(customer, 3, TransactionKind::Payment, dec!(30), dec!(0)),
        ];
        seed(&store, &entries).await;

        let outcome = rebalance_from(&store, customer, entries[1].cursor())
            .await
            .unwrap();
        assert_eq!(outcome.examined, 2);
        assert_eq!(outcome.final_balance, dec!(120));
    }

    #[tokio::test]
    async fn test_partial_failure_then_retry() {
        let store = MemoryLedgerStore::new();
        let customer = CustomerId::new();
        let entries = vec![
            entry(customer, 1, TransactionKind::Invoice, dec!(10), dec!(0)),
            entry(customer, 2, TransactionKind::Invoice, dec!(20), dec!(0)),
            entry(customer, 3, TransactionKind::Invoice, dec!(30), dec!(0)),
        ];
        seed(&store, &entries).await;

        store.fail_balance_updates_after(1);
        let err = recalculate_from(&store, customer, None, Decimal::ZERO)
            .await
            .unwrap_err();
        match err {
            LedgerError::PartialCascadeFailure {
                anchor,
                pivot,
                applied,
                remaining,
                ..
            } => {
                assert_eq!(anchor, None);
                assert_eq!(pivot, Decimal::ZERO);
                assert_eq!(applied, 1);
                assert_eq!(remaining, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        let chain = store.find_later_entries(customer, None).await.unwrap();
        assert!(!chain_violations(&chain).is_empty());

        store.heal();
        let outcome = recalculate_from(&store, customer, None, Decimal::ZERO)
            .await
            .unwrap();
        assert_eq!(outcome.updated, 2);
        let chain = store.find_later_entries(customer, None).await.unwrap();
        assert!(chain_violations(&chain).is_empty());
        assert_eq!(chain[2].balance, dec!(60));
    }

    #[tokio::test]
    async fn test_plan_resumes_from_progress_index() {
        let store = MemoryLedgerStore::new();
        let customer = CustomerId::new();
        let entries = vec![
            entry(customer, 1, TransactionKind::Invoice, dec!(10), dec!(0)),
            entry(customer, 2, TransactionKind::Invoice, dec!(20), dec!(0)),
        ];
        seed(&store, &entries).await;

        let mut plan = CascadePlan::build(customer, None, Decimal::ZERO, &entries);
        store.fail_balance_updates_after(1);
        assert!(plan.apply(&store).await.is_err());
        assert_eq!(plan.remaining().len(), 1);

        store.heal();
        let outcome = plan.apply(&store).await.unwrap();
        assert!(plan.is_complete());
        assert_eq!(outcome.updated, 1);
    }

    #[test]
    fn test_chain_violations_reports_each_bad_entry_once() {
        let customer = CustomerId::new();
        let entries = vec![
            entry(customer, 1, TransactionKind::Invoice, dec!(100), dec!(100)),
            entry(customer, 2, TransactionKind::Payment, dec!(40), dec!(70)),
            entry(customer, 3, TransactionKind::Invoice, dec!(5), dec!(75)),
        ];

        let violations = chain_violations(&entries);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].entry_id, entries[1].id);
        assert_eq!(violations[0].expected, dec!(60));
        assert_eq!(violations[0].actual, dec!(70));
    }
}
