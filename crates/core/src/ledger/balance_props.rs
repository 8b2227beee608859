//! Property-based tests for the balance recalculation engine.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use ledgerbook_shared::types::{CustomerId, EntryId, SupplierId, UserId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::balance::{CascadePlan, chain_violations, recalculate_from};
use super::memory::MemoryLedgerStore;
use super::store::LedgerStore;
use super::types::{LedgerEntry, LedgerRecord, TransactionKind};

fn arb_kind() -> impl Strategy<Value = TransactionKind> {
    prop_oneof![
        Just(TransactionKind::Invoice),
        Just(TransactionKind::Payment),
        Just(TransactionKind::Return),
    ]
}

/// Positive amounts with two decimal places.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

/// Stored balances, deliberately arbitrary.
fn arb_stale_balance() -> impl Strategy<Value = Decimal> {
    (-10_000_000i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn arb_chain() -> impl Strategy<Value = Vec<(TransactionKind, Decimal, Decimal)>> {
    prop::collection::vec((arb_kind(), arb_amount(), arb_stale_balance()), 0..30)
}

fn build_entries(
    customer_id: CustomerId,
    rows: &[(TransactionKind, Decimal, Decimal)],
) -> Vec<LedgerEntry> {
    let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let mut seconds = 0i64;
    rows.iter()
        .map(|(kind, amount, balance)| {
            seconds += 1;
            LedgerEntry {
                id: EntryId::new(),
                customer_id,
                supplier_id: SupplierId::new(),
                kind: *kind,
                amount: *amount,
                balance: *balance,
                notes: None,
                document: None,
                attachments: vec![],
                transaction_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                created_at: start + Duration::seconds(seconds),
                created_by: UserId::new(),
            }
        })
        .collect()
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The last planned balance equals the signed sum of every amount.
    #[test]
    fn prop_plan_final_balance_is_signed_sum(rows in arb_chain()) {
        let customer = CustomerId::new();
        let entries = build_entries(customer, &rows);
        let plan = CascadePlan::build(customer, None, Decimal::ZERO, &entries);

        let expected: Decimal = entries.iter().map(LedgerEntry::signed_amount).sum();
        prop_assert_eq!(plan.final_balance(), expected);
    }

    /// A full recalculation leaves a chain without violations.
    #[test]
    fn prop_recalculation_restores_chain(rows in arb_chain()) {
        let customer = CustomerId::new();
        let entries = build_entries(customer, &rows);
        let store = MemoryLedgerStore::new();

        let chain = runtime().block_on(async {
            for e in &entries {
                store.insert(LedgerRecord::Approved(e.clone())).await.unwrap();
            }
            recalculate_from(&store, customer, None, Decimal::ZERO).await.unwrap();
            store.find_later_entries(customer, None).await.unwrap()
        });

        prop_assert!(chain_violations(&chain).is_empty());
    }

    /// Running the cascade twice from the same anchor gives the same balances
    /// as running it once, and the second run writes nothing.
    #[test]
    fn prop_cascade_idempotent(rows in arb_chain(), anchor_at in 0usize..30) {
        let customer = CustomerId::new();
        let entries = build_entries(customer, &rows);
        let store = MemoryLedgerStore::new();
        let anchor = entries.get(anchor_at).map(LedgerEntry::cursor);
        let pivot = entries.get(anchor_at).map_or(Decimal::ZERO, |e| e.balance);

        let (first, second, once, twice) = runtime().block_on(async {
            for e in &entries {
                store.insert(LedgerRecord::Approved(e.clone())).await.unwrap();
            }
            let first = recalculate_from(&store, customer, anchor, pivot).await.unwrap();
            let once = store.find_later_entries(customer, None).await.unwrap();
            let second = recalculate_from(&store, customer, anchor, pivot).await.unwrap();
            let twice = store.find_later_entries(customer, None).await.unwrap();
            (first, second, once, twice)
        });

        prop_assert_eq!(once, twice);
        prop_assert_eq!(first.final_balance, second.final_balance);
        prop_assert_eq!(second.updated, 0);
    }

    /// Interrupting a cascade at any point and retrying from the same anchor
    /// ends in the same state as an uninterrupted run.
    #[test]
    fn prop_retry_after_partial_failure(rows in arb_chain(), fail_after in 0usize..30) {
        let customer = CustomerId::new();
        let entries = build_entries(customer, &rows);
        let store = MemoryLedgerStore::new();

        let chain = runtime().block_on(async {
            for e in &entries {
                store.insert(LedgerRecord::Approved(e.clone())).await.unwrap();
            }
            store.fail_balance_updates_after(fail_after);
            let _ = recalculate_from(&store, customer, None, Decimal::ZERO).await;
            store.heal();
            recalculate_from(&store, customer, None, Decimal::ZERO).await.unwrap();
            store.find_later_entries(customer, None).await.unwrap()
        });

        prop_assert!(chain_violations(&chain).is_empty());
    }
}
