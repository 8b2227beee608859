//! Property-based tests for WorkflowService.

use ledgerbook_shared::types::{CustomerId, EntryId, UserId};
use proptest::prelude::*;
use uuid::Uuid;

use crate::workflow::approval::Actor;
use crate::workflow::error::WorkflowError;
use crate::workflow::service::{SupersedePolicy, WorkflowService};
use crate::workflow::types::{ApprovalState, LedgerAction, Transition};

fn arb_state() -> impl Strategy<Value = ApprovalState> {
    prop_oneof![
        Just(ApprovalState::Approved),
        Just(ApprovalState::PendingCreateApproval),
        Just(ApprovalState::PendingEditApproval),
    ]
}

fn arb_action() -> impl Strategy<Value = LedgerAction> {
    prop_oneof![
        Just(LedgerAction::Edit),
        Just(LedgerAction::Delete),
        Just(LedgerAction::Approve),
        Just(LedgerAction::Reject),
        Just(LedgerAction::Recalculate),
    ]
}

fn arb_policy() -> impl Strategy<Value = SupersedePolicy> {
    prop_oneof![Just(SupersedePolicy::LatestWins), Just(SupersedePolicy::Reject)]
}

fn arb_customer() -> impl Strategy<Value = CustomerId> {
    any::<u128>().prop_map(|n| CustomerId::from_uuid(Uuid::from_u128(n)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Standard actors never get a transition that touches the balance chain.
    #[test]
    fn prop_standard_never_rebalances(
        state in arb_state(),
        action in arb_action(),
        policy in arb_policy(),
        customer in arb_customer(),
    ) {
        let actor = Actor::standard(UserId::new(), customer);
        let result = WorkflowService::transition(
            &actor, EntryId::new(), customer, state, action, policy,
        );
        if let Ok(transition) = result {
            prop_assert!(!transition.rebalances());
            prop_assert_eq!(action, LedgerAction::Edit);
        }
    }

    /// Standard actors are refused on every customer but their own.
    #[test]
    fn prop_standard_foreign_customer_refused(
        state in arb_state(),
        action in arb_action(),
        policy in arb_policy(),
        own in arb_customer(),
        other in arb_customer(),
    ) {
        prop_assume!(own != other);
        let actor = Actor::standard(UserId::new(), own);
        let result = WorkflowService::transition(
            &actor, EntryId::new(), other, state, action, policy,
        );
        let refused = matches!(result, Err(WorkflowError::NotAuthorized { .. }));
        prop_assert!(refused);
    }

    /// Approve and reject are only legal while something is pending.
    #[test]
    fn prop_resolution_requires_pending_state(
        state in arb_state(),
        approve in any::<bool>(),
    ) {
        let action = if approve { LedgerAction::Approve } else { LedgerAction::Reject };
        let actor = Actor::privileged(UserId::new());
        let result = WorkflowService::transition(
            &actor, EntryId::new(), CustomerId::new(), state, action, SupersedePolicy::LatestWins,
        );
        prop_assert_eq!(result.is_ok(), state.is_pending());
    }

    /// Every granted transition lands in a state consistent with the action.
    #[test]
    fn prop_resulting_state_consistent(
        state in arb_state(),
        action in arb_action(),
        policy in arb_policy(),
    ) {
        let actor = Actor::privileged(UserId::new());
        if let Ok(transition) = WorkflowService::transition(
            &actor, EntryId::new(), CustomerId::new(), state, action, policy,
        ) {
            match action {
                LedgerAction::Delete => prop_assert_eq!(transition, Transition::Delete),
                LedgerAction::Approve => {
                    prop_assert_eq!(transition.resulting_state(), Some(ApprovalState::Approved));
                }
                LedgerAction::Reject => prop_assert!(
                    transition.resulting_state().is_none()
                        || transition.resulting_state() == Some(ApprovalState::Approved)
                ),
                _ => {}
            }
        }
    }
}
