//! Unit and property tests for the request registrar.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;

use super::{QueueOutcome, RequestRegistrar};
use crate::dispatch::TaskQueue;
use crate::request::PendingRequest;
use crate::testing::{MockRequester, SilentPrompter, action_with};
use crate::usage::UsageClass;

fn request_for(owner: u64, capabilities: &[&str]) -> PendingRequest {
    let prompter = Arc::new(SilentPrompter);
    let actions = capabilities
        .iter()
        .copied()
        .map(|capability| action_with(capability, UsageClass::Feature, &prompter))
        .collect();
    PendingRequest::new(
        Arc::new(MockRequester::new(owner)),
        actions,
        TaskQueue::new(),
    )
}

fn masked_request_for(owner: u64, mask: u32, capability: &str) -> PendingRequest {
    let prompter = Arc::new(SilentPrompter);
    PendingRequest::new(
        Arc::new(MockRequester::with_mask(owner, mask)),
        vec![action_with(capability, UsageClass::Feature, &prompter)],
        TaskQueue::new(),
    )
}

fn queued_code(outcome: QueueOutcome) -> u32 {
    match outcome {
        QueueOutcome::Queued(code) => code,
        QueueOutcome::AlreadyPending { code } => {
            panic!("expected a fresh queue, got reconciliation of {code}")
        },
    }
}

#[test]
fn queue_then_get_returns_the_stored_request() {
    let registrar = RequestRegistrar::new();
    let code = queued_code(registrar.queue_request(request_for(1, &["CAMERA"])));

    let stored = registrar.get_request(code).expect("request should be active");
    assert_eq!(stored.capabilities(), vec!["CAMERA".to_owned()]);
    assert!(stored.is_owned_by(&1u64));
}

#[test]
fn remove_then_get_reports_absent() {
    let registrar = RequestRegistrar::new();
    let code = queued_code(registrar.queue_request(request_for(1, &["CAMERA"])));

    let removed = registrar.remove_request(code);
    assert!(removed.is_some());
    assert!(registrar.get_request(code).is_none());
    assert!(registrar.remove_request(code).is_none());
}

#[test]
fn teardown_orphans_then_requeue_reconciles_to_the_same_code() {
    let registrar = RequestRegistrar::new();
    let code = queued_code(registrar.queue_request(request_for(1, &["CAMERA", "MIC"])));

    assert_eq!(registrar.notify_owner_torndown(&1u64), 1);
    assert_eq!(registrar.active_count(), 0);
    assert_eq!(registrar.orphaned_count(), 1);

    // The recreated owner resubmits an equal request: same identity, same
    // ordered action set, fresh callbacks.
    let outcome = registrar.queue_request(request_for(1, &["CAMERA", "MIC"]));
    assert_eq!(outcome, QueueOutcome::AlreadyPending { code });
    assert_eq!(registrar.active_count(), 1);
    assert_eq!(registrar.orphaned_count(), 0);

    // The reconciled record is live again under the original code.
    assert!(registrar.get_request(code).is_some());
}

#[test]
fn stale_orphan_lookup_is_consumed() {
    let registrar = RequestRegistrar::new();
    let code = queued_code(registrar.queue_request(request_for(1, &["CAMERA"])));
    registrar.notify_owner_torndown(&1u64);

    // A stale platform callback arrives for the orphan: consumed, absent.
    assert!(registrar.get_request(code).is_none());
    assert_eq!(registrar.orphaned_count(), 0);

    // Requeuing afterwards finds nothing to reconcile.
    let outcome = registrar.queue_request(request_for(1, &["CAMERA"]));
    assert!(matches!(outcome, QueueOutcome::Queued(_)));
}

#[test]
fn stale_orphan_removal_is_consumed_and_reported_absent() {
    let registrar = RequestRegistrar::new();
    let code = queued_code(registrar.queue_request(request_for(1, &["CAMERA"])));
    registrar.notify_owner_torndown(&1u64);

    assert!(registrar.remove_request(code).is_none());
    assert_eq!(registrar.orphaned_count(), 0);
}

#[test]
fn teardown_only_affects_the_torn_down_owner() {
    let registrar = RequestRegistrar::new();
    let kept = queued_code(registrar.queue_request(request_for(1, &["CAMERA"])));
    let orphaned = queued_code(registrar.queue_request(request_for(2, &["MIC"])));

    assert_eq!(registrar.notify_owner_torndown(&2u64), 1);
    assert!(registrar.get_request(kept).is_some());
    assert!(registrar.get_request(orphaned).is_none());
}

#[test]
fn requeue_with_different_action_order_does_not_reconcile() {
    let registrar = RequestRegistrar::new();
    let code = queued_code(registrar.queue_request(request_for(1, &["CAMERA", "MIC"])));
    registrar.notify_owner_torndown(&1u64);

    // Similar (shared actions) but not the same request: order differs.
    let outcome = registrar.queue_request(request_for(1, &["MIC", "CAMERA"]));
    let new_code = queued_code(outcome);
    assert_ne!(new_code, code);
    assert_eq!(registrar.orphaned_count(), 1);
}

#[test]
fn codes_respect_a_constrained_mask() {
    let registrar = RequestRegistrar::new();
    let mut codes = HashSet::new();
    for owner in 0..8u64 {
        let code = queued_code(
            registrar.queue_request(masked_request_for(owner, 0xF, &format!("CAP_{owner}"))),
        );
        assert!(code <= 0xF);
        assert!(codes.insert(code), "code {code} was handed out twice");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every code handed out as newly queued is unique among tracked
    /// requests until removed, for any sequence of distinct
    /// (owner, action set) pairs.
    #[test]
    fn queued_codes_are_unique_until_removed(
        owners in prop::collection::vec(0u64..8, 1..12),
    ) {
        let registrar = RequestRegistrar::new();
        let mut live = HashSet::new();
        for (i, owner) in owners.into_iter().enumerate() {
            // Distinct capability per queue call keeps the requests
            // distinct even for repeated owners.
            let capability = format!("CAP_{i}");
            let code = queued_code(
                registrar.queue_request(request_for(owner, &[capability.as_str()])),
            );
            prop_assert!(live.insert(code), "code {} already live", code);
        }
        prop_assert_eq!(registrar.active_count(), live.len());
    }
}
