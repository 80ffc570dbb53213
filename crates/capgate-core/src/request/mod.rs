//! Pending requests: one queued batch of guarded actions.
//!
//! A [`PendingRequest`] is created when at least one action in a check
//! lacks its capability. It is immutable after construction; the registrar
//! moves the record between its active and orphan tables but never mutates
//! it. Reconciliation after owner recreation swaps in a *new* record under
//! the old code, because the old record's callbacks reference the
//! torn-down owner.

use std::any::Any;
use std::sync::Arc;

use crate::action::GuardedAction;
use crate::dispatch::TaskQueue;
use crate::requester::Requester;

/// Identifier for a tracked request, unique among all currently tracked
/// (active and orphaned) requests of one registrar.
pub type RequestCode = u32;

/// One queued batch of guarded actions tied to a request owner.
pub struct PendingRequest {
    requester: Arc<dyn Requester>,
    actions: Vec<GuardedAction>,
    target: TaskQueue,
}

impl PendingRequest {
    /// Bundles `actions` under `requester`, delivering granted-action work
    /// to `target`.
    ///
    /// Action order is significant: it defines the education and request
    /// ordering for the batch.
    #[must_use]
    pub fn new(
        requester: Arc<dyn Requester>,
        actions: Vec<GuardedAction>,
        target: TaskQueue,
    ) -> Self {
        Self {
            requester,
            actions,
            target,
        }
    }

    /// The requester that issued this batch.
    #[must_use]
    pub fn requester(&self) -> &Arc<dyn Requester> {
        &self.requester
    }

    /// The actions in this batch, in submission order.
    #[must_use]
    pub fn actions(&self) -> &[GuardedAction] {
        &self.actions
    }

    /// The action at `index`, if in range.
    #[must_use]
    pub fn action(&self, index: usize) -> Option<&GuardedAction> {
        self.actions.get(index)
    }

    /// Queue for delivering granted-action work on the context that issued
    /// the check.
    #[must_use]
    pub fn target(&self) -> &TaskQueue {
        &self.target
    }

    /// Capability names of all actions, in order.
    #[must_use]
    pub fn capabilities(&self) -> Vec<String> {
        self.actions
            .iter()
            .map(|action| action.claim().capability.clone())
            .collect()
    }

    /// Index of the first action equal to `action`, by capability/usage.
    #[must_use]
    pub fn action_index_of(&self, action: &GuardedAction) -> Option<usize> {
        self.actions.iter().position(|candidate| candidate == action)
    }

    /// Two records are the same request when their owners are equivalent
    /// and their action sequences are pairwise equal, in order and count.
    #[must_use]
    pub fn is_same_request(&self, other: &Self) -> bool {
        self.actions == other.actions
            && self.requester.is_same_owner(other.requester.as_ref())
    }

    /// Two records are similar when they share at least one equal action.
    #[must_use]
    pub fn is_similar_request(&self, other: &Self) -> bool {
        self.actions
            .iter()
            .any(|action| other.actions.contains(action))
    }

    /// Whether this request belongs to the owner named by `identity`.
    #[must_use]
    pub fn is_owned_by(&self, identity: &dyn Any) -> bool {
        self.requester.is_torn_down_owner_of(identity)
    }
}

impl std::fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequest")
            .field("actions", &self.actions)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockRequester, SilentPrompter, action_with};
    use crate::usage::UsageClass;

    fn request(owner: u64, capabilities: &[(&str, UsageClass)]) -> PendingRequest {
        let prompter = Arc::new(SilentPrompter);
        let actions = capabilities
            .iter()
            .copied()
            .map(|(capability, usage)| action_with(capability, usage, &prompter))
            .collect();
        PendingRequest::new(Arc::new(MockRequester::new(owner)), actions, TaskQueue::new())
    }

    #[test]
    fn same_request_needs_matching_owner_and_ordered_actions() {
        let a = request(1, &[("CAMERA", UsageClass::Feature), ("MIC", UsageClass::Optional)]);
        let b = request(1, &[("CAMERA", UsageClass::Feature), ("MIC", UsageClass::Optional)]);
        assert!(a.is_same_request(&b));
        assert!(b.is_same_request(&a));
    }

    #[test]
    fn different_owner_is_not_the_same_request() {
        let a = request(1, &[("CAMERA", UsageClass::Feature)]);
        let b = request(2, &[("CAMERA", UsageClass::Feature)]);
        assert!(!a.is_same_request(&b));
        assert!(a.is_similar_request(&b));
    }

    #[test]
    fn reordered_actions_are_similar_but_not_the_same() {
        let a = request(1, &[("CAMERA", UsageClass::Feature), ("MIC", UsageClass::Optional)]);
        let b = request(1, &[("MIC", UsageClass::Optional), ("CAMERA", UsageClass::Feature)]);
        assert!(!a.is_same_request(&b));
        assert!(a.is_similar_request(&b));
    }

    #[test]
    fn disjoint_actions_are_not_similar() {
        let a = request(1, &[("CAMERA", UsageClass::Feature)]);
        let b = request(1, &[("MIC", UsageClass::Feature)]);
        assert!(!a.is_similar_request(&b));
    }

    #[test]
    fn action_lookup_is_by_equality() {
        let req = request(1, &[("CAMERA", UsageClass::Feature), ("MIC", UsageClass::Optional)]);
        let probe = action_with("MIC", UsageClass::Optional, &Arc::new(SilentPrompter));
        assert_eq!(req.action_index_of(&probe), Some(1));

        let missing = action_with("MIC", UsageClass::Feature, &Arc::new(SilentPrompter));
        assert_eq!(req.action_index_of(&missing), None);
    }

    #[test]
    fn ownership_is_delegated_to_the_requester() {
        let req = request(7, &[("CAMERA", UsageClass::Feature)]);
        assert!(req.is_owned_by(&7u64));
        assert!(!req.is_owned_by(&8u64));
        assert!(!req.is_owned_by(&"seven"));
    }
}
