//! Education flag store: "have we already explained this capability?"
//!
//! The coordinator keeps two flags per [`CapabilityUse`]: whether the user
//! has been educated, and a one-shot reset marker driving the alternating
//! re-show cadence for `Feature` usage. Where the flags live is the host's
//! business; [`MemoryEducationStore`] is provided for hosts without
//! persistence and for tests.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::action::CapabilityUse;

/// Persistent flags tracking education state per capability/usage pair.
///
/// Implementations must be safe for concurrent use; the only ordering
/// guarantee callers rely on is read-after-write on the same key.
pub trait EducationStore: Send + Sync {
    /// Has education been shown for this claim?
    fn is_educated(&self, claim: &CapabilityUse) -> bool;

    /// Record that education has been shown for this claim.
    fn set_educated(&self, claim: &CapabilityUse);

    /// Is the one-shot re-show marker set for this claim?
    fn is_reset_pending(&self, claim: &CapabilityUse) -> bool;

    /// Set the one-shot re-show marker.
    fn set_reset_pending(&self, claim: &CapabilityUse);

    /// Clear the one-shot re-show marker.
    fn clear_reset_pending(&self, claim: &CapabilityUse);
}

/// Process-local [`EducationStore`] backed by hash sets.
#[derive(Debug, Default)]
pub struct MemoryEducationStore {
    educated: Mutex<HashSet<String>>,
    reset_pending: Mutex<HashSet<String>>,
}

impl MemoryEducationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EducationStore for MemoryEducationStore {
    fn is_educated(&self, claim: &CapabilityUse) -> bool {
        self.educated.lock().unwrap().contains(&claim.store_key())
    }

    fn set_educated(&self, claim: &CapabilityUse) {
        self.educated.lock().unwrap().insert(claim.store_key());
    }

    fn is_reset_pending(&self, claim: &CapabilityUse) -> bool {
        self.reset_pending
            .lock()
            .unwrap()
            .contains(&claim.store_key())
    }

    fn set_reset_pending(&self, claim: &CapabilityUse) {
        self.reset_pending.lock().unwrap().insert(claim.store_key());
    }

    fn clear_reset_pending(&self, claim: &CapabilityUse) {
        self.reset_pending.lock().unwrap().remove(&claim.store_key());
    }
}
