//! Request registrar: lifecycle tracking for in-flight permission requests.
//!
//! The registrar owns two tables keyed by [`RequestCode`]:
//!
//! ```text
//! queue_request --> active
//!                     |  notify_owner_torndown(owner)
//!                     v
//!                  orphaned
//!                     |  queue_request(same request)   --> active (reconciled, same code)
//!                     |  get_request / remove_request  --> consumed (stale)
//! ```
//!
//! # Key concepts
//!
//! - **Active**: the platform may still deliver a result for this code.
//! - **Orphaned**: the owning UI container was torn down while the request
//!   was in flight. The record is kept so that an equivalent request from
//!   the recreated owner can be reconciled onto the same code instead of
//!   re-triggering request UI.
//! - **Reconciliation**: queuing a request that
//!   [is the same request](crate::PendingRequest::is_same_request) as an
//!   orphan replaces the orphan under its original code. The *new* record
//!   wins, because its callbacks reference the recreated owner.
//!
//! A code lives in at most one table at a time, and a code handed out by
//! [`RequestRegistrar::queue_request`] is never present in either table at
//! the moment of return. All table access is serialized under one lock per
//! registrar instance.
//!
//! Unknown codes are never fatal: lookups degrade to `None` with a
//! diagnostic. There is no capacity bound on the orphan table; an owner
//! that is torn down and never recreated leaks one entry per outstanding
//! request until a stale lookup consumes it. Volume is bounded by how many
//! permission prompts can be in flight at once, which is small.

pub mod allocator;

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::request::{PendingRequest, RequestCode};

#[cfg(test)]
mod tests;

/// Outcome of queuing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOutcome {
    /// The request was stored under a freshly allocated code. The caller
    /// drives education and the platform request forward.
    Queued(RequestCode),

    /// An equivalent request was already in flight (found orphaned and
    /// reconciled back to active under its original code). The caller must
    /// not re-trigger any request UI. The code is reported for diagnostics
    /// and result delivery only.
    AlreadyPending {
        /// The original code the reconciled request is tracked under.
        code: RequestCode,
    },
}

#[derive(Default)]
struct Tables {
    active: HashMap<RequestCode, Arc<PendingRequest>>,
    orphaned: HashMap<RequestCode, Arc<PendingRequest>>,
}

/// Tracks active and orphaned requests for one coordinator instance.
#[derive(Default)]
pub struct RequestRegistrar {
    tables: Mutex<Tables>,
}

impl RequestRegistrar {
    /// Creates a registrar with empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `request` and returns how it was queued.
    ///
    /// A code is allocated against membership in both tables, using the
    /// mask of the request's owner kind. If an orphan is the same request
    /// as `request`, the orphan's code is reused and the new record
    /// replaces it in the active table; see [`QueueOutcome::AlreadyPending`].
    pub fn queue_request(&self, request: PendingRequest) -> QueueOutcome {
        let mask = request.requester().request_code_mask();
        let request = Arc::new(request);

        let mut tables = self.tables.lock().unwrap();
        let code = allocator::allocate(mask, |candidate| {
            tables.active.contains_key(&candidate) || tables.orphaned.contains_key(&candidate)
        });

        let reconciled = tables
            .orphaned
            .iter()
            .find(|(_, orphan)| orphan.is_same_request(&request))
            .map(|(code, _)| *code);
        if let Some(code) = reconciled {
            tables.orphaned.remove(&code);
            tables.active.insert(code, request);
            tracing::debug!(code, "queue_request: reconciled orphaned request");
            return QueueOutcome::AlreadyPending { code };
        }

        tables.active.insert(code, request);
        tracing::debug!(code, "queue_request: queued new request");
        QueueOutcome::Queued(code)
    }

    /// Looks up the active request for `code`.
    ///
    /// A hit in the orphan table is a stale platform callback arriving
    /// after the owner was torn down; the orphan is consumed and the
    /// lookup reports `None`.
    #[must_use]
    pub fn get_request(&self, code: RequestCode) -> Option<Arc<PendingRequest>> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(request) = tables.active.get(&code) {
            return Some(Arc::clone(request));
        }

        if tables.orphaned.remove(&code).is_some() {
            tracing::info!(code, "get_request: consumed stale orphan");
        } else {
            tracing::warn!(code, "get_request: request not found");
        }
        None
    }

    /// Removes and returns the active request for `code`.
    ///
    /// As with [`get_request`](Self::get_request), an orphan hit is
    /// consumed as stale and reported as `None`.
    pub fn remove_request(&self, code: RequestCode) -> Option<Arc<PendingRequest>> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(request) = tables.active.remove(&code) {
            tracing::debug!(code, "remove_request: removed active request");
            return Some(request);
        }

        if tables.orphaned.remove(&code).is_some() {
            tracing::info!(code, "remove_request: consumed stale orphan");
        } else {
            tracing::warn!(code, "remove_request: request not found");
        }
        None
    }

    /// Moves every active request owned by `identity` to the orphan table.
    ///
    /// Invoked by whatever collaborator observes owner teardown (a UI
    /// lifecycle hook, a window close handler). Codes are unchanged and
    /// records are not mutated, so a later equivalent `queue_request` can
    /// reconcile them. Returns how many requests were orphaned.
    pub fn notify_owner_torndown(&self, identity: &dyn Any) -> usize {
        let mut tables = self.tables.lock().unwrap();
        let torn_down: Vec<RequestCode> = tables
            .active
            .iter()
            .filter(|(_, request)| request.is_owned_by(identity))
            .map(|(code, _)| *code)
            .collect();

        for code in &torn_down {
            if let Some(request) = tables.active.remove(code) {
                tracing::debug!(code, "notify_owner_torndown: orphaning request");
                tables.orphaned.insert(*code, request);
            }
        }
        torn_down.len()
    }

    /// Number of active requests.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.tables.lock().unwrap().active.len()
    }

    /// Number of orphaned requests.
    #[must_use]
    pub fn orphaned_count(&self) -> usize {
        self.tables.lock().unwrap().orphaned.len()
    }
}

impl std::fmt::Debug for RequestRegistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.lock().unwrap();
        f.debug_struct("RequestRegistrar")
            .field("active", &tables.active.len())
            .field("orphaned", &tables.orphaned.len())
            .finish()
    }
}
