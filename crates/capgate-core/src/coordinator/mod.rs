//! The coordinator: check-then-act and the result-dispatch state machine.
//!
//! # Architecture
//!
//! ```text
//! check_and_execute(requester, actions)
//!     |
//!     +-- granted actions: listener + handler fire inline, caller's context
//!     |
//!     +-- pending actions --> registrar.queue_request --> code
//!             |
//!             +-- AlreadyPending: stop, an equivalent request is in flight
//!             |
//!             +-- education needed --> ShowEducate ops on the UI queue
//!             |       |
//!             |       +-- Essential: modal prompt, PAUSE until
//!             |       |   mark_educate_modal_done(code, action)
//!             |       |
//!             |       +-- Optional/Feature: contextual prompt; the scan
//!             |           continues, the pass ends without requesting
//!             |
//!             +-- requester.request_permissions(capabilities, code)
//!                     |
//!                     v  (host platform, async)
//! on_permission_result(code, capabilities, grants)
//!     |  (delivery marshaled onto the UI queue)
//!     +-- grant: listener on the UI queue, handler posted to the
//!     |          record's target
//!     +-- deny:  denial UI op, then deny-notify
//! ```
//!
//! Public entry points may be called from any thread. Everything the state
//! machine does afterwards (education steps, result delivery, denial
//! prompts, denial notification, settings navigation) is posted to the
//! UI-affined [`TaskQueue`] the coordinator was built with, so prompts and
//! listeners observe a single-threaded view. Granted-action handlers are
//! the one exception: they are posted to the dispatch target captured when
//! the check was issued, preserving "the callback runs on the context that
//! asked".
//!
//! The only true suspension point is the Essential education modal: the
//! sequence parks on a `(code, action index)` pair until the host
//! acknowledges the modal. No timeout is enforced; a host that never
//! acknowledges leaks the request and blocks later education indices in
//! the same batch.

mod error;


use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub use error::AcknowledgeError;

use crate::action::GuardedAction;
use crate::dispatch::TaskQueue;
use crate::education::EducationStore;
use crate::registrar::{QueueOutcome, RequestRegistrar};
use crate::request::{PendingRequest, RequestCode};
use crate::requester::Requester;
use crate::usage::{DenialUi, UsageClass};

/// Platform answer for one requested capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantResult {
    /// The user granted the capability.
    Granted,
    /// The user denied the capability.
    Denied,
}

impl GrantResult {
    /// Returns `true` for [`GrantResult::Granted`].
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Work items of the result-dispatch state machine.
///
/// Every variant runs on the UI-affined queue except `RunAction`, which
/// runs on the dispatch target of the request it belongs to.
enum DispatchOp {
    /// Run a granted action's handler.
    RunAction { action: GuardedAction },

    /// Deliver the platform's grant/deny result for a tracked request.
    DeliverResult {
        code: RequestCode,
        request: Arc<PendingRequest>,
        capabilities: Vec<String>,
        grants: Vec<GrantResult>,
    },

    /// Run one education step for the action at `index`.
    ShowEducate { code: RequestCode, index: usize },

    /// A Critical capability was denied; show the terminal modal.
    ShowDeniedCritical {
        request: Arc<PendingRequest>,
        index: usize,
    },

    /// An Essential capability was denied; show the reminder, then notify.
    ShowDeniedReminder {
        request: Arc<PendingRequest>,
        index: usize,
        code: RequestCode,
    },

    /// A Feature/Optional capability was denied with rationale available;
    /// show feedback, then notify.
    ShowDeniedFeedback {
        request: Arc<PendingRequest>,
        index: usize,
        code: RequestCode,
    },

    /// Notify the listener of a denial. `release` names a request whose
    /// denial UI has now completed.
    NotifyDenied {
        action: GuardedAction,
        release: Option<RequestCode>,
    },

    /// Open the platform's per-application settings surface.
    OpenSettings { requester: Arc<dyn Requester> },
}

/// Why a request is still tracked after its platform result was processed.
struct Retention {
    /// Denial UI passes (reminder/feedback) that have not completed yet.
    pending_ui: usize,
    /// A denied-critical modal was shown; the record is never auto-removed
    /// since the application is expected to exit from that modal.
    pinned: bool,
}

/// Process-wide entry point for checking, requesting, and dispatching
/// guarded actions.
///
/// Construct one per process (or one per test) with the UI-affined queue
/// and an [`EducationStore`]; share it as an `Arc`.
pub struct Coordinator {
    registrar: RequestRegistrar,
    education: Arc<dyn EducationStore>,
    ui: TaskQueue,
    paused: Mutex<HashMap<RequestCode, usize>>,
    retained: Mutex<HashMap<RequestCode, Retention>>,
    /// Requests whose current education pass included a contextual prompt.
    /// The pass still scans forward, but its final platform dispatch is
    /// suppressed and the record discarded instead.
    educate_only: Mutex<HashSet<RequestCode>>,
}

impl Coordinator {
    /// Creates a coordinator dispatching UI work to `ui`.
    #[must_use]
    pub fn new(education: Arc<dyn EducationStore>, ui: TaskQueue) -> Self {
        Self {
            registrar: RequestRegistrar::new(),
            education,
            ui,
            paused: Mutex::new(HashMap::new()),
            retained: Mutex::new(HashMap::new()),
            educate_only: Mutex::new(HashSet::new()),
        }
    }

    /// The registrar tracking this coordinator's requests.
    #[must_use]
    pub fn registrar(&self) -> &RequestRegistrar {
        &self.registrar
    }

    /// Forwards an owner-teardown notification to the registrar.
    pub fn notify_owner_torndown(&self, identity: &dyn Any) -> usize {
        self.registrar.notify_owner_torndown(identity)
    }

    /// Checks each action and either runs it or queues a request.
    ///
    /// Actions whose capability is already granted fire synchronously in
    /// the caller's context: listener first, handler second. The rest are
    /// bundled into one request; if any of them requires education, the
    /// education sequence starts on the UI queue, otherwise the platform
    /// request is dispatched immediately. If an equivalent request is
    /// already in flight (owner recreated mid-request), nothing further
    /// happens — the in-flight request's result will cover this one.
    pub fn check_and_execute(
        self: &Arc<Self>,
        requester: Arc<dyn Requester>,
        actions: Vec<GuardedAction>,
    ) {
        let mut pending = Vec::new();
        let mut first_education = None;

        for action in actions {
            if requester.check_granted(&action.claim().capability) {
                action.listener().on_granted(action.claim());
                action.run_handler();
                continue;
            }

            if action.requires_education() && first_education.is_none() {
                tracing::debug!(
                    capability = %action.claim().capability,
                    index = pending.len(),
                    "check_and_execute: action requires education"
                );
                first_education = Some(pending.len());
            }
            pending.push(action);
        }

        if pending.is_empty() {
            return;
        }

        let target = requester.dispatch_target();
        let request = PendingRequest::new(requester, pending, target);
        match self.registrar.queue_request(request) {
            QueueOutcome::AlreadyPending { code } => {
                tracing::debug!(code, "check_and_execute: equivalent request already in flight");
            },
            QueueOutcome::Queued(code) => match first_education {
                Some(index) => self.post_ui(DispatchOp::ShowEducate { code, index }),
                None => self.dispatch_request(code),
            },
        }
    }

    /// Batch-requests `Critical`/`Essential` capabilities up front.
    ///
    /// Actions with any other usage are dropped with a diagnostic. The
    /// surviving actions are rebuilt with a no-op handler (listener and
    /// prompter preserved) and routed through
    /// [`check_and_execute`](Self::check_and_execute): the caller gets
    /// grant/deny notification and any education or denial UI, but no
    /// deferred work runs.
    pub fn check_and_request_mandatory(
        self: &Arc<Self>,
        requester: Arc<dyn Requester>,
        actions: Vec<GuardedAction>,
    ) {
        let revised: Vec<GuardedAction> = actions
            .into_iter()
            .filter_map(|action| {
                if action.claim().usage.is_mandatory() {
                    Some(action.with_noop_handler())
                } else {
                    tracing::warn!(
                        capability = %action.claim().capability,
                        usage = %action.claim().usage,
                        "check_and_request_mandatory: dropping non-mandatory action"
                    );
                    None
                }
            })
            .collect();

        self.check_and_execute(requester, revised);
    }

    /// Delivers the platform's asynchronous grant/deny result.
    ///
    /// The host must invoke this when the platform permission prompt for
    /// `code` completes. `capabilities` and `grants` are parallel slices
    /// in whatever order the platform reports; results are matched to
    /// actions by capability name, never by position. Only the code lookup
    /// runs on the calling thread; matching, listener notification, and
    /// denial routing are marshaled onto the UI-affined queue. Returns
    /// `false` when `code` is not a request this coordinator is tracking,
    /// so hosts can fall through to their own handling.
    pub fn on_permission_result(
        self: &Arc<Self>,
        code: RequestCode,
        capabilities: &[String],
        grants: &[GrantResult],
    ) -> bool {
        let Some(request) = self.registrar.get_request(code) else {
            tracing::warn!(code, "on_permission_result: unknown request");
            return false;
        };
        if capabilities.len() != grants.len() {
            tracing::warn!(
                code,
                capabilities = capabilities.len(),
                grants = grants.len(),
                "on_permission_result: result slices differ in length"
            );
        }

        self.post_ui(DispatchOp::DeliverResult {
            code,
            request,
            capabilities: capabilities.to_vec(),
            grants: grants.to_vec(),
        });
        true
    }

    /// Matches results to actions and routes grant/deny handling. Runs on
    /// the UI-affined queue.
    fn deliver_result(
        self: &Arc<Self>,
        code: RequestCode,
        request: &Arc<PendingRequest>,
        capabilities: &[String],
        grants: &[GrantResult],
    ) {
        let mut granted = Vec::new();
        let mut denials = Vec::new();
        let mut pending_ui = 0usize;
        let mut pinned = false;

        for (capability, grant) in capabilities.iter().zip(grants) {
            for (index, action) in request.actions().iter().enumerate() {
                if action.claim().capability != *capability {
                    continue;
                }

                if grant.is_granted() {
                    action.listener().on_granted(action.claim());
                    granted.push(action.clone());
                    continue;
                }

                let rationale = request.requester().should_show_rationale(capability);
                match action.claim().usage.denial_ui(rationale) {
                    DenialUi::Critical => {
                        pinned = true;
                        denials.push(DispatchOp::ShowDeniedCritical {
                            request: Arc::clone(request),
                            index,
                        });
                    },
                    DenialUi::Reminder => {
                        pending_ui += 1;
                        denials.push(DispatchOp::ShowDeniedReminder {
                            request: Arc::clone(request),
                            index,
                            code,
                        });
                    },
                    DenialUi::Feedback => {
                        pending_ui += 1;
                        denials.push(DispatchOp::ShowDeniedFeedback {
                            request: Arc::clone(request),
                            index,
                            code,
                        });
                    },
                    DenialUi::NotifyOnly => {
                        denials.push(DispatchOp::NotifyDenied {
                            action: action.clone(),
                            release: None,
                        });
                    },
                }
            }
        }

        // The retention entry must exist before any denial UI pass can
        // complete and try to release it.
        if pinned || pending_ui > 0 {
            self.retained
                .lock()
                .unwrap()
                .insert(code, Retention { pending_ui, pinned });
        } else {
            self.registrar.remove_request(code);
        }

        for action in granted {
            self.post_to(request.target(), DispatchOp::RunAction { action });
        }
        for op in denials {
            self.post_ui(op);
        }
    }

    /// Resumes an education sequence paused on an Essential modal.
    ///
    /// Persists the educated flag for the acknowledged action and re-enters
    /// the sequence at the same index, which then advances to the next
    /// education-requiring action or dispatches the platform request.
    ///
    /// # Errors
    ///
    /// Returns an [`AcknowledgeError`] if `code` is unknown, the action's
    /// usage is not `Essential`, or the action is not part of the request's
    /// action set.
    pub fn mark_educate_modal_done(
        self: &Arc<Self>,
        code: RequestCode,
        action: &GuardedAction,
    ) -> Result<(), AcknowledgeError> {
        let Some(request) = self.registrar.get_request(code) else {
            tracing::warn!(code, "mark_educate_modal_done: unknown request");
            return Err(AcknowledgeError::UnknownRequest { code });
        };

        if action.claim().usage != UsageClass::Essential {
            return Err(AcknowledgeError::NotEssential {
                capability: action.claim().capability.clone(),
                usage: action.claim().usage,
            });
        }

        let Some(index) = request.action_index_of(action) else {
            return Err(AcknowledgeError::ActionNotInRequest {
                capability: action.claim().capability.clone(),
                code,
            });
        };

        self.education.set_educated(action.claim());
        self.paused.lock().unwrap().remove(&code);
        self.post_ui(DispatchOp::ShowEducate { code, index });
        Ok(())
    }

    /// Requests the platform settings surface on the UI-affined context.
    pub fn open_settings(self: &Arc<Self>, requester: Arc<dyn Requester>) {
        self.post_ui(DispatchOp::OpenSettings { requester });
    }

    /// Paused `(code, action index)` education pairs, for host diagnostics.
    #[must_use]
    pub fn paused_educations(&self) -> Vec<(RequestCode, usize)> {
        self.paused
            .lock()
            .unwrap()
            .iter()
            .map(|(code, index)| (*code, *index))
            .collect()
    }

    /// Sends the platform permission request for everything in `code`.
    fn dispatch_request(&self, code: RequestCode) {
        if let Some(request) = self.registrar.get_request(code) {
            let capabilities = request.capabilities();
            tracing::debug!(code, count = capabilities.len(), "dispatching platform request");
            request.requester().request_permissions(&capabilities, code);
        }
    }

    /// Runs one education step for the action at `index`.
    ///
    /// The Feature cadence: once education has been shown for a Feature
    /// claim, the next visit is suppressed and a reset marker set; the
    /// visit after that clears the marker and shows education again, and
    /// so on, alternating.
    fn step_education(self: &Arc<Self>, code: RequestCode, index: usize) {
        let Some(request) = self.registrar.get_request(code) else {
            tracing::warn!(code, "education step: unknown request");
            return;
        };
        let Some(action) = request.action(index) else {
            tracing::warn!(code, index, "education step: action index out of range");
            return;
        };

        let claim = action.claim();
        let mut educated = self.education.is_educated(claim);

        if educated && claim.usage == UsageClass::Feature {
            if self.education.is_reset_pending(claim) {
                self.education.clear_reset_pending(claim);
                educated = false;
            } else {
                // First revisit after education: suppressed.
                self.education.set_reset_pending(claim);
            }
        }

        if !educated {
            if claim.usage == UsageClass::Essential {
                // Park until the host acknowledges the modal.
                self.paused.lock().unwrap().insert(code, index);
                action.prompter().show_educate_modal(action, code);
                return;
            }

            // Contextual education makes the pass non-requesting: the
            // application must run the check again to actually request.
            // The scan still visits later education indices.
            action.prompter().show_educate(action);
            self.education.set_educated(claim);
            self.educate_only.lock().unwrap().insert(code);
        }

        self.advance_education(&request, code, index);
    }

    /// Moves to the next education-requiring action. When none remain the
    /// pass ends: the platform request goes out, unless a contextual
    /// education step marked the pass non-requesting, in which case the
    /// record is discarded.
    fn advance_education(self: &Arc<Self>, request: &PendingRequest, code: RequestCode, index: usize) {
        for next in (index + 1)..request.actions().len() {
            if request.actions()[next].requires_education() {
                self.post_ui(DispatchOp::ShowEducate { code, index: next });
                return;
            }
        }
        if self.educate_only.lock().unwrap().remove(&code) {
            self.registrar.remove_request(code);
            return;
        }
        self.dispatch_request(code);
    }

    /// A denial UI pass for `code` completed; remove the record once the
    /// last one finishes (unless pinned by a denied-critical modal).
    fn release_denial_ui(&self, code: RequestCode) {
        let mut retained = self.retained.lock().unwrap();
        let Some(retention) = retained.get_mut(&code) else {
            return;
        };
        retention.pending_ui = retention.pending_ui.saturating_sub(1);
        if retention.pending_ui == 0 && !retention.pinned {
            retained.remove(&code);
            drop(retained);
            self.registrar.remove_request(code);
        }
    }

    /// Executes one state-machine step. Runs on the queue the op was
    /// posted to.
    fn process(self: &Arc<Self>, op: DispatchOp) {
        match op {
            DispatchOp::RunAction { action } => action.run_handler(),

            DispatchOp::DeliverResult {
                code,
                request,
                capabilities,
                grants,
            } => self.deliver_result(code, &request, &capabilities, &grants),

            DispatchOp::ShowEducate { code, index } => self.step_education(code, index),

            DispatchOp::ShowDeniedCritical { request, index } => {
                if let Some(action) = request.action(index) {
                    action.prompter().show_denied_critical(action);
                    // No deny-notify here: the modal's exit action is the
                    // denial notification for Critical usage.
                }
            },

            DispatchOp::ShowDeniedReminder { request, index, code } => {
                if let Some(action) = request.action(index) {
                    action.prompter().show_denied_reminder(action);
                    self.post_ui(DispatchOp::NotifyDenied {
                        action: action.clone(),
                        release: Some(code),
                    });
                }
            },

            DispatchOp::ShowDeniedFeedback { request, index, code } => {
                if let Some(action) = request.action(index) {
                    action.prompter().show_denied_feedback(action);
                    self.post_ui(DispatchOp::NotifyDenied {
                        action: action.clone(),
                        release: Some(code),
                    });
                }
            },

            DispatchOp::NotifyDenied { action, release } => {
                action.listener().on_denied(action.claim());
                if let Some(code) = release {
                    self.release_denial_ui(code);
                }
            },

            DispatchOp::OpenSettings { requester } => requester.open_settings(),
        }
    }

    /// Posts an op to the UI-affined queue.
    fn post_ui(self: &Arc<Self>, op: DispatchOp) {
        self.post_to(&self.ui, op);
    }

    /// Posts an op to an arbitrary queue.
    fn post_to(self: &Arc<Self>, queue: &TaskQueue, op: DispatchOp) {
        let this = Arc::clone(self);
        queue.post(move || this.process(op));
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("registrar", &self.registrar)
            .field("paused", &self.paused.lock().unwrap().len())
            .finish_non_exhaustive()
    }
}
