//! # capgate-core
//!
//! Coordination core for requesting guarded platform capabilities
//! (runtime permissions) on behalf of an application.
//!
//! The crate tracks in-flight capability requests, deduplicates
//! concurrent equivalent requests, survives its request owners being torn
//! down and recreated mid-request, and drives the decision procedure that
//! determines whether a capability check succeeds immediately, must be
//! requested from the platform, or must first educate the user.
//!
//! ## Core Concepts
//!
//! - **Guarded action**: one protected operation — a capability, its
//!   [`UsageClass`], grant/deny listener, prompt surface, and the closure
//!   to run once granted ([`GuardedAction`])
//! - **Request**: a batch of guarded actions queued under one
//!   [`RequestCode`], tied to a request owner ([`PendingRequest`])
//! - **Registrar**: the active/orphan tables tracking every in-flight
//!   request and reconciling resubmissions after owner recreation
//!   ([`RequestRegistrar`])
//! - **Coordinator**: check-then-act plus the result-dispatch state
//!   machine sequencing education, platform requests, and grant/deny
//!   notification ([`Coordinator`])
//!
//! The platform itself stays behind three capability traits the host
//! implements: [`Requester`] (check/request primitives and owner
//! identity), [`UserPrompter`] (education and denial UI), and
//! [`EducationStore`] (persistent "already educated" flags).
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use capgate_core::{
//!     Coordinator, GuardedAction, MemoryEducationStore, TaskQueue, UsageClass,
//! };
//!
//! let ui = TaskQueue::new();
//! let coordinator = Arc::new(Coordinator::new(
//!     Arc::new(MemoryEducationStore::new()),
//!     ui.clone(),
//! ));
//!
//! let action = GuardedAction::builder()
//!     .capability("CAMERA")
//!     .usage(UsageClass::Feature)
//!     .prompter(my_prompter)
//!     .on_granted(|_| take_picture())
//!     .build()?;
//!
//! coordinator.check_and_execute(my_requester, vec![action]);
//! // ... the host's UI loop drains `ui`; the platform answers through
//! // `coordinator.on_permission_result(code, capabilities, grants)`.
//! ```

pub mod action;
pub mod coordinator;
pub mod dispatch;
pub mod education;
pub mod registrar;
pub mod request;
pub mod requester;
pub mod usage;

#[cfg(test)]
pub(crate) mod testing;

pub use action::{
    ActionBuildError, ActionHandler, CapabilityUse, GuardedAction, GuardedActionBuilder,
    NoopListener, ResultListener, UserPrompter,
};
pub use coordinator::{AcknowledgeError, Coordinator, GrantResult};
pub use dispatch::{Task, TaskQueue};
pub use education::{EducationStore, MemoryEducationStore};
pub use registrar::{QueueOutcome, RequestRegistrar};
pub use request::{PendingRequest, RequestCode};
pub use requester::{DEFAULT_CODE_MASK, Requester};
pub use usage::{DenialUi, UsageClass};
