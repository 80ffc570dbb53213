//! Guarded actions: the unit of work protected by a capability.
//!
//! A [`GuardedAction`] bundles everything the coordinator needs to run one
//! protected operation: the capability it needs, how the application uses
//! it ([`UsageClass`]), a [`ResultListener`] for grant/deny notification, a
//! [`UserPrompter`] for education and denial UI, and the closure to run
//! once the capability is granted.
//!
//! Two actions are equal when their [`CapabilityUse`] matches; the attached
//! callbacks are irrelevant. This is what lets a request survive its owner
//! being torn down and recreated: the recreated owner submits actions with
//! fresh callbacks, and they still compare equal to the ones tracked in the
//! orphaned request.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::RequestCode;
use crate::usage::UsageClass;

/// A capability name paired with its usage classification.
///
/// This is the identity of a guarded action and the key under which
/// education flags are stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapabilityUse {
    /// Platform capability name, e.g. `"CAMERA"`.
    pub capability: String,

    /// How the application uses the capability.
    pub usage: UsageClass,
}

impl CapabilityUse {
    /// Creates a new capability/usage pair.
    pub fn new(capability: impl Into<String>, usage: UsageClass) -> Self {
        Self {
            capability: capability.into(),
            usage,
        }
    }

    /// Stable key for flag stores, `"<capability>:<usage>"`.
    #[must_use]
    pub fn store_key(&self) -> String {
        format!("{}:{}", self.capability, self.usage)
    }
}

impl fmt::Display for CapabilityUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.capability, self.usage)
    }
}

/// Grant/deny notification callback.
///
/// Called as soon as the outcome for a capability is known. On grants the
/// listener fires before the action closure runs, so the application can
/// adjust state the closure depends on. On denials the listener fires after
/// any denial UI has been dispatched. Implementations must not present
/// their own prompts; the coordinator already routes denial UI through the
/// [`UserPrompter`].
pub trait ResultListener: Send + Sync {
    /// The capability was granted.
    fn on_granted(&self, claim: &CapabilityUse);

    /// The capability was denied.
    fn on_denied(&self, claim: &CapabilityUse);
}

/// Listener that ignores every notification.
///
/// Installed by the builder when the application does not supply one.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl ResultListener for NoopListener {
    fn on_granted(&self, _claim: &CapabilityUse) {}

    fn on_denied(&self, _claim: &CapabilityUse) {}
}

/// User-facing prompt surface for one action.
///
/// All methods are invoked on the UI-affined execution context. The
/// implementation renders whatever the host platform uses for modals,
/// snackbars, or sheets; the coordinator only decides *which* prompt to
/// show and *when*.
pub trait UserPrompter: Send + Sync {
    /// Show the modal education prompt for an `Essential` action.
    ///
    /// The education sequence pauses after this call. Once the modal has
    /// been presented, the host must call
    /// [`Coordinator::mark_educate_modal_done`](crate::Coordinator::mark_educate_modal_done)
    /// with `code` and the action to resume the sequence; until then the
    /// capability is not requested.
    fn show_educate_modal(&self, action: &GuardedAction, code: RequestCode);

    /// Show the contextual (non-modal) education prompt.
    ///
    /// Shown for `Optional` (and, on the alternating re-show cadence,
    /// `Feature`) actions. The pass this prompt belongs to will not
    /// request the capability; the application must run the check again.
    fn show_educate(&self, action: &GuardedAction);

    /// A `Critical` capability was denied; inform the user and exit.
    fn show_denied_critical(&self, action: &GuardedAction);

    /// An `Essential` capability was denied; remind the user the
    /// application is crippled, with a path to the platform settings.
    fn show_denied_reminder(&self, action: &GuardedAction);

    /// A `Feature`/`Optional` capability was denied; give the user
    /// feedback, with a path to the platform settings.
    fn show_denied_feedback(&self, action: &GuardedAction);
}

/// Closure run once the action's capability is granted.
pub type ActionHandler = Arc<dyn Fn(&GuardedAction) + Send + Sync>;

/// One protected operation, immutable after construction.
///
/// Build with [`GuardedAction::builder`]. Cloning is cheap; clones share
/// the listener, prompter, and handler.
#[derive(Clone)]
pub struct GuardedAction {
    claim: CapabilityUse,
    listener: Arc<dyn ResultListener>,
    prompter: Arc<dyn UserPrompter>,
    handler: ActionHandler,
}

impl GuardedAction {
    /// Starts building an action.
    #[must_use]
    pub fn builder() -> GuardedActionBuilder {
        GuardedActionBuilder::default()
    }

    /// The capability/usage pair identifying this action.
    #[must_use]
    pub fn claim(&self) -> &CapabilityUse {
        &self.claim
    }

    /// The grant/deny listener.
    #[must_use]
    pub fn listener(&self) -> &Arc<dyn ResultListener> {
        &self.listener
    }

    /// The prompt surface for this action.
    #[must_use]
    pub fn prompter(&self) -> &Arc<dyn UserPrompter> {
        &self.prompter
    }

    /// Runs the granted-action handler.
    pub fn run_handler(&self) {
        (self.handler)(self);
    }

    /// Whether checking this action starts an education pass.
    #[must_use]
    pub fn requires_education(&self) -> bool {
        self.claim.usage.requires_education()
    }

    /// Copy of this action with the handler replaced by a no-op.
    ///
    /// Used by the mandatory batch path, which wants grant/deny
    /// notification without running any deferred work.
    #[must_use]
    pub fn with_noop_handler(&self) -> Self {
        Self {
            claim: self.claim.clone(),
            listener: Arc::clone(&self.listener),
            prompter: Arc::clone(&self.prompter),
            handler: Arc::new(|_| {}),
        }
    }
}

impl PartialEq for GuardedAction {
    fn eq(&self, other: &Self) -> bool {
        self.claim == other.claim
    }
}

impl Eq for GuardedAction {}

impl fmt::Debug for GuardedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardedAction")
            .field("claim", &self.claim)
            .finish_non_exhaustive()
    }
}

/// Errors from [`GuardedActionBuilder::build`].
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ActionBuildError {
    /// No capability name was supplied.
    #[error("capability must be set")]
    MissingCapability,

    /// No usage classification was supplied.
    #[error("usage classification must be set")]
    MissingUsage,

    /// No prompter was supplied.
    #[error("user prompter must be set")]
    MissingPrompter,

    /// No granted-action handler was supplied.
    #[error("granted-action handler must be set")]
    MissingHandler,
}

/// Builder for [`GuardedAction`].
///
/// Capability, usage, prompter, and handler are required; the listener
/// defaults to [`NoopListener`].
#[derive(Default)]
pub struct GuardedActionBuilder {
    capability: Option<String>,
    usage: Option<UsageClass>,
    listener: Option<Arc<dyn ResultListener>>,
    prompter: Option<Arc<dyn UserPrompter>>,
    handler: Option<ActionHandler>,
}

impl GuardedActionBuilder {
    /// Sets the capability name guarding the action.
    #[must_use]
    pub fn capability(mut self, capability: impl Into<String>) -> Self {
        self.capability = Some(capability.into());
        self
    }

    /// Sets the usage classification.
    #[must_use]
    pub fn usage(mut self, usage: UsageClass) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Sets the grant/deny listener.
    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn ResultListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Sets the prompt surface.
    #[must_use]
    pub fn prompter(mut self, prompter: Arc<dyn UserPrompter>) -> Self {
        self.prompter = Some(prompter);
        self
    }

    /// Sets the closure to run once the capability is granted.
    #[must_use]
    pub fn on_granted<F>(mut self, handler: F) -> Self
    where
        F: Fn(&GuardedAction) + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Builds the action.
    ///
    /// # Errors
    ///
    /// Returns an [`ActionBuildError`] naming the first missing required
    /// field.
    pub fn build(self) -> Result<GuardedAction, ActionBuildError> {
        let capability = self.capability.ok_or(ActionBuildError::MissingCapability)?;
        let usage = self.usage.ok_or(ActionBuildError::MissingUsage)?;
        let prompter = self.prompter.ok_or(ActionBuildError::MissingPrompter)?;
        let handler = self.handler.ok_or(ActionBuildError::MissingHandler)?;
        let listener = self.listener.unwrap_or_else(|| Arc::new(NoopListener));

        Ok(GuardedAction {
            claim: CapabilityUse::new(capability, usage),
            listener,
            prompter,
            handler,
        })
    }
}
