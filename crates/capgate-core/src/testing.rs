//! Shared test doubles for the coordination core.

use std::any::Any;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::action::{CapabilityUse, GuardedAction, ResultListener, UserPrompter};
use crate::dispatch::TaskQueue;
use crate::request::RequestCode;
use crate::requester::Requester;
use crate::usage::UsageClass;

/// Prompter that swallows every prompt.
pub struct SilentPrompter;

impl UserPrompter for SilentPrompter {
    fn show_educate_modal(&self, _action: &GuardedAction, _code: RequestCode) {}
    fn show_educate(&self, _action: &GuardedAction) {}
    fn show_denied_critical(&self, _action: &GuardedAction) {}
    fn show_denied_reminder(&self, _action: &GuardedAction) {}
    fn show_denied_feedback(&self, _action: &GuardedAction) {}
}

/// Everything observable a scenario can produce, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Granted(String),
    Denied(String),
    Ran(String),
    EducateModal(String, RequestCode),
    Educate(String),
    DeniedCritical(String),
    DeniedReminder(String),
    DeniedFeedback(String),
}

/// Shared, ordered event log.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

/// Listener that records grant/deny notifications into an [`EventLog`].
pub struct RecordingListener {
    log: EventLog,
}

impl RecordingListener {
    pub fn new(log: &EventLog) -> Arc<Self> {
        Arc::new(Self { log: log.clone() })
    }
}

impl ResultListener for RecordingListener {
    fn on_granted(&self, claim: &CapabilityUse) {
        self.log.push(Event::Granted(claim.capability.clone()));
    }

    fn on_denied(&self, claim: &CapabilityUse) {
        self.log.push(Event::Denied(claim.capability.clone()));
    }
}

/// Prompter that records every prompt into an [`EventLog`].
pub struct RecordingPrompter {
    log: EventLog,
}

impl RecordingPrompter {
    pub fn new(log: &EventLog) -> Arc<Self> {
        Arc::new(Self { log: log.clone() })
    }
}

impl UserPrompter for RecordingPrompter {
    fn show_educate_modal(&self, action: &GuardedAction, code: RequestCode) {
        self.log
            .push(Event::EducateModal(action.claim().capability.clone(), code));
    }

    fn show_educate(&self, action: &GuardedAction) {
        self.log.push(Event::Educate(action.claim().capability.clone()));
    }

    fn show_denied_critical(&self, action: &GuardedAction) {
        self.log
            .push(Event::DeniedCritical(action.claim().capability.clone()));
    }

    fn show_denied_reminder(&self, action: &GuardedAction) {
        self.log
            .push(Event::DeniedReminder(action.claim().capability.clone()));
    }

    fn show_denied_feedback(&self, action: &GuardedAction) {
        self.log
            .push(Event::DeniedFeedback(action.claim().capability.clone()));
    }
}

/// Requester whose owner identity is a plain `u64`.
///
/// Two instances with the same identity model an owner torn down and
/// recreated; the instances differ but compare as the same owner.
pub struct MockRequester {
    owner: u64,
    mask: u32,
    granted: Mutex<HashSet<String>>,
    rationale: Mutex<HashSet<String>>,
    requested: Mutex<Vec<(Vec<String>, RequestCode)>>,
    target: TaskQueue,
}

impl MockRequester {
    pub fn new(owner: u64) -> Self {
        Self {
            owner,
            mask: crate::requester::DEFAULT_CODE_MASK,
            granted: Mutex::new(HashSet::new()),
            rationale: Mutex::new(HashSet::new()),
            requested: Mutex::new(Vec::new()),
            target: TaskQueue::new(),
        }
    }

    pub fn with_mask(owner: u64, mask: u32) -> Self {
        Self {
            mask,
            ..Self::new(owner)
        }
    }

    /// Marks `capability` as already granted.
    pub fn grant(&self, capability: &str) {
        self.granted.lock().unwrap().insert(capability.to_owned());
    }

    /// Makes `should_show_rationale` answer `true` for `capability`.
    pub fn set_rationale(&self, capability: &str) {
        self.rationale.lock().unwrap().insert(capability.to_owned());
    }

    /// Platform requests issued so far, as `(capabilities, code)` pairs.
    pub fn requests(&self) -> Vec<(Vec<String>, RequestCode)> {
        self.requested.lock().unwrap().clone()
    }
}

impl Requester for MockRequester {
    fn check_granted(&self, capability: &str) -> bool {
        self.granted.lock().unwrap().contains(capability)
    }

    fn request_permissions(&self, capabilities: &[String], code: RequestCode) {
        self.requested
            .lock()
            .unwrap()
            .push((capabilities.to_vec(), code));
    }

    fn should_show_rationale(&self, capability: &str) -> bool {
        self.rationale.lock().unwrap().contains(capability)
    }

    fn is_same_owner(&self, other: &dyn Requester) -> bool {
        other.is_torn_down_owner_of(&self.owner)
    }

    fn is_torn_down_owner_of(&self, identity: &dyn Any) -> bool {
        identity.downcast_ref::<u64>() == Some(&self.owner)
    }

    fn dispatch_target(&self) -> TaskQueue {
        self.target.clone()
    }

    fn request_code_mask(&self) -> u32 {
        self.mask
    }
}

/// Builds an action with a no-op handler and a no-op listener.
pub fn action_with<P>(capability: &str, usage: UsageClass, prompter: &Arc<P>) -> GuardedAction
where
    P: UserPrompter + 'static,
{
    GuardedAction::builder()
        .capability(capability)
        .usage(usage)
        .prompter(Arc::clone(prompter) as Arc<dyn UserPrompter>)
        .on_granted(|_| {})
        .build()
        .expect("test action should build")
}
