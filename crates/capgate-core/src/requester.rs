//! The requester capability: how the coordinator talks to the platform.
//!
//! A [`Requester`] wraps one request owner (an activity, view, window, or
//! whatever UI container the host platform has) together with the
//! platform's capability-check and capability-request primitives. The core
//! never inspects the owner itself; owner identity comparison is delegated
//! to the implementation so each owner kind can use whatever notion of
//! "same owner" survives teardown and recreation.

use std::any::Any;

use crate::dispatch::TaskQueue;
use crate::request::RequestCode;

/// Default request-code mask: the full non-negative 32-bit range.
///
/// Owner kinds with a narrower platform-imposed code space override
/// [`Requester::request_code_mask`]; constrained kinds are typically
/// limited to `0xFF`.
pub const DEFAULT_CODE_MASK: u32 = 0x7FFF_FFFF;

/// Platform capability primitives bound to one request owner.
pub trait Requester: Send + Sync {
    /// Returns `true` if the application already holds `capability`.
    fn check_granted(&self, capability: &str) -> bool;

    /// Asks the platform to request `capabilities` from the user.
    ///
    /// The platform answers asynchronously by invoking
    /// [`Coordinator::on_permission_result`](crate::Coordinator::on_permission_result)
    /// with the same `code`.
    fn request_permissions(&self, capabilities: &[String], code: RequestCode);

    /// Platform's "should show rationale" answer for a denied capability.
    fn should_show_rationale(&self, capability: &str) -> bool;

    /// Returns `true` if `other` wraps an equivalent owner.
    ///
    /// "Equivalent" must hold across owner teardown and recreation, since
    /// this comparison is what reconciles a resubmitted request with its
    /// orphan.
    fn is_same_owner(&self, other: &dyn Requester) -> bool;

    /// Returns `true` if `identity` names the owner this requester wraps.
    ///
    /// `identity` is the opaque token a teardown tracker passes to
    /// [`RequestRegistrar::notify_owner_torndown`](crate::RequestRegistrar::notify_owner_torndown).
    fn is_torn_down_owner_of(&self, identity: &dyn Any) -> bool;

    /// Queue bound to the execution context that issued the check.
    ///
    /// Granted-action handlers are posted here so they observe the same
    /// single-threaded view as the original `check_and_execute` call.
    fn dispatch_target(&self) -> TaskQueue;

    /// Mask of usable request-code values for this owner kind.
    fn request_code_mask(&self) -> u32 {
        DEFAULT_CODE_MASK
    }

    /// Opens the platform's per-application settings surface.
    ///
    /// Invoked on the UI-affined context via
    /// [`Coordinator::open_settings`](crate::Coordinator::open_settings).
    /// The default does nothing for platforms without one.
    fn open_settings(&self) {}
}
