//! Coordinator-facing error types.

use thiserror::Error;

use crate::request::RequestCode;
use crate::usage::UsageClass;

/// Contract violations reported by
/// [`Coordinator::mark_educate_modal_done`](crate::Coordinator::mark_educate_modal_done).
///
/// These indicate programmer error in the host, not runtime state, and are
/// surfaced immediately so integration bugs are caught early instead of
/// silently corrupting request state.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum AcknowledgeError {
    /// No tracked request exists for the acknowledged code.
    #[error("no tracked request for code {code}")]
    UnknownRequest {
        /// The unrecognized request code.
        code: RequestCode,
    },

    /// Modal acknowledgment only applies to `Essential` actions.
    #[error("action '{capability}' has usage {usage}; modal acknowledgment applies to essential only")]
    NotEssential {
        /// Capability of the acknowledged action.
        capability: String,
        /// The action's actual usage classification.
        usage: UsageClass,
    },

    /// The acknowledged action is not part of the request's action set.
    #[error("action '{capability}' is not part of request {code}")]
    ActionNotInRequest {
        /// Capability of the acknowledged action.
        capability: String,
        /// The request code the acknowledgment named.
        code: RequestCode,
    },
}
