//! Permission usage classification.
//!
//! Every guarded capability is tagged with a [`UsageClass`] describing how
//! the application uses it. The class is pure data: it decides whether the
//! user must be educated before the platform request goes out, and which
//! denial UI (if any) is shown when the platform reports a denial. Nothing
//! in this module touches request state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How the application uses a guarded capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageClass {
    /// Required for core functionality and obvious to the user from the
    /// application's description. Denial is terminal for the application.
    Critical,

    /// Required for core functionality but not obvious to the user. The
    /// user is educated with a modal prompt before the capability is
    /// requested.
    Essential,

    /// Needed for a secondary feature that obviously requires a guarded
    /// capability.
    Feature,

    /// Needed for a secondary feature where the capability requirement is
    /// not obvious. The user is educated in context before the capability
    /// is requested.
    Optional,
}

/// Which denial UI to show when a capability request is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialUi {
    /// Modal informing the user the application cannot continue.
    Critical,

    /// Timed reminder that functionality is crippled, with a path to the
    /// platform settings.
    Reminder,

    /// Informational notice of the denial, with a path to the platform
    /// settings.
    Feedback,

    /// No UI; the listener is notified directly.
    NotifyOnly,
}

impl UsageClass {
    /// Returns `true` if this usage requires educating the user before the
    /// capability is requested from the platform.
    ///
    /// Only `Essential` and `Optional` start an education pass. `Feature`
    /// never initiates education on its own; it only participates in the
    /// alternating re-show cadence once an education flag exists for it.
    #[must_use]
    pub const fn requires_education(self) -> bool {
        matches!(self, Self::Essential | Self::Optional)
    }

    /// Returns `true` for the usages accepted by the mandatory batch
    /// request path (`Critical` and `Essential`).
    #[must_use]
    pub const fn is_mandatory(self) -> bool {
        matches!(self, Self::Critical | Self::Essential)
    }

    /// Picks the denial UI for this usage.
    ///
    /// `rationale_available` is the platform's "should show rationale"
    /// answer for the denied capability; it only matters for `Feature` and
    /// `Optional`, which stay silent when the platform says the user asked
    /// not to be prompted.
    #[must_use]
    pub const fn denial_ui(self, rationale_available: bool) -> DenialUi {
        match self {
            Self::Critical => DenialUi::Critical,
            Self::Essential => DenialUi::Reminder,
            Self::Feature | Self::Optional => {
                if rationale_available {
                    DenialUi::Feedback
                } else {
                    DenialUi::NotifyOnly
                }
            },
        }
    }

    /// Stable lowercase name, used in education store keys and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Essential => "essential",
            Self::Feature => "feature",
            Self::Optional => "optional",
        }
    }
}

impl fmt::Display for UsageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn education_required_for_essential_and_optional_only() {
        assert!(UsageClass::Essential.requires_education());
        assert!(UsageClass::Optional.requires_education());
        assert!(!UsageClass::Critical.requires_education());
        assert!(!UsageClass::Feature.requires_education());
    }

    #[test]
    fn mandatory_covers_critical_and_essential() {
        assert!(UsageClass::Critical.is_mandatory());
        assert!(UsageClass::Essential.is_mandatory());
        assert!(!UsageClass::Feature.is_mandatory());
        assert!(!UsageClass::Optional.is_mandatory());
    }

    #[test]
    fn denial_ui_ignores_rationale_for_mandatory_usages() {
        assert_eq!(UsageClass::Critical.denial_ui(false), DenialUi::Critical);
        assert_eq!(UsageClass::Critical.denial_ui(true), DenialUi::Critical);
        assert_eq!(UsageClass::Essential.denial_ui(false), DenialUi::Reminder);
        assert_eq!(UsageClass::Essential.denial_ui(true), DenialUi::Reminder);
    }

    #[test]
    fn denial_ui_for_secondary_usages_follows_rationale() {
        assert_eq!(UsageClass::Feature.denial_ui(true), DenialUi::Feedback);
        assert_eq!(UsageClass::Feature.denial_ui(false), DenialUi::NotifyOnly);
        assert_eq!(UsageClass::Optional.denial_ui(true), DenialUi::Feedback);
        assert_eq!(UsageClass::Optional.denial_ui(false), DenialUi::NotifyOnly);
    }
}
