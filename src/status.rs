use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::event::EventKind;

/// Lifecycle of a job application, in contract order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JobApplicationStatus {
    InProgress,
    OfferSent,
    OfferAccepted,
    OfferDeclined,
    ApplicationDeclined,
    Hired,
}

impl JobApplicationStatus {
    pub const ALL: [JobApplicationStatus; 6] = [
        JobApplicationStatus::InProgress,
        JobApplicationStatus::OfferSent,
        JobApplicationStatus::OfferAccepted,
        JobApplicationStatus::OfferDeclined,
        JobApplicationStatus::ApplicationDeclined,
        JobApplicationStatus::Hired,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobApplicationStatus::InProgress => "InProgress",
            JobApplicationStatus::OfferSent => "OfferSent",
            JobApplicationStatus::OfferAccepted => "OfferAccepted",
            JobApplicationStatus::OfferDeclined => "OfferDeclined",
            JobApplicationStatus::ApplicationDeclined => "ApplicationDeclined",
            JobApplicationStatus::Hired => "Hired",
        }
    }

    /// Position in the contract's status enum.
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// The status an application event writes, `None` for posting events.
    pub fn target_of(kind: EventKind) -> Option<Self> {
        match kind {
            EventKind::JobApplicationCreated => Some(JobApplicationStatus::InProgress),
            EventKind::JobApplicationOfferSent => Some(JobApplicationStatus::OfferSent),
            EventKind::JobApplicationOfferAccepted => Some(JobApplicationStatus::OfferAccepted),
            EventKind::JobApplicationOfferDeclined => Some(JobApplicationStatus::OfferDeclined),
            EventKind::JobApplicationApplicationDeclined => {
                Some(JobApplicationStatus::ApplicationDeclined)
            }
            EventKind::JobApplicationHired => Some(JobApplicationStatus::Hired),
            EventKind::JobPostingCreated | EventKind::JobPostingClosed => None,
        }
    }

    /// Whether the contract lifecycle allows moving from `self` to `to`.
    ///
    /// Staying in the same status is always allowed so redelivered events
    /// converge.
    pub fn can_transition_to(self, to: JobApplicationStatus) -> bool {
        use JobApplicationStatus::*;

        if self == to {
            return true;
        }

        matches!(
            (self, to),
            (InProgress, OfferSent)
                | (OfferSent, OfferAccepted)
                | (OfferSent, OfferDeclined)
                | (InProgress, ApplicationDeclined)
                | (InProgress, Hired)
                | (OfferSent, Hired)
                | (OfferAccepted, Hired)
        )
    }
}

impl fmt::Display for JobApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown job application status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for JobApplicationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_owned()))
    }
}

/// How status events are checked against the stored status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum TransitionPolicy {
    /// Every status event overwrites the stored status.
    #[default]
    Unconditional,
    /// Status events must follow the contract lifecycle.
    Strict,
}

impl TransitionPolicy {
    /// Decides whether `kind` may move an application from `current` to `target`.
    ///
    /// Application creation always resets to `InProgress`.
    pub fn permits(
        self,
        kind: EventKind,
        current: JobApplicationStatus,
        target: JobApplicationStatus,
    ) -> bool {
        match self {
            TransitionPolicy::Unconditional => true,
            TransitionPolicy::Strict => {
                kind == EventKind::JobApplicationCreated || current.can_transition_to(target)
            }
        }
    }
}
