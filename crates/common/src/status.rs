//! Event-level publication status, derived from per-channel publications.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, types::PublicationStatus};

/// Aggregate status of an event across all of its publications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPublicationStatus {
    /// No delivery attempted yet.
    #[default]
    Waiting,
    Completed,
    Failed,
    Partial,
}

impl EventPublicationStatus {
    pub const ALL: [EventPublicationStatus; 4] =
        [Self::Waiting, Self::Completed, Self::Failed, Self::Partial];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Partial => "PARTIAL",
        }
    }
}

impl fmt::Display for EventPublicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for EventPublicationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::unknown_status("event", s))
    }
}

/// Derive an event's status from the statuses of its publications.
///
/// First match wins: no publications is `Waiting`, all `Completed` is
/// `Completed`, all `Failed` is `Failed`, anything else is `Partial`.
/// Used both when committing a report and when inspecting stored events.
pub fn derive_status<I>(statuses: I) -> EventPublicationStatus
where
    I: IntoIterator<Item = PublicationStatus>,
{
    let mut seen_any = false;
    let mut all_completed = true;
    let mut all_failed = true;

    for status in statuses {
        seen_any = true;
        all_completed &= status == PublicationStatus::Completed;
        all_failed &= status == PublicationStatus::Failed;
    }

    match (seen_any, all_completed, all_failed) {
        (false, ..) => EventPublicationStatus::Waiting,
        (true, true, _) => EventPublicationStatus::Completed,
        (true, _, true) => EventPublicationStatus::Failed,
        _ => EventPublicationStatus::Partial,
    }
}
