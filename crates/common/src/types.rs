//! Core records: events, channels, and per-channel publications.

use std::{fmt, str::FromStr};

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    uuid::Uuid,
};

use crate::{Error, Result, status::EventPublicationStatus};

/// A source item to be mirrored to the output channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Stable identifier assigned by the upstream platform.
    pub external_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Link back to the event on the source platform.
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub begin_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    /// Derived from the event's publications; see [`crate::derive_status`].
    #[serde(default)]
    pub status: EventPublicationStatus,
}

/// A configured output destination (aka publisher).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_ref: Option<String>,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
            account_ref: None,
        }
    }

    pub fn with_account_ref(mut self, account_ref: impl Into<String>) -> Self {
        self.account_ref = Some(account_ref.into());
        self
    }
}

/// Lifecycle of a single delivery attempt.
///
/// `Unsaved -> Waiting -> {Completed | Failed}`; terminal states never move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublicationStatus {
    Unsaved,
    Waiting,
    Completed,
    Failed,
}

impl PublicationStatus {
    pub const ALL: [PublicationStatus; 4] =
        [Self::Unsaved, Self::Waiting, Self::Completed, Self::Failed];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unsaved => "UNSAVED",
            Self::Waiting => "WAITING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    #[must_use]
    pub fn can_transition_to(self, next: PublicationStatus) -> bool {
        matches!(
            (self, next),
            (Self::Unsaved, Self::Waiting)
                | (Self::Waiting, Self::Completed)
                | (Self::Waiting, Self::Failed)
        )
    }
}

impl fmt::Display for PublicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for PublicationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::unknown_status("publication", s))
    }
}

/// One attempt to deliver one event to one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub id: Uuid,
    /// External id of the owning event.
    pub event_id: Uuid,
    /// Name of the owning channel.
    pub channel: String,
    pub status: PublicationStatus,
    /// Time of the last status change.
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Publication {
    /// Schedule a new attempt. Every attempt gets a fresh id, so a retry is a
    /// new row rather than a mutation of an old terminal one.
    pub fn new(event_id: Uuid, channel: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            channel: channel.into(),
            status: PublicationStatus::Unsaved,
            timestamp: Utc::now(),
            reason: None,
        }
    }

    pub fn dispatch(&mut self) -> Result<()> {
        self.transition(PublicationStatus::Waiting, None)
    }

    pub fn complete(&mut self) -> Result<()> {
        self.transition(PublicationStatus::Completed, None)
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(PublicationStatus::Failed, Some(reason.into()))
    }

    fn transition(&mut self, next: PublicationStatus, reason: Option<String>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::invalid_transition(self.status, next));
        }
        self.status = next;
        self.reason = reason;
        self.timestamp = Utc::now();
        Ok(())
    }
}
