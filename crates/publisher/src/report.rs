//! The transient result of one publish run.

use std::fmt;

use {
    reshare_common::{Event, Publication, PublicationStatus},
    serde::Serialize,
};

use crate::{Error, Result, validator::ValidationOutcome};

/// Overall verdict of a publish run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Success,
    PartialFailure,
    Failure,
}

impl ReportStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::PartialFailure => "PARTIAL_FAILURE",
            Self::Failure => "FAILURE",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A channel that failed one of the validation checks, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelFailure {
    pub channel: String,
    pub reason: String,
}

impl ChannelFailure {
    pub fn new(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            reason: reason.into(),
        }
    }
}

/// Per-channel outcomes of one publish run plus the overall verdict.
///
/// Either `publications` holds exactly one terminal publication per channel,
/// or it is empty and the validation failure sets say why.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub event: Event,
    pub publications: Vec<Publication>,
    pub invalid_credentials: Vec<ChannelFailure>,
    pub invalid_event: Vec<ChannelFailure>,
    pub status: ReportStatus,
}

impl Report {
    /// Report for a batch aborted by validation. Carries no publications.
    pub fn validation_failed(event: Event, outcome: ValidationOutcome) -> Self {
        Self {
            event,
            publications: Vec::new(),
            invalid_credentials: outcome.invalid_credentials,
            invalid_event: outcome.invalid_event,
            status: ReportStatus::Failure,
        }
    }

    /// Report for a batch that went through delivery.
    ///
    /// An empty batch counts as `SUCCESS`: nothing was asked, nothing failed.
    pub fn from_publications(event: Event, publications: Vec<Publication>) -> Self {
        let completed = publications
            .iter()
            .filter(|p| p.status == PublicationStatus::Completed)
            .count();
        let status = if completed == publications.len() {
            ReportStatus::Success
        } else if completed == 0
            && publications
                .iter()
                .all(|p| p.status == PublicationStatus::Failed)
        {
            ReportStatus::Failure
        } else {
            ReportStatus::PartialFailure
        };

        Self {
            event,
            publications,
            invalid_credentials: Vec::new(),
            invalid_event: Vec::new(),
            status,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ReportStatus::Success
    }

    /// True when the batch was stopped before any delivery.
    #[must_use]
    pub fn is_validation_failure(&self) -> bool {
        !self.invalid_credentials.is_empty() || !self.invalid_event.is_empty()
    }

    /// The outcome recorded for `channel`, if it was delivered to.
    #[must_use]
    pub fn outcome(&self, channel: &str) -> Option<&Publication> {
        self.publications.iter().find(|p| p.channel == channel)
    }

    pub fn failed(&self) -> impl Iterator<Item = &Publication> {
        self.publications
            .iter()
            .filter(|p| p.status == PublicationStatus::Failed)
    }

    /// Surface a validation abort as a call-level error.
    ///
    /// Delivery failures stay in the report; only the validation gate
    /// becomes an [`Error`].
    pub fn into_result(self) -> Result<Self> {
        if self.is_validation_failure() {
            return Err(Error::Validation {
                invalid_credentials: self.invalid_credentials,
                invalid_event: self.invalid_event,
            });
        }
        Ok(self)
    }

    /// One-line summary for logs and terminal output.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_validation_failure() {
            return format!(
                "{}: {} invalid credentials, {} invalid content",
                self.status,
                self.invalid_credentials.len(),
                self.invalid_event.len()
            );
        }
        let outcomes = self
            .publications
            .iter()
            .map(|p| match &p.reason {
                Some(reason) => format!("{}={} ({reason})", p.channel, p.status),
                None => format!("{}={}", p.channel, p.status),
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}: [{outcomes}]", self.status)
    }
}
