use thiserror::Error;

use crate::types::PublicationStatus;

#[derive(Error, Debug)]
pub enum Error {
    /// A publication moves `UNSAVED -> WAITING` on dispatch, then
    /// to `COMPLETED` or `FAILED` exactly once.
    #[error("invalid publication transition: {from} -> {to}")]
    InvalidTransition {
        from: PublicationStatus,
        to: PublicationStatus,
    },

    #[error("unknown {kind} status: {value}")]
    UnknownStatus { kind: &'static str, value: String },
}

impl Error {
    #[must_use]
    pub fn invalid_transition(from: PublicationStatus, to: PublicationStatus) -> Self {
        Self::InvalidTransition { from, to }
    }

    #[must_use]
    pub fn unknown_status(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownStatus {
            kind,
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
