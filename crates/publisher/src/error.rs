use std::error::Error as StdError;

use crate::report::ChannelFailure;

pub type Result<T> = std::result::Result<T, Error>;

/// Call-level failures of a publish run.
///
/// Per-channel delivery failures are not errors; they are recorded as
/// `FAILED` publications in the [`crate::Report`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// At least one channel failed validation; nothing was delivered.
    #[error(
        "validation failed (invalid credentials: [{}], invalid content: [{}])",
        channel_list(.invalid_credentials),
        channel_list(.invalid_event)
    )]
    Validation {
        invalid_credentials: Vec<ChannelFailure>,
        invalid_event: Vec<ChannelFailure>,
    },

    /// Committing the report failed; stored state is unknown.
    #[error("persistence failed: {context}: {source}")]
    Persistence {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn persistence(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Persistence {
            context: context.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }
}

fn channel_list(failures: &[ChannelFailure]) -> String {
    failures
        .iter()
        .map(|f| f.channel.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_names_channels() {
        let err = Error::Validation {
            invalid_credentials: vec![ChannelFailure::new("telegram", "bad token")],
            invalid_event: vec![
                ChannelFailure::new("zulip", "too long"),
                ChannelFailure::new("telegram", "too long"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "validation failed (invalid credentials: [telegram], invalid content: [zulip, telegram])"
        );
        assert!(!err.is_persistence());
    }

    #[test]
    fn persistence_error_keeps_source() {
        let io = std::io::Error::other("disk full");
        let err = Error::persistence("commit report", io);
        assert!(err.is_persistence());
        assert!(err.to_string().contains("disk full"));
        assert!(StdError::source(&err).is_some());
    }
}
