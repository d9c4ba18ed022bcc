use std::error::Error as StdError;

/// Crate-wide result type for channel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed errors shared by every channel plug-in.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configured account cannot be used (bad token, unreachable, ...).
    #[error("invalid credentials for {channel}: {message}")]
    InvalidCredentials { channel: String, message: String },

    /// The event cannot be rendered within the channel's constraints.
    #[error("event rejected by {channel}: {message}")]
    InvalidContent { channel: String, message: String },

    /// The send itself failed.
    #[error("delivery to {channel} failed: {message}")]
    Delivery { channel: String, message: String },

    /// No plug-in is registered under this channel name.
    #[error("no publisher registered for channel: {name}")]
    UnknownPublisher { name: String },

    /// Plug-in configuration is missing or malformed.
    #[error("invalid channel configuration: {message}")]
    Config { message: String },

    /// Wrapped source error from an external dependency.
    #[error("channel operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// JSON (de)serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_credentials(
        channel: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidCredentials {
            channel: channel.into(),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn invalid_content(channel: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::InvalidContent {
            channel: channel.into(),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn delivery(channel: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Delivery {
            channel: channel.into(),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn unknown_publisher(name: impl Into<String>) -> Self {
        Self::UnknownPublisher { name: name.into() }
    }

    #[must_use]
    pub fn config(message: impl std::fmt::Display) -> Self {
        Self::Config {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Short human-readable reason, suitable for a publication record.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::InvalidCredentials { message, .. }
            | Self::InvalidContent { message, .. }
            | Self::Delivery { message, .. }
            | Self::Config { message } => message.clone(),
            other => other.to_string(),
        }
    }
}
