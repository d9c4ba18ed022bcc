use uuid::Uuid;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("event not found: {external_id}")]
    EventNotFound { external_id: Uuid },

    /// A stored value could not be decoded.
    #[error("invalid {column} in stored row: {message}")]
    InvalidRow {
        column: &'static str,
        message: String,
    },

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn event_not_found(external_id: Uuid) -> Self {
        Self::EventNotFound { external_id }
    }

    #[must_use]
    pub fn invalid_row(column: &'static str, message: impl std::fmt::Display) -> Self {
        Self::InvalidRow {
            column,
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}
