//! Error taxonomy shared by every layer of the extractor.

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while talking to the API, reshaping records or persisting tables
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed identifier or wire-data shape
    #[error("format error: {0}")]
    Format(String),

    /// Configuration-time inconsistency, detected before rows are produced
    #[error("validation error: {0}")]
    Validation(String),

    /// Bad user input; `hint` tells the user how to fix it
    #[error("{message} {hint}")]
    User { message: String, hint: String },

    /// 4xx response from the API (400-403)
    #[error("API client error (HTTP {status}): {message}")]
    Client { status: u16, message: String },

    /// Any other HTTP failure, not retried here
    #[error("transport failure{}: {reason}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Transport { status: Option<u16>, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl Error {
    pub fn user(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Error::User {
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// Whether the message should be shown to the end user verbatim.
    ///
    /// Client errors count as user-facing: they almost always mean a bad token,
    /// missing permissions or a wrong organization ID.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Error::User { .. } | Error::Client { .. })
    }
}
