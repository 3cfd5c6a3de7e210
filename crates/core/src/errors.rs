//! Error types shared by every crate in the workspace.

use thiserror::Error;

use crate::sync::SyncRetryClass;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Classify the error for the task queue's retry policy.
    ///
    /// Only remote errors carry their own classification. Missing sessions are
    /// treated like expired credentials; local failures are not worth retrying.
    pub fn retry_class(&self) -> SyncRetryClass {
        match self {
            Self::Remote(err) => err.class,
            Self::Session(_) => SyncRetryClass::ReauthRequired,
            Self::Database(_) => SyncRetryClass::Retryable,
            Self::Serialization(_) | Self::InvalidInput(_) => SyncRetryClass::Permanent,
        }
    }
}

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure reported by the remote backend or the transport in front of it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub class: SyncRetryClass,
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteError {
    pub fn new(class: SyncRetryClass, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            class,
            status,
            message: message.into(),
        }
    }

    pub fn retryable(message: impl Into<String>) -> Self {
        Self::new(SyncRetryClass::Retryable, None, message)
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(SyncRetryClass::Permanent, None, message)
    }

    pub fn reauth(message: impl Into<String>) -> Self {
        Self::new(SyncRetryClass::ReauthRequired, None, message)
    }
}
