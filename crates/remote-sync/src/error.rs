//! Error types for the remote sync crate.

use thiserror::Error;
use thyro_core::sync::{classify_http_status, SyncRetryClass};
use thyro_core::RemoteError;

pub type Result<T> = std::result::Result<T, RemoteSyncError>;

#[derive(Debug, Error)]
pub enum RemoteSyncError {
    /// Transport failure: connect, timeout, broken body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success response from the backend.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Authentication error: {0}")]
    Auth(String),
}

impl RemoteSyncError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn retry_class(&self) -> SyncRetryClass {
        match self {
            Self::Api { status, .. } => classify_http_status(*status),
            Self::Http(_) => SyncRetryClass::Retryable,
            Self::Json(_) => SyncRetryClass::Permanent,
            Self::InvalidRequest(_) => SyncRetryClass::Permanent,
            Self::Auth(_) => SyncRetryClass::ReauthRequired,
        }
    }
}

impl From<RemoteSyncError> for thyro_core::Error {
    fn from(err: RemoteSyncError) -> Self {
        thyro_core::Error::Remote(RemoteError::new(
            err.retry_class(),
            err.status_code(),
            err.to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_maps_to_retry_class() {
        assert_eq!(
            RemoteSyncError::api(503, "unavailable").retry_class(),
            SyncRetryClass::Retryable
        );
        assert_eq!(
            RemoteSyncError::api(401, "jwt expired").retry_class(),
            SyncRetryClass::ReauthRequired
        );
        assert_eq!(
            RemoteSyncError::api(400, "bad column").retry_class(),
            SyncRetryClass::Permanent
        );
    }

    #[test]
    fn converts_into_core_remote_error() {
        let err: thyro_core::Error = RemoteSyncError::api(429, "slow down").into();
        match err {
            thyro_core::Error::Remote(remote) => {
                assert_eq!(remote.class, SyncRetryClass::Retryable);
                assert_eq!(remote.status, Some(429));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
