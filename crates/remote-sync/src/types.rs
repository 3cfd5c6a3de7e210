//! Wire types for the auth and REST endpoints.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub is_anonymous: Option<bool>,
}

/// Response of `/auth/v1/signup` and `/auth/v1/token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSessionResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: Option<i64>,
    pub user: AuthUser,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthErrorResponse {
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub msg: Option<String>,
}

impl AuthErrorResponse {
    pub fn summary(self) -> Option<String> {
        self.error_description.or(self.msg).or(self.error)
    }
}

/// Error body returned by the REST endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct RestErrorResponse {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl RestErrorResponse {
    pub fn summary(self) -> Option<String> {
        let message = self.message?;
        Some(match self.code {
            Some(code) => format!("{}: {}", code, message),
            None => message,
        })
    }
}
