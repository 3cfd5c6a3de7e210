//! HTTP client for the backend's auth and REST endpoints.

use log::{debug, error};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;

use crate::error::{RemoteSyncError, Result};
use crate::types::{AuthErrorResponse, AuthSessionResponse, RestErrorResponse};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const HEALTH_TIMEOUT_SECS: u64 = 5;
const MAX_LOG_BODY_CHARS: usize = 512;
const OWNER_COLUMN: &str = "user_id";

#[derive(Debug, Clone)]
pub struct RemoteSyncClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RemoteSyncClient {
    /// * `base_url` - project URL, e.g. "https://abc.supabase.co"
    /// * `api_key` - the project's publishable (anon) key
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("API response error ({}): {}", status, preview);
    }

    fn headers(&self, token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let api_key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| RemoteSyncError::auth("Invalid API key format"))?;
        headers.insert("apikey", api_key);

        let bearer = token.unwrap_or(&self.api_key);
        let auth_value = HeaderValue::from_str(&format!("Bearer {}", bearer))
            .map_err(|_| RemoteSyncError::auth("Invalid access token format"))?;
        headers.insert(AUTHORIZATION, auth_value);

        Ok(headers)
    }

    async fn read_body(response: reqwest::Response) -> Result<(reqwest::StatusCode, String)> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);
        Ok((status, body))
    }

    fn rest_error(status: reqwest::StatusCode, body: &str) -> RemoteSyncError {
        let message = serde_json::from_str::<RestErrorResponse>(body)
            .ok()
            .and_then(RestErrorResponse::summary)
            .unwrap_or_else(|| format!("Request failed: {}", body));
        RemoteSyncError::api(status.as_u16(), message)
    }

    async fn parse_auth_response(response: reqwest::Response) -> Result<AuthSessionResponse> {
        let (status, body) = Self::read_body(response).await?;

        if !status.is_success() {
            let message = serde_json::from_str::<AuthErrorResponse>(&body)
                .ok()
                .and_then(AuthErrorResponse::summary)
                .unwrap_or_else(|| format!("Request failed: {}", body));
            return Err(RemoteSyncError::api(status.as_u16(), message));
        }

        serde_json::from_str(&body).map_err(|e| {
            error!("Failed to deserialize auth response: {}", e);
            RemoteSyncError::api(status.as_u16(), format!("Failed to parse response: {}", e))
        })
    }

    /// Insert-or-replace one row keyed by the owner column.
    ///
    /// POST /rest/v1/{table}?on_conflict=user_id
    pub async fn upsert_row(
        &self,
        token: Option<&str>,
        table: &str,
        row: &serde_json::Value,
    ) -> Result<()> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let response = self
            .client
            .post(&url)
            .headers(self.headers(token)?)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .query(&[("on_conflict", OWNER_COLUMN)])
            .json(row)
            .send()
            .await?;

        let (status, body) = Self::read_body(response).await?;
        if !status.is_success() {
            return Err(Self::rest_error(status, &body));
        }
        Ok(())
    }

    /// Fetch the single row owned by `owner_id`, if any.
    ///
    /// GET /rest/v1/{table}?user_id=eq.{owner}&select=*&limit=1
    pub async fn select_by_owner(
        &self,
        token: Option<&str>,
        table: &str,
        owner_id: &str,
    ) -> Result<Option<serde_json::Value>> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let owner_filter = format!("eq.{}", owner_id);
        let response = self
            .client
            .get(&url)
            .headers(self.headers(token)?)
            .query(&[
                (OWNER_COLUMN, owner_filter.as_str()),
                ("select", "*"),
                ("limit", "1"),
            ])
            .send()
            .await?;

        let (status, body) = Self::read_body(response).await?;
        if !status.is_success() {
            return Err(Self::rest_error(status, &body));
        }
        let rows: Vec<serde_json::Value> = serde_json::from_str(&body)?;
        Ok(rows.into_iter().next())
    }

    /// Create an anonymous user and session.
    ///
    /// POST /auth/v1/signup
    pub async fn sign_up_anonymously(&self) -> Result<AuthSessionResponse> {
        let url = format!("{}/auth/v1/signup", self.base_url);
        let response = self
            .client
            .post(&url)
            .headers(self.headers(None)?)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        Self::parse_auth_response(response).await
    }

    /// Exchange a refresh token for a new session. The old refresh token is
    /// invalid afterwards.
    ///
    /// POST /auth/v1/token?grant_type=refresh_token
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSessionResponse> {
        let url = format!("{}/auth/v1/token", self.base_url);
        let response = self
            .client
            .post(&url)
            .headers(self.headers(None)?)
            .query(&[("grant_type", "refresh_token")])
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        Self::parse_auth_response(response).await
    }

    /// GET /auth/v1/health
    pub async fn health(&self) -> Result<()> {
        let url = format!("{}/auth/v1/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .headers(self.headers(None)?)
            .timeout(Duration::from_secs(HEALTH_TIMEOUT_SECS))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteSyncError::api(status.as_u16(), "health check failed"));
        }
        Ok(())
    }
}
