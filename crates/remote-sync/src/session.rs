//! Anonymous backend session whose user id is the owner id of every record.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

use thyro_core::sync::{PersistentLocalStore, RecordKey, SessionProviderTrait};
use thyro_core::Result;

use crate::client::RemoteSyncClient;
use crate::types::AuthSessionResponse;

/// Refresh this long before the access token actually expires.
const TOKEN_EXPIRY_BUFFER_SECS: i64 = 60;
const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    owner_id: String,
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl StoredSession {
    fn from_response(owner_id: String, response: AuthSessionResponse) -> Self {
        let ttl = response.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        Self {
            owner_id,
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: Utc::now() + Duration::seconds(ttl),
        }
    }

    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(TOKEN_EXPIRY_BUFFER_SECS) <= now
    }
}

/// Signs up anonymously on first use and keeps the session in the local
/// store. The owner id never changes until [`SessionProviderTrait::reset`].
pub struct AnonymousSessionProvider {
    client: RemoteSyncClient,
    local_store: Arc<PersistentLocalStore>,
    session: Mutex<Option<StoredSession>>,
}

impl AnonymousSessionProvider {
    pub fn new(client: RemoteSyncClient, local_store: Arc<PersistentLocalStore>) -> Self {
        Self {
            client,
            local_store,
            session: Mutex::new(None),
        }
    }

    /// Owner id of the stored session, signing up only when none exists. Never
    /// refreshes, so a stored owner is available while the backend is down.
    async fn stored_owner_id(&self) -> Result<String> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            *guard = self.local_store.load::<StoredSession>(RecordKey::Session);
        }
        if let Some(session) = guard.as_ref() {
            return Ok(session.owner_id.clone());
        }

        let session = self.sign_up().await?;
        let owner_id = session.owner_id.clone();
        *guard = Some(session);
        Ok(owner_id)
    }

    /// Current session, created or refreshed as needed. The lock is held
    /// across the network call so concurrent callers share one refresh.
    async fn current_session(&self) -> Result<StoredSession> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            *guard = self.local_store.load::<StoredSession>(RecordKey::Session);
        }

        let session = match guard.take() {
            None => self.sign_up().await?,
            Some(session) if session.needs_refresh(Utc::now()) => {
                match self.refresh(&session).await {
                    Ok(refreshed) => refreshed,
                    Err(err) => {
                        *guard = Some(session);
                        return Err(err);
                    }
                }
            }
            Some(session) => session,
        };

        *guard = Some(session.clone());
        Ok(session)
    }

    async fn sign_up(&self) -> Result<StoredSession> {
        let response = self.client.sign_up_anonymously().await?;
        let owner_id = response.user.id.clone();
        let session = StoredSession::from_response(owner_id, response);
        self.local_store.save(RecordKey::Session, &session).await;
        info!("[Session] Signed up anonymous owner {}", session.owner_id);
        Ok(session)
    }

    async fn refresh(&self, current: &StoredSession) -> Result<StoredSession> {
        debug!("[Session] Refreshing access token");
        let response = self.client.refresh_session(&current.refresh_token).await?;
        if response.user.id != current.owner_id {
            warn!(
                "[Session] Refresh returned user {} for owner {}; keeping the original owner",
                response.user.id, current.owner_id
            );
        }
        let session = StoredSession::from_response(current.owner_id.clone(), response);
        self.local_store.save(RecordKey::Session, &session).await;
        Ok(session)
    }
}

#[async_trait]
impl SessionProviderTrait for AnonymousSessionProvider {
    async fn owner_id(&self) -> Result<String> {
        self.stored_owner_id().await
    }

    async fn access_token(&self) -> Result<Option<String>> {
        Ok(Some(self.current_session().await?.access_token))
    }

    async fn reset(&self) -> Result<()> {
        self.session.lock().await.take();
        self.local_store.delete(RecordKey::Session).await;
        info!("[Session] Session reset");
        Ok(())
    }
}
