//! Device-local owner identity, used when no remote backend is configured.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::local_store::PersistentLocalStore;
use super::sync_model::RecordKey;
use super::sync_traits::SessionProviderTrait;
use crate::errors::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalSession {
    owner_id: String,
    created_at: DateTime<Utc>,
}

/// Session provider that mints a random owner id once and keeps it in the
/// local store until [`SessionProviderTrait::reset`].
pub struct LocalSessionProvider {
    local_store: Arc<PersistentLocalStore>,
    cached: Mutex<Option<String>>,
}

impl LocalSessionProvider {
    pub fn new(local_store: Arc<PersistentLocalStore>) -> Self {
        Self {
            local_store,
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SessionProviderTrait for LocalSessionProvider {
    async fn owner_id(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(owner_id) = cached.as_ref() {
            return Ok(owner_id.clone());
        }

        let session = match self.local_store.load::<LocalSession>(RecordKey::Session) {
            Some(session) => session,
            None => {
                let session = LocalSession {
                    owner_id: Uuid::new_v4().to_string(),
                    created_at: Utc::now(),
                };
                self.local_store.save(RecordKey::Session, &session).await;
                info!("[Session] Created local owner {}", session.owner_id);
                session
            }
        };

        *cached = Some(session.owner_id.clone());
        Ok(session.owner_id)
    }

    async fn access_token(&self) -> Result<Option<String>> {
        Ok(None)
    }

    async fn reset(&self) -> Result<()> {
        self.cached.lock().await.take();
        self.local_store.delete(RecordKey::Session).await;
        info!("[Session] Local session reset");
        Ok(())
    }
}
