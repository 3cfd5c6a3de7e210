//! [`RemoteGatewayTrait`] over the REST client.

use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;

use thyro_core::sync::{RemoteGatewayTrait, SessionProviderTrait, SyncEntityKind, SyncRecord};
use thyro_core::{Error, RemoteError, Result};

use crate::client::RemoteSyncClient;

/// Pushes and pulls whole records, one row per owner per table.
///
/// Requests carry the session's access token; no retries happen here.
pub struct RemoteSyncGateway {
    client: RemoteSyncClient,
    session: Arc<dyn SessionProviderTrait>,
}

impl RemoteSyncGateway {
    pub fn new(client: RemoteSyncClient, session: Arc<dyn SessionProviderTrait>) -> Self {
        Self { client, session }
    }
}

#[async_trait]
impl RemoteGatewayTrait for RemoteSyncGateway {
    async fn push(&self, record: &SyncRecord) -> Result<()> {
        let kind = record.kind();
        let row = record.to_row()?;
        let token = self.session.access_token().await?;

        debug!(
            "[RemoteSync] Upserting {:?} for owner {}",
            kind,
            record.owner_id()
        );
        self.client
            .upsert_row(token.as_deref(), kind.table_name(), &row)
            .await?;
        Ok(())
    }

    async fn pull(&self, kind: SyncEntityKind, owner_id: &str) -> Result<Option<SyncRecord>> {
        let token = self.session.access_token().await?;
        let Some(row) = self
            .client
            .select_by_owner(token.as_deref(), kind.table_name(), owner_id)
            .await?
        else {
            debug!("[RemoteSync] No {:?} row for owner {}", kind, owner_id);
            return Ok(None);
        };

        let record = SyncRecord::from_row(kind, row).map_err(|e| {
            warn!("[RemoteSync] Unreadable {:?} row for owner {}: {}", kind, owner_id, e);
            Error::Remote(RemoteError::permanent(format!(
                "Malformed {} row: {}",
                kind.table_name(),
                e
            )))
        })?;

        if record.owner_id() != owner_id {
            return Err(RemoteError::permanent(format!(
                "{} row belongs to {}, expected {}",
                kind.table_name(),
                record.owner_id(),
                owner_id
            ))
            .into());
        }
        Ok(Some(record))
    }
}
