//! Ports implemented by the storage and remote crates.

use async_trait::async_trait;
use log::error;

use super::sync_model::{SyncEntityKind, SyncRecord};
use super::sync_task::{QueuedTask, TaskFailure};
use crate::errors::Result;

/// Durable key/blob storage for whole-record snapshots.
#[async_trait]
pub trait LocalRecordRepositoryTrait: Send + Sync {
    fn load_record(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite the blob stored under `key`.
    async fn save_record(&self, key: &str, payload: String) -> Result<()>;

    /// Remove the blob under `key`. Removing a missing key is not an error.
    async fn delete_record(&self, key: &str) -> Result<()>;
}

/// Durable storage behind the offline task queue.
#[async_trait]
pub trait TaskQueueRepositoryTrait: Send + Sync {
    /// All persisted tasks ordered by `seq`.
    fn load_tasks(&self) -> Result<Vec<QueuedTask>>;

    async fn insert_task(&self, task: QueuedTask) -> Result<()>;

    async fn update_task(&self, task: QueuedTask) -> Result<()>;

    async fn delete_tasks(&self, task_ids: Vec<String>) -> Result<()>;

    async fn clear_tasks(&self) -> Result<()>;
}

/// Push/pull access to the remote backend.
#[async_trait]
pub trait RemoteGatewayTrait: Send + Sync {
    /// Idempotent whole-record upsert keyed by owner id. Never retries.
    async fn push(&self, record: &SyncRecord) -> Result<()>;

    /// Fetch the single record of `kind` owned by `owner_id`.
    ///
    /// `Ok(None)` means the backend has no such row. Callers decide what to
    /// fall back to.
    async fn pull(&self, kind: SyncEntityKind, owner_id: &str) -> Result<Option<SyncRecord>>;
}

/// Source of the (possibly anonymous) owner id.
#[async_trait]
pub trait SessionProviderTrait: Send + Sync {
    /// Owner id of the current session, establishing one on first use.
    async fn owner_id(&self) -> Result<String>;

    /// Bearer token for the remote backend, refreshed as needed. `None` when
    /// the session is purely local.
    async fn access_token(&self) -> Result<Option<String>>;

    /// Forget the session. The next `owner_id` call starts a new one.
    async fn reset(&self) -> Result<()>;
}

/// Receives tasks the queue has given up on.
pub trait FailureSink: Send + Sync {
    fn task_failed(&self, failure: &TaskFailure);
}

/// Default sink: the failure ends up in the error log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFailureSink;

impl FailureSink for LogFailureSink {
    fn task_failed(&self, failure: &TaskFailure) {
        error!(
            "[TaskQueue] Giving up on task {} ({} for owner {}) after {} attempt(s), class={}: {}",
            failure.task.task_id,
            failure.task.task.kind_code(),
            failure.task.task.owner_id(),
            failure.task.attempts,
            failure.class.code(),
            failure.error
        );
    }
}
