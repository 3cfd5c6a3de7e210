use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use thyro_core::sync::{QueuedTask, SyncTask};
use thyro_core::Result;

use crate::errors::StorageError;

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(primary_key(task_id))]
#[diesel(table_name = crate::schema::sync_task_queue)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct QueuedTaskDB {
    pub task_id: String,
    pub seq: i64,
    pub kind: String,
    pub payload: String,
    pub attempts: i32,
    pub next_attempt_at: Option<String>,
    pub last_error: Option<String>,
    pub enqueued_at: String,
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::CorruptRow(format!("bad timestamp '{}': {}", value, e)).into())
}

impl QueuedTaskDB {
    pub fn from_domain(task: &QueuedTask) -> Result<Self> {
        Ok(Self {
            task_id: task.task_id.clone(),
            seq: task.seq,
            kind: task.task.kind_code().to_string(),
            payload: serde_json::to_string(&task.task)?,
            attempts: i32::try_from(task.attempts).unwrap_or(i32::MAX),
            next_attempt_at: task.next_attempt_at.map(|ts| ts.to_rfc3339()),
            last_error: task.last_error.clone(),
            enqueued_at: task.enqueued_at.to_rfc3339(),
        })
    }

    pub fn into_domain(self) -> Result<QueuedTask> {
        let task: SyncTask = serde_json::from_str(&self.payload)?;
        Ok(QueuedTask {
            task_id: self.task_id,
            seq: self.seq,
            task,
            attempts: u32::try_from(self.attempts).unwrap_or(0),
            next_attempt_at: self
                .next_attempt_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
            last_error: self.last_error,
            enqueued_at: parse_timestamp(&self.enqueued_at)?,
        })
    }
}
