use async_trait::async_trait;
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::warn;
use std::sync::Arc;

use thyro_core::sync::{QueuedTask, TaskQueueRepositoryTrait};
use thyro_core::Result;

use super::model::QueuedTaskDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::sync_task_queue;

pub struct TaskQueueRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl TaskQueueRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        TaskQueueRepository { pool, writer }
    }
}

#[async_trait]
impl TaskQueueRepositoryTrait for TaskQueueRepository {
    fn load_tasks(&self) -> Result<Vec<QueuedTask>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = sync_task_queue::table
            .order(sync_task_queue::seq.asc())
            .load::<QueuedTaskDB>(&mut conn)
            .map_err(StorageError::from)?;

        let mut tasks = Vec::with_capacity(rows.len());
        for row in rows {
            let task_id = row.task_id.clone();
            match row.into_domain() {
                Ok(task) => tasks.push(task),
                Err(err) => warn!("[TaskQueue] Skipping unreadable task {}: {}", task_id, err),
            }
        }
        Ok(tasks)
    }

    async fn insert_task(&self, task: QueuedTask) -> Result<()> {
        let row = QueuedTaskDB::from_domain(&task)?;
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(sync_task_queue::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn update_task(&self, task: QueuedTask) -> Result<()> {
        let row = QueuedTaskDB::from_domain(&task)?;
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::update(sync_task_queue::table.find(row.task_id.clone()))
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn delete_tasks(&self, task_ids: Vec<String>) -> Result<()> {
        if task_ids.is_empty() {
            return Ok(());
        }
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                let matching = sync_task_queue::task_id.eq_any(task_ids);
                diesel::delete(sync_task_queue::table.filter(matching))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn clear_tasks(&self) -> Result<()> {
        self.writer
            .exec(|conn: &mut SqliteConnection| -> Result<()> {
                diesel::delete(sync_task_queue::table)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, init, run_migrations, spawn_writer};
    use chrono::Utc;
    use tempfile::tempdir;
    use thyro_core::journey::{Condition, Profile, Stage};
    use thyro_core::preferences::Config;
    use thyro_core::sync::SyncTask;

    fn setup_repository() -> (tempfile::TempDir, TaskQueueRepository, WriteHandle) {
        let dir = tempdir().expect("tempdir");
        let db_path = init(&dir.path().join("thyro.db").to_string_lossy()).expect("init db");
        run_migrations(&db_path).expect("migrate db");
        let pool = create_pool(&db_path).expect("create pool");
        let writer = spawn_writer(pool.as_ref().clone());
        (
            dir,
            TaskQueueRepository::new(pool, writer.clone()),
            writer,
        )
    }

    fn profile_task(owner: &str, seq: i64) -> QueuedTask {
        QueuedTask::new(
            SyncTask::PushProfile(Profile::new(owner, Condition::Hypo, Stage::Dx)),
            seq,
        )
    }

    #[tokio::test]
    async fn tasks_load_in_seq_order() {
        let (_dir, repo, _writer) = setup_repository();
        repo.insert_task(profile_task("b", 2)).await.unwrap();
        repo.insert_task(profile_task("a", 1)).await.unwrap();
        repo.insert_task(QueuedTask::new(SyncTask::PushConfig(Config::new("c")), 3))
            .await
            .unwrap();

        let tasks = repo.load_tasks().unwrap();

        let owners: Vec<&str> = tasks.iter().map(|t| t.task.owner_id()).collect();
        assert_eq!(owners, vec!["a", "b", "c"]);
        assert_eq!(tasks[2].task.kind_code(), "push_config");
    }

    #[tokio::test]
    async fn update_persists_retry_state() {
        let (_dir, repo, _writer) = setup_repository();
        let mut task = profile_task("a", 1);
        repo.insert_task(task.clone()).await.unwrap();

        task.attempts = 2;
        task.last_error = Some("503 Service Unavailable".to_string());
        task.next_attempt_at = Some(Utc::now() + chrono::Duration::seconds(20));
        repo.update_task(task.clone()).await.unwrap();

        let loaded = repo.load_tasks().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].attempts, 2);
        assert_eq!(loaded[0].last_error, task.last_error);
        assert_eq!(
            loaded[0].next_attempt_at.map(|ts| ts.timestamp()),
            task.next_attempt_at.map(|ts| ts.timestamp())
        );
        assert_eq!(loaded[0].task, task.task);
    }

    #[tokio::test]
    async fn delete_and_clear() {
        let (_dir, repo, _writer) = setup_repository();
        let first = profile_task("a", 1);
        let second = profile_task("b", 2);
        repo.insert_task(first.clone()).await.unwrap();
        repo.insert_task(second.clone()).await.unwrap();
        repo.insert_task(profile_task("c", 3)).await.unwrap();

        repo.delete_tasks(vec![first.task_id.clone()]).await.unwrap();
        repo.delete_tasks(Vec::new()).await.unwrap();
        assert_eq!(repo.load_tasks().unwrap().len(), 2);

        repo.clear_tasks().await.unwrap();
        assert!(repo.load_tasks().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_job_rolls_back() {
        let (_dir, repo, writer) = setup_repository();
        let row = QueuedTaskDB::from_domain(&profile_task("a", 1)).unwrap();

        let result = writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(sync_task_queue::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Err(thyro_core::Error::InvalidInput("abort".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert!(repo.load_tasks().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreadable_rows_are_skipped() {
        let (_dir, repo, writer) = setup_repository();
        repo.insert_task(profile_task("a", 2)).await.unwrap();
        let mut broken = QueuedTaskDB::from_domain(&profile_task("x", 1)).unwrap();
        broken.payload = "{\"type\":\"push_nothing\"}".to_string();
        writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(sync_task_queue::table)
                    .values(&broken)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
            .unwrap();

        let tasks = repo.load_tasks().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].task.owner_id(), "a");
    }
}
