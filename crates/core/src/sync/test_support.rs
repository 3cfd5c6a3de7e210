//! In-memory fakes of the sync ports.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use super::sync_model::{SyncEntityKind, SyncRecord};
use super::sync_task::{QueuedTask, TaskFailure};
use super::sync_traits::{
    FailureSink, LocalRecordRepositoryTrait, RemoteGatewayTrait, TaskQueueRepositoryTrait,
};
use crate::errors::{DatabaseError, Error, RemoteError, Result};

#[derive(Default)]
pub struct MemoryRecordRepository {
    records: Mutex<HashMap<String, String>>,
    saves: Mutex<HashMap<String, usize>>,
    save_attempts: AtomicUsize,
    save_gate: Mutex<Option<Arc<Notify>>>,
    fail_writes: AtomicBool,
}

impl MemoryRecordRepository {
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.records.lock().unwrap().get(key).cloned()
    }

    pub fn put_raw(&self, key: &str, payload: &str) {
        self.records
            .lock()
            .unwrap()
            .insert(key.to_string(), payload.to_string());
    }

    /// Number of successful saves under `key`.
    pub fn save_count(&self, key: &str) -> usize {
        self.saves.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    /// Hold every save until the returned notifier fires.
    pub fn gate_saves(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.save_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Saves started, including ones still held by the gate.
    pub fn save_attempts(&self) -> usize {
        self.save_attempts.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Database(DatabaseError::QueryFailed(
                "disk full".to_string(),
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl LocalRecordRepositoryTrait for MemoryRecordRepository {
    fn load_record(&self, key: &str) -> Result<Option<String>> {
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    async fn save_record(&self, key: &str, payload: String) -> Result<()> {
        self.save_attempts.fetch_add(1, Ordering::SeqCst);
        let gate = self.save_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check_writable()?;
        self.records
            .lock()
            .unwrap()
            .insert(key.to_string(), payload);
        *self.saves.lock().unwrap().entry(key.to_string()).or_default() += 1;
        Ok(())
    }

    async fn delete_record(&self, key: &str) -> Result<()> {
        self.check_writable()?;
        self.records.lock().unwrap().remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTaskQueueRepository {
    tasks: Mutex<Vec<QueuedTask>>,
}

impl MemoryTaskQueueRepository {
    pub fn stored(&self) -> Vec<QueuedTask> {
        let mut tasks = self.tasks.lock().unwrap().clone();
        tasks.sort_by_key(|task| task.seq);
        tasks
    }
}

#[async_trait]
impl TaskQueueRepositoryTrait for MemoryTaskQueueRepository {
    fn load_tasks(&self) -> Result<Vec<QueuedTask>> {
        Ok(self.stored())
    }

    async fn insert_task(&self, task: QueuedTask) -> Result<()> {
        self.tasks.lock().unwrap().push(task);
        Ok(())
    }

    async fn update_task(&self, task: QueuedTask) -> Result<()> {
        let mut tasks = self.tasks.lock().unwrap();
        if let Some(existing) = tasks.iter_mut().find(|t| t.task_id == task.task_id) {
            *existing = task;
        }
        Ok(())
    }

    async fn delete_tasks(&self, task_ids: Vec<String>) -> Result<()> {
        self.tasks
            .lock()
            .unwrap()
            .retain(|task| !task_ids.contains(&task.task_id));
        Ok(())
    }

    async fn clear_tasks(&self) -> Result<()> {
        self.tasks.lock().unwrap().clear();
        Ok(())
    }
}

/// Scriptable backend: push results are consumed in order, then default to success.
#[derive(Default)]
pub struct FakeGateway {
    remote: Mutex<HashMap<(SyncEntityKind, String), SyncRecord>>,
    push_log: Mutex<Vec<SyncRecord>>,
    push_script: Mutex<VecDeque<RemoteError>>,
    pull_error: Mutex<Option<RemoteError>>,
    pull_gate: Mutex<Option<Arc<Notify>>>,
    pull_count: Mutex<usize>,
}

impl FakeGateway {
    pub fn seed(&self, record: SyncRecord) {
        self.remote
            .lock()
            .unwrap()
            .insert((record.kind(), record.owner_id().to_string()), record);
    }

    pub fn remote_record(&self, kind: SyncEntityKind, owner_id: &str) -> Option<SyncRecord> {
        self.remote
            .lock()
            .unwrap()
            .get(&(kind, owner_id.to_string()))
            .cloned()
    }

    pub fn remote_len(&self) -> usize {
        self.remote.lock().unwrap().len()
    }

    /// Every push attempt, successful or not, in call order.
    pub fn push_log(&self) -> Vec<SyncRecord> {
        self.push_log.lock().unwrap().clone()
    }

    pub fn fail_next_pushes(&self, errors: impl IntoIterator<Item = RemoteError>) {
        self.push_script.lock().unwrap().extend(errors);
    }

    pub fn fail_pulls(&self, error: Option<RemoteError>) {
        *self.pull_error.lock().unwrap() = error;
    }

    /// Hold every pull until the returned notifier fires.
    pub fn gate_pulls(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.pull_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn pull_count(&self) -> usize {
        *self.pull_count.lock().unwrap()
    }
}

#[async_trait]
impl RemoteGatewayTrait for FakeGateway {
    async fn push(&self, record: &SyncRecord) -> Result<()> {
        self.push_log.lock().unwrap().push(record.clone());
        if let Some(err) = self.push_script.lock().unwrap().pop_front() {
            return Err(err.into());
        }
        self.seed(record.clone());
        Ok(())
    }

    async fn pull(&self, kind: SyncEntityKind, owner_id: &str) -> Result<Option<SyncRecord>> {
        *self.pull_count.lock().unwrap() += 1;
        let gate = self.pull_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(err) = self.pull_error.lock().unwrap().clone() {
            return Err(err.into());
        }
        Ok(self.remote_record(kind, owner_id))
    }
}

#[derive(Default)]
pub struct CollectingFailureSink {
    failures: Mutex<Vec<TaskFailure>>,
}

impl CollectingFailureSink {
    pub fn failures(&self) -> Vec<TaskFailure> {
        self.failures.lock().unwrap().clone()
    }
}

impl FailureSink for CollectingFailureSink {
    fn task_failed(&self, failure: &TaskFailure) {
        self.failures.lock().unwrap().push(failure.clone());
    }
}
