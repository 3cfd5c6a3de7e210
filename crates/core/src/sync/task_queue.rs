//! Durable, network-gated queue of pending remote writes.

use chrono::Utc;
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::network::NetworkMonitor;
use super::sync_task::{
    DrainReport, QueuedTask, RetryPolicy, SyncRetryClass, SyncTask, TaskFailure,
};
use super::sync_traits::{FailureSink, RemoteGatewayTrait, TaskQueueRepositoryTrait};

struct QueueState {
    tasks: VecDeque<QueuedTask>,
    next_seq: i64,
}

/// Ordered queue of [`SyncTask`]s executed against the remote gateway.
///
/// Every task is persisted before `enqueue` returns and restored on start-up.
/// A drain runs the tasks that are due strictly in enqueue order; failures are
/// retried with bounded exponential backoff and handed to the [`FailureSink`]
/// once they are permanent or out of attempts.
pub struct OfflineTaskQueue {
    weak_self: Weak<Self>,
    repository: Arc<dyn TaskQueueRepositoryTrait>,
    gateway: Arc<dyn RemoteGatewayTrait>,
    network: NetworkMonitor,
    failure_sink: Arc<dyn FailureSink>,
    policy: RetryPolicy,
    state: Mutex<QueueState>,
    drain_lock: Mutex<()>,
    wakeup: std::sync::Mutex<Option<JoinHandle<()>>>,
    listener: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl OfflineTaskQueue {
    pub fn new(
        repository: Arc<dyn TaskQueueRepositoryTrait>,
        gateway: Arc<dyn RemoteGatewayTrait>,
        network: NetworkMonitor,
        failure_sink: Arc<dyn FailureSink>,
        policy: RetryPolicy,
    ) -> Arc<Self> {
        let restored = match repository.load_tasks() {
            Ok(tasks) => tasks,
            Err(err) => {
                warn!("[TaskQueue] Failed to restore persisted tasks: {}", err);
                Vec::new()
            }
        };
        if !restored.is_empty() {
            info!("[TaskQueue] Restored {} pending task(s)", restored.len());
        }
        let next_seq = restored.iter().map(|task| task.seq).max().unwrap_or(0) + 1;

        Arc::new_cyclic(|weak_self| Self {
            weak_self: weak_self.clone(),
            repository,
            gateway,
            network,
            failure_sink,
            policy,
            state: Mutex::new(QueueState {
                tasks: restored.into(),
                next_seq,
            }),
            drain_lock: Mutex::new(()),
            wakeup: std::sync::Mutex::new(None),
            listener: std::sync::Mutex::new(None),
        })
    }

    /// Start listening for reachability transitions; each transition to
    /// reachable triggers a drain. Also kicks a drain for restored tasks.
    pub fn start(&self) {
        let weak = self.weak_self.clone();
        let mut rx = self.network.subscribe();
        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let reachable = *rx.borrow_and_update();
                if !reachable {
                    continue;
                }
                let Some(queue) = weak.upgrade() else {
                    break;
                };
                info!("[TaskQueue] Network reachable, draining queue");
                queue.drain().await;
            }
        });

        let previous = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }

        if self.network.is_reachable() {
            self.spawn_drain();
        }
    }

    /// Stop the reachability listener and any pending retry wake-up.
    pub fn shutdown(&self) {
        for slot in [&self.listener, &self.wakeup] {
            if let Some(handle) = slot.lock().unwrap_or_else(PoisonError::into_inner).take() {
                handle.abort();
            }
        }
    }

    /// Append a task. Any queued task it supersedes is dropped. If the
    /// network is reachable a drain is started in the background.
    pub async fn enqueue(&self, task: SyncTask) -> QueuedTask {
        let queued = {
            let mut state = self.state.lock().await;
            let queued = QueuedTask::new(task, state.next_seq);
            state.next_seq += 1;

            let mut superseded = Vec::new();
            state.tasks.retain(|existing| {
                if queued.task.supersedes(&existing.task) {
                    superseded.push(existing.task_id.clone());
                    false
                } else {
                    true
                }
            });
            if !superseded.is_empty() {
                debug!(
                    "[TaskQueue] {} supersedes {} queued task(s)",
                    queued.task.kind_code(),
                    superseded.len()
                );
                if let Err(err) = self.repository.delete_tasks(superseded).await {
                    warn!("[TaskQueue] Failed to drop superseded tasks: {}", err);
                }
            }

            if let Err(err) = self.repository.insert_task(queued.clone()).await {
                warn!(
                    "[TaskQueue] Failed to persist task {}; it will not survive a restart: {}",
                    queued.task_id, err
                );
            }
            state.tasks.push_back(queued.clone());
            debug!(
                "[TaskQueue] Enqueued {} for owner {} (queue size {})",
                queued.task.kind_code(),
                queued.task.owner_id(),
                state.tasks.len()
            );
            queued
        };

        if self.network.is_reachable() {
            self.spawn_drain();
        }
        queued
    }

    /// Run every due task once, in enqueue order.
    pub async fn drain(&self) -> DrainReport {
        let _drain_guard = self.drain_lock.lock().await;

        let now = Utc::now();
        let snapshot: Vec<QueuedTask> = {
            let mut state = self.state.lock().await;
            let (due, waiting): (Vec<_>, Vec<_>) =
                state.tasks.drain(..).partition(|task| task.is_due(now));
            state.tasks = waiting.into();
            due
        };

        let mut report = DrainReport::default();
        if snapshot.is_empty() {
            return report;
        }
        debug!("[TaskQueue] Draining {} task(s)", snapshot.len());

        for mut queued in snapshot {
            let err = match self.gateway.push(&queued.task.record()).await {
                Ok(()) => {
                    self.forget(&queued).await;
                    report.succeeded += 1;
                    continue;
                }
                Err(err) => err,
            };

            queued.attempts += 1;
            queued.last_error = Some(err.to_string());
            let class = err.retry_class();

            if class == SyncRetryClass::Permanent || self.policy.is_exhausted(queued.attempts) {
                self.forget(&queued).await;
                self.failure_sink.task_failed(&TaskFailure {
                    task: queued,
                    class,
                    error: err.to_string(),
                });
                report.failed += 1;
                continue;
            }

            let backoff = self.policy.backoff(queued.attempts);
            let delay = chrono::Duration::from_std(backoff).unwrap_or(chrono::Duration::zero());
            queued.next_attempt_at = Some(Utc::now() + delay);
            info!(
                "[TaskQueue] {} for owner {} failed (attempt {}/{}, class={}), retrying in {:?}: {}",
                queued.task.kind_code(),
                queued.task.owner_id(),
                queued.attempts,
                self.policy.max_attempts,
                class.code(),
                backoff,
                err
            );
            if self.requeue(queued).await {
                report.retried += 1;
            } else {
                report.superseded += 1;
            }
        }

        self.schedule_wakeup().await;
        debug!("[TaskQueue] Drain finished: {:?}", report);
        report
    }

    /// Tasks currently waiting, in enqueue order.
    pub async fn pending(&self) -> Vec<QueuedTask> {
        self.state.lock().await.tasks.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.tasks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.tasks.is_empty()
    }

    /// Drop every queued task, in memory and on disk.
    pub async fn purge(&self) {
        let mut state = self.state.lock().await;
        state.tasks.clear();
        if let Err(err) = self.repository.clear_tasks().await {
            warn!("[TaskQueue] Failed to purge persisted tasks: {}", err);
        }
        info!("[TaskQueue] Purged all pending tasks");
    }

    fn spawn_drain(&self) {
        if let Some(queue) = self.weak_self.upgrade() {
            tokio::spawn(async move {
                queue.drain().await;
            });
        }
    }

    async fn forget(&self, queued: &QueuedTask) {
        if let Err(err) = self
            .repository
            .delete_tasks(vec![queued.task_id.clone()])
            .await
        {
            warn!(
                "[TaskQueue] Failed to remove task {} from storage: {}",
                queued.task_id, err
            );
        }
    }

    /// Put a failed task back in seq order. Returns false when a newer task for
    /// the same record was enqueued meanwhile, in which case the failed one is
    /// dropped.
    async fn requeue(&self, queued: QueuedTask) -> bool {
        let mut state = self.state.lock().await;
        if state
            .tasks
            .iter()
            .any(|existing| existing.task.supersedes(&queued.task))
        {
            debug!(
                "[TaskQueue] Dropping failed {} for owner {}: superseded by a newer task",
                queued.task.kind_code(),
                queued.task.owner_id()
            );
            drop(state);
            self.forget(&queued).await;
            return false;
        }

        if let Err(err) = self.repository.update_task(queued.clone()).await {
            warn!(
                "[TaskQueue] Failed to persist retry state of task {}: {}",
                queued.task_id, err
            );
        }
        let position = state
            .tasks
            .iter()
            .position(|existing| existing.seq > queued.seq)
            .unwrap_or(state.tasks.len());
        state.tasks.insert(position, queued);
        true
    }

    /// Arrange a drain at the earliest retry time, if any task is waiting.
    async fn schedule_wakeup(&self) {
        let earliest = {
            let state = self.state.lock().await;
            state
                .tasks
                .iter()
                .filter_map(|task| task.next_attempt_at)
                .min()
        };

        let mut slot = self.wakeup.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        let (Some(at), Some(queue)) = (earliest, self.weak_self.upgrade()) else {
            return;
        };
        let wait = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);

        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            queue
                .wakeup
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if queue.network.is_reachable() {
                queue.spawn_drain();
            } else {
                debug!("[TaskQueue] Retry due but network unreachable; waiting for reconnect");
            }
        }));
    }
}
