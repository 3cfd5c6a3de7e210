//! In-memory authoritative cache for one owner-scoped entity kind.

use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use super::local_store::PersistentLocalStore;
use super::sync_model::SyncEntity;
use super::sync_task::SyncTask;
use super::sync_traits::RemoteGatewayTrait;
use super::task_queue::OfflineTaskQueue;

pub const DEFAULT_SETTLE_WINDOW: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Quiet period after the last `set` before the value is persisted and
    /// queued for push.
    pub settle_window: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            settle_window: DEFAULT_SETTLE_WINDOW,
        }
    }
}

/// Externally observable store state. There is no loading state.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreState<T> {
    Uninitialized,
    Ready { owner_id: String, value: Option<T> },
}

impl<T> StoreState<T> {
    pub fn owner_id(&self) -> Option<&str> {
        match self {
            Self::Ready { owner_id, .. } => Some(owner_id),
            Self::Uninitialized => None,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Ready { value, .. } => value.as_ref(),
            Self::Uninitialized => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// Where a completed load took its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Remote,
    Local,
    /// Remote and local had nothing usable; the value already held in memory
    /// for this owner was kept.
    Memory,
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange<T> {
    Loaded {
        owner_id: String,
        value: Option<T>,
        source: LoadSource,
    },
    Updated {
        owner_id: String,
        value: T,
    },
    Cleared,
}

impl<T> StoreChange<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Loaded { value, .. } => value.as_ref(),
            Self::Updated { value, .. } => Some(value),
            Self::Cleared => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Accepted,
    RejectedOwnerMismatch,
    /// A patch needs a current value to apply to.
    RejectedNotReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(LoadSource),
    RejectedOwnerMismatch,
    /// The store changed owner or value while the pull was in flight; the
    /// result was discarded.
    Superseded,
}

pub type SubscriptionId = u64;

type Listener<T> = Arc<dyn Fn(&StoreChange<T>) + Send + Sync>;

struct PendingFlush {
    generation: u64,
    handle: JoinHandle<()>,
}

struct Slot<T> {
    state: StoreState<T>,
    /// Bumped whenever the owner is adopted or dropped.
    epoch: u64,
    /// Bumped on every accepted value change.
    revision: u64,
    pending: Option<PendingFlush>,
    next_generation: u64,
}

/// Reactive, owner-guarded cache for one entity kind.
///
/// Writes land in memory immediately and notify listeners; persistence and
/// the remote push are debounced by [`StoreConfig::settle_window`]. Lock order
/// is `flush_lock`, `slot`, then `notify_lock`. `notify_lock` is taken before
/// `slot` is released, so listeners see changes in commit order.
pub struct ReactiveEntityStore<T: SyncEntity> {
    weak_self: Weak<Self>,
    config: StoreConfig,
    local_store: Arc<PersistentLocalStore>,
    gateway: Arc<dyn RemoteGatewayTrait>,
    queue: Arc<OfflineTaskQueue>,
    slot: Mutex<Slot<T>>,
    flush_lock: Mutex<()>,
    notify_lock: Mutex<()>,
    listeners: std::sync::Mutex<Vec<(SubscriptionId, Listener<T>)>>,
    next_subscription: AtomicU64,
    snapshot_tx: watch::Sender<StoreState<T>>,
}

impl<T: SyncEntity> ReactiveEntityStore<T> {
    pub fn new(
        config: StoreConfig,
        local_store: Arc<PersistentLocalStore>,
        gateway: Arc<dyn RemoteGatewayTrait>,
        queue: Arc<OfflineTaskQueue>,
    ) -> Arc<Self> {
        let (snapshot_tx, _) = watch::channel(StoreState::Uninitialized);
        Arc::new_cyclic(|weak_self| Self {
            weak_self: weak_self.clone(),
            config,
            local_store,
            gateway,
            queue,
            slot: Mutex::new(Slot {
                state: StoreState::Uninitialized,
                epoch: 0,
                revision: 0,
                pending: None,
                next_generation: 0,
            }),
            flush_lock: Mutex::new(()),
            notify_lock: Mutex::new(()),
            listeners: std::sync::Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            snapshot_tx,
        })
    }

    /// Latest published state.
    pub fn current(&self) -> StoreState<T> {
        self.snapshot_tx.borrow().clone()
    }

    /// Receiver that always holds the latest published state.
    pub fn watch(&self) -> watch::Receiver<StoreState<T>> {
        self.snapshot_tx.subscribe()
    }

    /// Register a change listener. Listeners run synchronously, in
    /// registration order, after the store lock has been released. Changes
    /// reach listeners in the order they were committed.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StoreChange<T>) + Send + Sync + 'static,
    {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Replace the value. Adopts the entity's owner when uninitialized and
    /// rejects entities of any other owner once one is adopted.
    pub async fn set(&self, entity: T) -> SetOutcome {
        let mut slot = self.slot.lock().await;
        match slot.state.owner_id() {
            Some(current) if current != entity.owner_id() => {
                warn!(
                    "{} Rejecting write for owner {}: store belongs to {}",
                    T::KIND.log_tag(),
                    entity.owner_id(),
                    current
                );
                return SetOutcome::RejectedOwnerMismatch;
            }
            Some(_) => {}
            None => {
                slot.epoch += 1;
                debug!("{} Adopting owner {}", T::KIND.log_tag(), entity.owner_id());
            }
        }

        let change = self.accept(&mut slot, entity);
        let _notify_guard = self.notify_lock.lock().await;
        drop(slot);
        self.notify(&change);
        SetOutcome::Accepted
    }

    /// Apply a field delta to the current value.
    pub async fn patch(&self, patch: &T::Patch) -> SetOutcome {
        let mut slot = self.slot.lock().await;
        let Some(current) = slot.state.value() else {
            debug!(
                "{} Ignoring patch {:?}: no current value",
                T::KIND.log_tag(),
                patch
            );
            return SetOutcome::RejectedNotReady;
        };
        let next = current.apply_patch(patch);

        let change = self.accept(&mut slot, next);
        let _notify_guard = self.notify_lock.lock().await;
        drop(slot);
        self.notify(&change);
        SetOutcome::Accepted
    }

    /// Pull the owner's record, falling back to the local record when the
    /// remote has none or cannot be reached.
    pub async fn load_for_owner(&self, owner_id: &str) -> LoadOutcome {
        let tag = T::KIND.log_tag();
        let (epoch, revision) = {
            let slot = self.slot.lock().await;
            if let Some(current) = slot.state.owner_id() {
                if current != owner_id {
                    warn!(
                        "{} Rejecting load for owner {}: store belongs to {}",
                        tag, owner_id, current
                    );
                    return LoadOutcome::RejectedOwnerMismatch;
                }
            }
            (slot.epoch, slot.revision)
        };

        let remote = match self.gateway.pull(T::KIND, owner_id).await {
            Ok(Some(record)) => match T::from_record(record) {
                Some(value) if value.owner_id() == owner_id => Some(value),
                Some(value) => {
                    warn!(
                        "{} Remote returned a record of owner {} for {}; ignoring it",
                        tag,
                        value.owner_id(),
                        owner_id
                    );
                    None
                }
                None => {
                    warn!("{} Remote returned a record of another kind", tag);
                    None
                }
            },
            Ok(None) => {
                debug!("{} No remote record for owner {}", tag, owner_id);
                None
            }
            Err(err) => {
                warn!(
                    "{} Pull for owner {} failed, falling back to local: {}",
                    tag, owner_id, err
                );
                None
            }
        };

        let (mut value, mut source) = match remote {
            Some(value) => (Some(value), LoadSource::Remote),
            None => match self.local_store.load::<T>(T::KIND.record_key()) {
                Some(local) if local.owner_id() == owner_id => (Some(local), LoadSource::Local),
                Some(local) => {
                    debug!(
                        "{} Ignoring local record of owner {}",
                        tag,
                        local.owner_id()
                    );
                    (None, LoadSource::Empty)
                }
                None => (None, LoadSource::Empty),
            },
        };

        let flush_guard = self.flush_lock.lock().await;
        let (change, notify_guard) = {
            let mut slot = self.slot.lock().await;
            if slot.epoch != epoch || slot.revision != revision {
                debug!(
                    "{} Discarding load for owner {}: store changed while loading",
                    tag, owner_id
                );
                return LoadOutcome::Superseded;
            }
            if value.is_none() {
                if let Some(held) = slot.state.value() {
                    value = Some(held.clone());
                    source = LoadSource::Memory;
                }
            }
            if !slot.state.is_ready() {
                slot.epoch += 1;
            }
            slot.state = StoreState::Ready {
                owner_id: owner_id.to_string(),
                value: value.clone(),
            };
            self.publish(&slot.state);
            let change = StoreChange::Loaded {
                owner_id: owner_id.to_string(),
                value: value.clone(),
                source,
            };
            (change, self.notify_lock.lock().await)
        };

        if let (LoadSource::Remote, Some(value)) = (source, &value) {
            self.local_store.save(T::KIND.record_key(), value).await;
        }
        drop(flush_guard);

        info!(
            "{} Loaded owner {} from {:?} (present={})",
            tag,
            owner_id,
            source,
            value.is_some()
        );
        self.notify(&change);
        drop(notify_guard);
        LoadOutcome::Loaded(source)
    }

    /// Drop the value and owner, cancel any pending flush and delete the
    /// local record.
    pub async fn clear(&self) {
        let flush_guard = self.flush_lock.lock().await;
        let notify_guard = {
            let mut slot = self.slot.lock().await;
            if let Some(pending) = slot.pending.take() {
                pending.handle.abort();
            }
            slot.state = StoreState::Uninitialized;
            slot.epoch += 1;
            slot.revision += 1;
            self.publish(&slot.state);
            self.notify_lock.lock().await
        };
        self.local_store.delete(T::KIND.record_key()).await;
        drop(flush_guard);

        info!("{} Cleared", T::KIND.log_tag());
        self.notify(&StoreChange::Cleared);
        drop(notify_guard);
    }

    /// Run a pending debounced flush now instead of waiting for the timer.
    pub async fn flush(&self) {
        let generation = {
            let slot = self.slot.lock().await;
            slot.pending.as_ref().map(|pending| pending.generation)
        };
        if let Some(generation) = generation {
            self.run_flush(generation, true).await;
        }
    }

    pub async fn has_pending_flush(&self) -> bool {
        self.slot.lock().await.pending.is_some()
    }

    fn accept(&self, slot: &mut Slot<T>, value: T) -> StoreChange<T> {
        let owner_id = value.owner_id().to_string();
        slot.state = StoreState::Ready {
            owner_id: owner_id.clone(),
            value: Some(value.clone()),
        };
        slot.revision += 1;
        self.schedule_flush(slot);
        self.publish(&slot.state);
        StoreChange::Updated { owner_id, value }
    }

    fn schedule_flush(&self, slot: &mut Slot<T>) {
        if let Some(pending) = slot.pending.take() {
            pending.handle.abort();
        }
        slot.next_generation += 1;
        let generation = slot.next_generation;

        let weak = self.weak_self.clone();
        let window = self.config.settle_window;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if let Some(store) = weak.upgrade() {
                store.run_flush(generation, false).await;
            }
        });
        slot.pending = Some(PendingFlush { generation, handle });
    }

    async fn run_flush(&self, generation: u64, abort_timer: bool) {
        let _flush_guard = self.flush_lock.lock().await;
        let value = {
            let mut slot = self.slot.lock().await;
            match slot.pending.take() {
                Some(pending) if pending.generation == generation => {
                    if abort_timer {
                        pending.handle.abort();
                    }
                }
                other => {
                    slot.pending = other;
                    return;
                }
            }
            match slot.state.value() {
                Some(value) => value.clone(),
                None => return,
            }
        };

        debug!(
            "{} Settled; persisting and queueing push for owner {}",
            T::KIND.log_tag(),
            value.owner_id()
        );
        self.local_store.save(T::KIND.record_key(), &value).await;
        self.queue
            .enqueue(SyncTask::push(value.into_record()))
            .await;
    }

    fn publish(&self, state: &StoreState<T>) {
        self.snapshot_tx.send_replace(state.clone());
    }

    fn notify(&self, change: &StoreChange<T>) {
        let listeners: Vec<Listener<T>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RemoteError;
    use crate::journey::{Condition, Profile, ProfilePatch, Stage};
    use crate::sync::test_support::{
        CollectingFailureSink, FakeGateway, MemoryRecordRepository, MemoryTaskQueueRepository,
    };
    use crate::sync::{NetworkMonitor, RetryPolicy, SyncRecord};

    struct Harness {
        store: Arc<ReactiveEntityStore<Profile>>,
        records: Arc<MemoryRecordRepository>,
        queue: Arc<OfflineTaskQueue>,
        gateway: Arc<FakeGateway>,
    }

    fn harness() -> Harness {
        let records = Arc::new(MemoryRecordRepository::default());
        let gateway = Arc::new(FakeGateway::default());
        let queue = OfflineTaskQueue::new(
            Arc::new(MemoryTaskQueueRepository::default()),
            gateway.clone(),
            NetworkMonitor::new(false),
            Arc::new(CollectingFailureSink::default()),
            RetryPolicy::default(),
        );
        let store = ReactiveEntityStore::new(
            StoreConfig::default(),
            Arc::new(PersistentLocalStore::new(records.clone())),
            gateway.clone(),
            queue.clone(),
        );
        Harness {
            store,
            records,
            queue,
            gateway,
        }
    }

    fn profile(owner: &str, stage: Stage) -> Profile {
        Profile::new(owner, Condition::Cancer, stage)
    }

    fn stored_profile(records: &MemoryRecordRepository) -> Option<Profile> {
        records
            .raw("profile")
            .map(|raw| serde_json::from_str(&raw).expect("stored profile decodes"))
    }

    #[tokio::test(start_paused = true)]
    async fn first_set_adopts_owner() {
        let h = harness();
        assert_eq!(h.store.current(), StoreState::Uninitialized);

        let outcome = h.store.set(profile("a", Stage::Dx)).await;

        assert_eq!(outcome, SetOutcome::Accepted);
        assert_eq!(h.store.current().owner_id(), Some("a"));
        assert_eq!(h.store.current().value(), Some(&profile("a", Stage::Dx)));
    }

    #[tokio::test(start_paused = true)]
    async fn write_for_other_owner_is_rejected() {
        let h = harness();
        h.store.set(profile("a", Stage::Dx)).await;
        h.store.flush().await;
        let before = h.store.current();

        let outcome = h.store.set(profile("b", Stage::RaiPrep)).await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(outcome, SetOutcome::RejectedOwnerMismatch);
        assert_eq!(h.store.current(), before);
        assert_eq!(h.records.save_count("profile"), 1);
        assert_eq!(h.queue.len().await, 1);
        assert_eq!(h.queue.pending().await[0].task.owner_id(), "a");
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_sets_coalesce_into_one_flush() {
        let h = harness();
        h.store.set(profile("a", Stage::Dx)).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        h.store.set(profile("a", Stage::MedTitration)).await;

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(h.records.save_count("profile"), 0);
        assert!(h.queue.is_empty().await);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(h.records.save_count("profile"), 1);
        assert_eq!(
            stored_profile(&h.records),
            Some(profile("a", Stage::MedTitration))
        );
        let pending = h.queue.pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].seq, 1);
        assert_eq!(
            pending[0].task.record(),
            SyncRecord::Profile(profile("a", Stage::MedTitration))
        );
        assert!(!h.store.has_pending_flush().await);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_runs_pending_write_immediately() {
        let h = harness();
        h.store.set(profile("a", Stage::Dx)).await;

        h.store.flush().await;

        assert_eq!(h.records.save_count("profile"), 1);
        assert_eq!(h.queue.len().await, 1);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.records.save_count("profile"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_falls_back_to_matching_local_record() {
        let h = harness();
        let local = profile("a", Stage::Surveillance);
        h.records
            .put_raw("profile", &serde_json::to_string(&local).unwrap());

        let outcome = h.store.load_for_owner("a").await;

        assert_eq!(outcome, LoadOutcome::Loaded(LoadSource::Local));
        assert_eq!(
            h.store.current(),
            StoreState::Ready {
                owner_id: "a".to_string(),
                value: Some(local)
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn pull_error_falls_back_to_local_record() {
        let h = harness();
        let local = profile("a", Stage::RaiIsolation);
        h.records
            .put_raw("profile", &serde_json::to_string(&local).unwrap());
        h.gateway
            .fail_pulls(Some(RemoteError::retryable("connection reset")));

        let outcome = h.store.load_for_owner("a").await;

        assert_eq!(outcome, LoadOutcome::Loaded(LoadSource::Local));
        assert_eq!(h.store.current().value(), Some(&local));
    }

    #[tokio::test(start_paused = true)]
    async fn local_record_of_other_owner_is_ignored() {
        let h = harness();
        h.records.put_raw(
            "profile",
            &serde_json::to_string(&profile("someone-else", Stage::Dx)).unwrap(),
        );

        let outcome = h.store.load_for_owner("a").await;

        assert_eq!(outcome, LoadOutcome::Loaded(LoadSource::Empty));
        assert_eq!(
            h.store.current(),
            StoreState::Ready {
                owner_id: "a".to_string(),
                value: None
            }
        );
        assert!(h.records.raw("profile").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn remote_record_wins_and_is_mirrored_locally() {
        let h = harness();
        h.records.put_raw(
            "profile",
            &serde_json::to_string(&profile("a", Stage::Dx)).unwrap(),
        );
        let remote = profile("a", Stage::Surveillance);
        h.gateway.seed(SyncRecord::Profile(remote.clone()));

        let outcome = h.store.load_for_owner("a").await;

        assert_eq!(outcome, LoadOutcome::Loaded(LoadSource::Remote));
        assert_eq!(h.store.current().value(), Some(&remote));
        assert_eq!(stored_profile(&h.records), Some(remote));
        assert!(h.queue.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_keeps_value_already_in_memory() {
        let h = harness();
        h.records.fail_writes(true);
        h.store.set(profile("a", Stage::PreSurgery)).await;
        h.store.flush().await;

        let outcome = h.store.load_for_owner("a").await;

        assert_eq!(outcome, LoadOutcome::Loaded(LoadSource::Memory));
        assert_eq!(
            h.store.current().value(),
            Some(&profile("a", Stage::PreSurgery))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn load_for_other_owner_is_rejected() {
        let h = harness();
        h.store.set(profile("a", Stage::Dx)).await;

        assert_eq!(
            h.store.load_for_owner("b").await,
            LoadOutcome::RejectedOwnerMismatch
        );
        assert_eq!(h.gateway.pull_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn load_completing_after_clear_is_discarded() {
        let h = harness();
        h.gateway
            .seed(SyncRecord::Profile(profile("a", Stage::Surveillance)));
        let gate = h.gateway.gate_pulls();

        let store = h.store.clone();
        let load = tokio::spawn(async move { store.load_for_owner("a").await });
        while h.gateway.pull_count() == 0 {
            tokio::task::yield_now().await;
        }
        h.store.clear().await;
        gate.notify_one();

        assert_eq!(load.await.unwrap(), LoadOutcome::Superseded);
        assert_eq!(h.store.current(), StoreState::Uninitialized);
        assert!(h.records.raw("profile").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn load_completing_after_set_is_discarded() {
        let h = harness();
        h.gateway.seed(SyncRecord::Profile(profile("a", Stage::Dx)));
        let gate = h.gateway.gate_pulls();

        let store = h.store.clone();
        let load = tokio::spawn(async move { store.load_for_owner("a").await });
        while h.gateway.pull_count() == 0 {
            tokio::task::yield_now().await;
        }
        h.store.set(profile("a", Stage::RaiPrep)).await;
        gate.notify_one();

        assert_eq!(load.await.unwrap(), LoadOutcome::Superseded);
        assert_eq!(
            h.store.current().value(),
            Some(&profile("a", Stage::RaiPrep))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn set_during_load_mirror_is_notified_last() {
        let h = harness();
        h.gateway
            .seed(SyncRecord::Profile(profile("a", Stage::RaiPrep)));
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        h.store.subscribe(move |change: &StoreChange<Profile>| {
            sink.lock().unwrap().push(change.value().map(|p| p.stage));
        });
        let gate = h.records.gate_saves();

        let store = h.store.clone();
        let load = tokio::spawn(async move { store.load_for_owner("a").await });
        while h.records.save_attempts() == 0 {
            tokio::task::yield_now().await;
        }
        let store = h.store.clone();
        let set = tokio::spawn(async move { store.set(profile("a", Stage::Dx)).await });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        gate.notify_one();

        assert_eq!(load.await.unwrap(), LoadOutcome::Loaded(LoadSource::Remote));
        assert_eq!(set.await.unwrap(), SetOutcome::Accepted);
        assert_eq!(h.store.current().value().map(|p| p.stage), Some(Stage::Dx));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some(Stage::RaiPrep), Some(Stage::Dx)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn clear_cancels_pending_flush_and_releases_owner() {
        let h = harness();
        h.store.set(profile("a", Stage::Dx)).await;
        h.store.clear().await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(h.records.save_count("profile"), 0);
        assert!(h.queue.is_empty().await);
        assert_eq!(h.store.current(), StoreState::Uninitialized);

        assert_eq!(
            h.store.set(profile("b", Stage::Dx)).await,
            SetOutcome::Accepted
        );
        assert_eq!(h.store.current().owner_id(), Some("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_deletes_local_record() {
        let h = harness();
        h.store.set(profile("a", Stage::Dx)).await;
        h.store.flush().await;
        assert!(h.records.raw("profile").is_some());

        h.store.clear().await;

        assert!(h.records.raw("profile").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn patch_requires_a_value() {
        let h = harness();
        let patch = ProfilePatch::default().on_lid(true);

        assert_eq!(h.store.patch(&patch).await, SetOutcome::RejectedNotReady);

        h.store.set(profile("a", Stage::RaiPrep)).await;
        assert_eq!(h.store.patch(&patch).await, SetOutcome::Accepted);
        let current = h.store.current();
        let value = current.value().expect("value");
        assert!(value.on_lid);
        assert_eq!(value.stage, Stage::RaiPrep);
    }

    #[tokio::test(start_paused = true)]
    async fn listeners_run_in_registration_order() {
        let h = harness();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));

        let first = seen.clone();
        h.store.subscribe(move |change: &StoreChange<Profile>| {
            first.lock().unwrap().push(format!("first:{}", change.value().is_some()));
        });
        let second = seen.clone();
        let second_id = h.store.subscribe(move |_: &StoreChange<Profile>| {
            second.lock().unwrap().push("second".to_string());
        });

        h.store.set(profile("a", Stage::Dx)).await;
        assert!(h.store.unsubscribe(second_id));
        h.store.clear().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:true", "second", "first:false"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_write_does_not_notify() {
        let h = harness();
        h.store.set(profile("a", Stage::Dx)).await;
        let count = Arc::new(AtomicU64::new(0));
        let counter = count.clone();
        h.store.subscribe(move |_: &StoreChange<Profile>| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        h.store.set(profile("b", Stage::Dx)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn watch_receives_latest_state() {
        let h = harness();
        let mut rx = h.store.watch();

        h.store.set(profile("a", Stage::Dx)).await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().owner_id(), Some("a"));
    }
}
