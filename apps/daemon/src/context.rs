//! Wires storage, remote access and the sync core into one service graph.

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use tokio::task::JoinHandle;

use thyro_core::activity::{ActivityLog, AppointmentBook, DayBoundary, LocalDayBoundary};
use thyro_core::cards::CardFeed;
use thyro_core::journey::Profile;
use thyro_core::preferences::Config;
use thyro_core::sync::{
    JourneySyncService, LocalSessionProvider, LogFailureSink, NetworkMonitor, OfflineTaskQueue,
    PersistentLocalStore, ReactiveEntityStore, RemoteGatewayTrait, SessionProviderTrait,
    SyncEntityKind, SyncRecord,
};
use thyro_core::RemoteError;
use thyro_remote_sync::{
    AnonymousSessionProvider, ReachabilityPoller, RemoteSyncClient, RemoteSyncGateway,
};
use thyro_storage_sqlite::{
    create_pool, init, run_migrations, LocalRecordRepository, TaskQueueRepository,
};

use crate::config::DaemonConfig;

/// Gateway used when no backend is configured. The network stays
/// unreachable so the queue holds tasks instead of calling it.
struct DetachedGateway;

#[async_trait]
impl RemoteGatewayTrait for DetachedGateway {
    async fn push(&self, _record: &SyncRecord) -> thyro_core::Result<()> {
        Err(RemoteError::retryable("no remote backend configured").into())
    }

    async fn pull(
        &self,
        _kind: SyncEntityKind,
        _owner_id: &str,
    ) -> thyro_core::Result<Option<SyncRecord>> {
        Err(RemoteError::retryable("no remote backend configured").into())
    }
}

pub struct ServiceContext {
    pub sync_service: Arc<JourneySyncService>,
    pub card_feed: Arc<CardFeed>,
    poller_task: Option<JoinHandle<()>>,
    rollover_task: JoinHandle<()>,
}

impl ServiceContext {
    pub fn build(config: &DaemonConfig) -> Result<Self> {
        let db_path = init(&config.db_path)?;
        run_migrations(&db_path)?;
        let pool = create_pool(&db_path)?;
        let writer = thyro_storage_sqlite::db::spawn_writer((*pool).clone());

        let local_store = Arc::new(PersistentLocalStore::new(Arc::new(
            LocalRecordRepository::new(pool.clone(), writer.clone()),
        )));
        let queue_repository = Arc::new(TaskQueueRepository::new(pool, writer));

        let (session, gateway, network, poller): (
            Arc<dyn SessionProviderTrait>,
            Arc<dyn RemoteGatewayTrait>,
            NetworkMonitor,
            Option<ReachabilityPoller>,
        ) = match &config.remote {
            Some(remote) => {
                let client = RemoteSyncClient::new(&remote.api_url, &remote.api_key)?;
                let session: Arc<dyn SessionProviderTrait> = Arc::new(
                    AnonymousSessionProvider::new(client.clone(), local_store.clone()),
                );
                let gateway: Arc<dyn RemoteGatewayTrait> =
                    Arc::new(RemoteSyncGateway::new(client.clone(), session.clone()));
                let network = NetworkMonitor::new(false);
                let poller = ReachabilityPoller::new(client, network.clone(), config.poller);
                info!("Remote sync enabled against {}", remote.api_url);
                (session, gateway, network, Some(poller))
            }
            None => {
                info!("No remote backend configured; running offline");
                let session: Arc<dyn SessionProviderTrait> =
                    Arc::new(LocalSessionProvider::new(local_store.clone()));
                let gateway: Arc<dyn RemoteGatewayTrait> = Arc::new(DetachedGateway);
                (session, gateway, NetworkMonitor::new(false), None)
            }
        };

        let queue = OfflineTaskQueue::new(
            queue_repository,
            gateway.clone(),
            network.clone(),
            Arc::new(LogFailureSink),
            config.retry.clone(),
        );
        let profiles = ReactiveEntityStore::<Profile>::new(
            config.store.clone(),
            local_store.clone(),
            gateway.clone(),
            queue.clone(),
        );
        let configs = ReactiveEntityStore::<Config>::new(
            config.store.clone(),
            local_store.clone(),
            gateway,
            queue.clone(),
        );

        let day_boundary: Arc<dyn DayBoundary> = Arc::new(LocalDayBoundary);
        let activity_log = Arc::new(ActivityLog::new(local_store.clone(), day_boundary.clone()));
        let appointments = Arc::new(AppointmentBook::new(local_store, day_boundary));
        let card_feed = CardFeed::attach(&profiles, &configs, &activity_log);
        let rollover_task = activity_log.spawn_day_rollover();

        let sync_service = Arc::new(JourneySyncService::new(
            profiles,
            configs,
            queue,
            session,
            activity_log,
            appointments,
        ));

        Ok(Self {
            sync_service,
            card_feed,
            poller_task: poller.map(ReachabilityPoller::spawn),
            rollover_task,
        })
    }

    /// Start the queue's reachability listener.
    pub fn start(&self) {
        self.sync_service.queue().start();
    }

    pub async fn shutdown(mut self) {
        if let Some(task) = self.poller_task.take() {
            task.abort();
        }
        self.rollover_task.abort();
        self.card_feed.detach();
        self.sync_service.shutdown().await;
    }
}
