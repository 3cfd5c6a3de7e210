//! Entry points the presentation layer calls.

use log::{info, warn};
use std::sync::Arc;

use super::entity_store::{LoadOutcome, ReactiveEntityStore, SetOutcome};
use super::sync_traits::SessionProviderTrait;
use super::task_queue::OfflineTaskQueue;
use crate::activity::{ActivityLog, AppointmentBook};
use crate::errors::Result;
use crate::journey::{Profile, ProfilePatch};
use crate::preferences::{Config, ConfigPatch};

/// Result of loading both records for one owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerLoad {
    pub profile: LoadOutcome,
    pub config: LoadOutcome,
}

pub struct JourneySyncService {
    profiles: Arc<ReactiveEntityStore<Profile>>,
    configs: Arc<ReactiveEntityStore<Config>>,
    queue: Arc<OfflineTaskQueue>,
    session: Arc<dyn SessionProviderTrait>,
    activity_log: Arc<ActivityLog>,
    appointments: Arc<AppointmentBook>,
}

impl JourneySyncService {
    pub fn new(
        profiles: Arc<ReactiveEntityStore<Profile>>,
        configs: Arc<ReactiveEntityStore<Config>>,
        queue: Arc<OfflineTaskQueue>,
        session: Arc<dyn SessionProviderTrait>,
        activity_log: Arc<ActivityLog>,
        appointments: Arc<AppointmentBook>,
    ) -> Self {
        Self {
            profiles,
            configs,
            queue,
            session,
            activity_log,
            appointments,
        }
    }

    pub fn profiles(&self) -> &Arc<ReactiveEntityStore<Profile>> {
        &self.profiles
    }

    pub fn configs(&self) -> &Arc<ReactiveEntityStore<Config>> {
        &self.configs
    }

    pub fn queue(&self) -> &Arc<OfflineTaskQueue> {
        &self.queue
    }

    pub fn activity_log(&self) -> &Arc<ActivityLog> {
        &self.activity_log
    }

    pub fn appointments(&self) -> &Arc<AppointmentBook> {
        &self.appointments
    }

    pub async fn set_profile(&self, profile: Profile) -> SetOutcome {
        self.profiles.set(profile).await
    }

    pub async fn set_config(&self, config: Config) -> SetOutcome {
        self.configs.set(config).await
    }

    pub async fn patch_profile(&self, patch: &ProfilePatch) -> SetOutcome {
        self.profiles.patch(patch).await
    }

    pub async fn patch_config(&self, patch: &ConfigPatch) -> SetOutcome {
        self.configs.patch(patch).await
    }

    pub async fn clear_profile(&self) {
        self.profiles.clear().await;
    }

    pub async fn clear_config(&self) {
        self.configs.clear().await;
    }

    pub async fn load_for_owner(&self, owner_id: &str) -> OwnerLoad {
        let (profile, config) = tokio::join!(
            self.profiles.load_for_owner(owner_id),
            self.configs.load_for_owner(owner_id)
        );
        OwnerLoad { profile, config }
    }

    /// Establish the session and load both records for its owner.
    pub async fn bootstrap(&self) -> Result<(String, OwnerLoad)> {
        let owner_id = self.session.owner_id().await?;
        let load = self.load_for_owner(&owner_id).await;
        info!(
            "[Session] Bootstrapped owner {} (profile {:?}, config {:?})",
            owner_id, load.profile, load.config
        );
        Ok((owner_id, load))
    }

    /// Forget everything belonging to the current owner on this device and
    /// drop the session. Remote rows are left as they are.
    pub async fn delete_account(&self) -> Result<()> {
        self.profiles.clear().await;
        self.configs.clear().await;
        self.queue.purge().await;
        self.activity_log.clear().await;
        self.appointments.clear().await;
        self.session.reset().await?;
        info!("[Session] Account data deleted");
        Ok(())
    }

    /// Push out pending debounced writes and stop background work.
    pub async fn shutdown(&self) {
        self.profiles.flush().await;
        self.configs.flush().await;
        let pending = self.queue.len().await;
        if pending > 0 {
            warn!(
                "[TaskQueue] Shutting down with {} pending task(s); they will resume on next start",
                pending
            );
        }
        self.queue.shutdown();
    }
}
