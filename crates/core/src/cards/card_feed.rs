//! Live card list recomputed whenever one of its inputs changes.

use log::debug;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::card_model::CardDescriptor;
use super::card_rules::derive_cards;
use crate::activity::ActivityLog;
use crate::journey::Profile;
use crate::preferences::Config;
use crate::sync::{ReactiveEntityStore, StoreChange, SubscriptionId};

#[derive(Default)]
struct CardInputs {
    profile: Option<Profile>,
    config: Option<Config>,
    logged_today: bool,
}

struct Attachment {
    profiles: Weak<ReactiveEntityStore<Profile>>,
    configs: Weak<ReactiveEntityStore<Config>>,
    profile_subscription: SubscriptionId,
    config_subscription: SubscriptionId,
    activity_task: JoinHandle<()>,
}

/// Publishes the ordered card list. Empty until both a profile and a config
/// are present.
pub struct CardFeed {
    inputs: Mutex<CardInputs>,
    cards: watch::Sender<Vec<CardDescriptor>>,
    attachment: Mutex<Option<Attachment>>,
}

impl CardFeed {
    pub fn new() -> Self {
        let (cards, _) = watch::channel(Vec::new());
        Self {
            inputs: Mutex::new(CardInputs::default()),
            cards,
            attachment: Mutex::new(None),
        }
    }

    /// Build a feed seeded from the stores' current values and keep it in
    /// step with them and with the activity log.
    pub fn attach(
        profiles: &Arc<ReactiveEntityStore<Profile>>,
        configs: &Arc<ReactiveEntityStore<Config>>,
        activity_log: &ActivityLog,
    ) -> Arc<Self> {
        let feed = Arc::new(Self::new());
        {
            let mut inputs = feed.lock_inputs();
            inputs.profile = profiles.current().value().cloned();
            inputs.config = configs.current().value().cloned();
            inputs.logged_today = activity_log.logged_today();
        }
        feed.recompute();

        let weak = Arc::downgrade(&feed);
        let profile_subscription = profiles.subscribe(move |change: &StoreChange<Profile>| {
            if let Some(feed) = weak.upgrade() {
                feed.set_profile(change.value().cloned());
            }
        });

        let weak = Arc::downgrade(&feed);
        let config_subscription = configs.subscribe(move |change: &StoreChange<Config>| {
            if let Some(feed) = weak.upgrade() {
                feed.set_config(change.value().cloned());
            }
        });

        let weak = Arc::downgrade(&feed);
        let mut logged_today = activity_log.watch_logged_today();
        let activity_task = tokio::spawn(async move {
            while logged_today.changed().await.is_ok() {
                let value = *logged_today.borrow_and_update();
                let Some(feed) = weak.upgrade() else {
                    break;
                };
                feed.set_logged_today(value);
            }
        });

        *feed
            .attachment
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Attachment {
            profiles: Arc::downgrade(profiles),
            configs: Arc::downgrade(configs),
            profile_subscription,
            config_subscription,
            activity_task,
        });
        feed
    }

    /// Stop following the stores and the activity log.
    pub fn detach(&self) {
        let attachment = self
            .attachment
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(attachment) = attachment else {
            return;
        };
        if let Some(profiles) = attachment.profiles.upgrade() {
            profiles.unsubscribe(attachment.profile_subscription);
        }
        if let Some(configs) = attachment.configs.upgrade() {
            configs.unsubscribe(attachment.config_subscription);
        }
        attachment.activity_task.abort();
    }

    pub fn cards(&self) -> Vec<CardDescriptor> {
        self.cards.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Vec<CardDescriptor>> {
        self.cards.subscribe()
    }

    pub fn set_profile(&self, profile: Option<Profile>) {
        self.lock_inputs().profile = profile;
        self.recompute();
    }

    pub fn set_config(&self, config: Option<Config>) {
        self.lock_inputs().config = config;
        self.recompute();
    }

    pub fn set_logged_today(&self, logged_today: bool) {
        self.lock_inputs().logged_today = logged_today;
        self.recompute();
    }

    fn lock_inputs(&self) -> std::sync::MutexGuard<'_, CardInputs> {
        self.inputs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn recompute(&self) {
        let cards = {
            let inputs = self.lock_inputs();
            match (&inputs.profile, &inputs.config) {
                (Some(profile), Some(config)) => {
                    derive_cards(profile, config, inputs.logged_today)
                }
                _ => Vec::new(),
            }
        };
        let changed = self.cards.send_if_modified(|current| {
            if *current == cards {
                return false;
            }
            *current = cards;
            true
        });
        if changed {
            debug!("[CardFeed] {} card(s) enabled", self.cards.borrow().len());
        }
    }
}

impl Default for CardFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CardFeed {
    fn drop(&mut self) {
        self.detach();
    }
}
