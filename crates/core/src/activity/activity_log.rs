//! Symptom log kept newest first, with the derived "logged today" flag.

use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

use super::activity_model::SymptomEntry;
use super::day_boundary::DayBoundary;
use crate::sync::{PersistentLocalStore, RecordKey};

/// Longest wait between rollover checks, so wall-clock jumps are picked up.
const ROLLOVER_RECHECK: Duration = Duration::from_secs(3600);
const ROLLOVER_MIN_WAIT: Duration = Duration::from_secs(1);

pub struct ActivityLog {
    local_store: Arc<PersistentLocalStore>,
    day_boundary: Arc<dyn DayBoundary>,
    entries: RwLock<Vec<SymptomEntry>>,
    logged_today: watch::Sender<bool>,
}

impl ActivityLog {
    /// Restore the persisted entries; a missing or unreadable list starts empty.
    pub fn new(local_store: Arc<PersistentLocalStore>, day_boundary: Arc<dyn DayBoundary>) -> Self {
        let mut entries: Vec<SymptomEntry> = local_store
            .load(RecordKey::SymptomEntries)
            .unwrap_or_default();
        sort_newest_first(&mut entries);
        let logged_today = has_entry_today(&entries, day_boundary.as_ref());
        debug!(
            "[ActivityLog] Restored {} entries (logged today: {})",
            entries.len(),
            logged_today
        );

        let (tx, _) = watch::channel(logged_today);
        Self {
            local_store,
            day_boundary,
            entries: RwLock::new(entries),
            logged_today: tx,
        }
    }

    pub async fn add_entry(&self, entry: SymptomEntry) {
        let mut entries = self.entries.write().await;
        entries.push(entry);
        sort_newest_first(&mut entries);
        self.local_store
            .save(RecordKey::SymptomEntries, &*entries)
            .await;
        self.update_logged_today(&entries);
        info!("[ActivityLog] Added entry ({} total)", entries.len());
    }

    /// Entries, newest first.
    pub async fn entries(&self) -> Vec<SymptomEntry> {
        self.entries.read().await.clone()
    }

    pub fn logged_today(&self) -> bool {
        *self.logged_today.borrow()
    }

    pub fn watch_logged_today(&self) -> watch::Receiver<bool> {
        self.logged_today.subscribe()
    }

    /// Re-evaluate the flag against the current day, e.g. after midnight.
    pub async fn refresh_today(&self) -> bool {
        let entries = self.entries.read().await;
        self.update_logged_today(&entries);
        self.logged_today()
    }

    /// Keep the flag current across midnight: wake at the next day start
    /// (or the recheck ceiling, whichever is sooner) and refresh.
    pub fn spawn_day_rollover(self: &Arc<Self>) -> JoinHandle<()> {
        let log = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let wait = log.until_next_check();
                debug!("[ActivityLog] Next day rollover check in {:?}", wait);
                tokio::time::sleep(wait).await;
                log.refresh_today().await;
            }
        })
    }

    fn until_next_check(&self) -> Duration {
        let now = self.day_boundary.now();
        self.day_boundary
            .next_day_start(now)
            .and_then(|next| (next - now).to_std().ok())
            .map_or(ROLLOVER_RECHECK, |until| until.min(ROLLOVER_RECHECK))
            .max(ROLLOVER_MIN_WAIT)
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
        self.local_store.delete(RecordKey::SymptomEntries).await;
        self.update_logged_today(&entries);
        info!("[ActivityLog] Cleared all entries");
    }

    fn update_logged_today(&self, entries: &[SymptomEntry]) {
        let logged = has_entry_today(entries, self.day_boundary.as_ref());
        if self.logged_today.send_if_modified(|current| {
            let changed = *current != logged;
            *current = logged;
            changed
        }) {
            debug!("[ActivityLog] Logged today is now {}", logged);
        }
    }
}

fn sort_newest_first(entries: &mut [SymptomEntry]) {
    entries.sort_by(|a, b| b.date.cmp(&a.date));
}

fn has_entry_today(entries: &[SymptomEntry], day_boundary: &dyn DayBoundary) -> bool {
    entries.iter().any(|entry| day_boundary.is_today(entry.date))
}
