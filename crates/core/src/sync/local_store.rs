//! Whole-record local persistence with absorb-and-log failure semantics.

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use super::sync_model::RecordKey;
use super::sync_traits::LocalRecordRepositoryTrait;

/// Typed facade over the record repository.
///
/// Nothing here returns an error: a failed save is logged and dropped, and a
/// record that is missing or fails to decode both load as `None`.
pub struct PersistentLocalStore {
    repository: Arc<dyn LocalRecordRepositoryTrait>,
}

impl PersistentLocalStore {
    pub fn new(repository: Arc<dyn LocalRecordRepositoryTrait>) -> Self {
        Self { repository }
    }

    /// Serialize `value` and overwrite the record under `key`.
    pub async fn save<T: Serialize>(&self, key: RecordKey, value: &T) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(
                    "[LocalStore] Failed to serialize record '{}': {}",
                    key.as_str(),
                    err
                );
                return;
            }
        };

        match self.repository.save_record(key.as_str(), payload).await {
            Ok(()) => debug!("[LocalStore] Saved record '{}'", key.as_str()),
            Err(err) => warn!(
                "[LocalStore] Failed to save record '{}': {}",
                key.as_str(),
                err
            ),
        }
    }

    pub fn load<T: DeserializeOwned>(&self, key: RecordKey) -> Option<T> {
        let payload = match self.repository.load_record(key.as_str()) {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(err) => {
                warn!(
                    "[LocalStore] Failed to read record '{}': {}",
                    key.as_str(),
                    err
                );
                return None;
            }
        };

        match serde_json::from_str(&payload) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    "[LocalStore] Discarding undecodable record '{}': {}",
                    key.as_str(),
                    err
                );
                None
            }
        }
    }

    pub async fn delete(&self, key: RecordKey) {
        if let Err(err) = self.repository.delete_record(key.as_str()).await {
            warn!(
                "[LocalStore] Failed to delete record '{}': {}",
                key.as_str(),
                err
            );
        }
    }
}
