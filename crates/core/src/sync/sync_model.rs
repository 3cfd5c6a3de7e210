//! Entity kinds, record keys and the contract every synced entity implements.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::journey::Profile;
use crate::preferences::Config;

/// Fixed keys of the local record store. One whole-record blob per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Profile,
    Config,
    Session,
    SymptomEntries,
    Appointments,
}

impl RecordKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Config => "config",
            Self::Session => "session",
            Self::SymptomEntries => "symptom_entries",
            Self::Appointments => "appointments",
        }
    }
}

/// Entity kinds that are mirrored to the remote backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEntityKind {
    Profile,
    Config,
}

impl SyncEntityKind {
    pub fn record_key(&self) -> RecordKey {
        match self {
            Self::Profile => RecordKey::Profile,
            Self::Config => RecordKey::Config,
        }
    }

    /// Remote table holding this kind, keyed by `user_id`.
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Profile => "journey_profiles",
            Self::Config => "user_configs",
        }
    }

    /// Tag used in log lines.
    pub fn log_tag(&self) -> &'static str {
        match self {
            Self::Profile => "[ProfileStore]",
            Self::Config => "[ConfigStore]",
        }
    }
}

/// A whole record of any synced kind, as it travels to and from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum SyncRecord {
    Profile(Profile),
    Config(Config),
}

impl SyncRecord {
    pub fn kind(&self) -> SyncEntityKind {
        match self {
            Self::Profile(_) => SyncEntityKind::Profile,
            Self::Config(_) => SyncEntityKind::Config,
        }
    }

    pub fn owner_id(&self) -> &str {
        match self {
            Self::Profile(profile) => &profile.owner_id,
            Self::Config(config) => &config.owner_id,
        }
    }

    /// The record as a bare backend row (no kind tag).
    pub fn to_row(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Self::Profile(profile) => serde_json::to_value(profile),
            Self::Config(config) => serde_json::to_value(config),
        }
    }

    /// Decode a bare backend row of the given kind.
    pub fn from_row(kind: SyncEntityKind, row: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match kind {
            SyncEntityKind::Profile => Self::Profile(serde_json::from_value(row)?),
            SyncEntityKind::Config => Self::Config(serde_json::from_value(row)?),
        })
    }
}

/// Contract for an owner-scoped entity managed by a reactive store.
pub trait SyncEntity:
    Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Per-field delta applied through the store's `patch`.
    type Patch: Debug + Send + Sync;

    const KIND: SyncEntityKind;

    fn owner_id(&self) -> &str;

    fn apply_patch(&self, patch: &Self::Patch) -> Self;

    fn into_record(self) -> SyncRecord;

    fn from_record(record: SyncRecord) -> Option<Self>;
}
