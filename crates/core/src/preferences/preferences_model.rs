use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sync::{SyncEntity, SyncEntityKind, SyncRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    pub dose: f64,
    /// "mcg", "mg", ...
    pub unit: String,
}

/// Which features the user turned on. One live config per owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "user_id")]
    pub owner_id: String,
    pub log_symptoms: bool,
    pub track_appointments: bool,
    pub manage_medications: bool,
    pub next_important_date: Option<DateTime<Utc>>,
    #[serde(rename = "meds", default)]
    pub medications: Vec<Medication>,
}

impl Config {
    /// Onboarding defaults: every optional feature on, nothing scheduled.
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            log_symptoms: true,
            track_appointments: true,
            manage_medications: true,
            next_important_date: None,
            medications: Vec::new(),
        }
    }
}

/// Field-level delta for [`Config`].
///
/// `next_important_date` is doubly optional so a patch can clear the date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigPatch {
    pub log_symptoms: Option<bool>,
    pub track_appointments: Option<bool>,
    pub manage_medications: Option<bool>,
    pub next_important_date: Option<Option<DateTime<Utc>>>,
    pub medications: Option<Vec<Medication>>,
}

impl ConfigPatch {
    pub fn log_symptoms(mut self, enabled: bool) -> Self {
        self.log_symptoms = Some(enabled);
        self
    }

    pub fn track_appointments(mut self, enabled: bool) -> Self {
        self.track_appointments = Some(enabled);
        self
    }

    pub fn manage_medications(mut self, enabled: bool) -> Self {
        self.manage_medications = Some(enabled);
        self
    }

    pub fn next_important_date(mut self, date: Option<DateTime<Utc>>) -> Self {
        self.next_important_date = Some(date);
        self
    }

    pub fn medications(mut self, medications: Vec<Medication>) -> Self {
        self.medications = Some(medications);
        self
    }
}

impl SyncEntity for Config {
    type Patch = ConfigPatch;

    const KIND: SyncEntityKind = SyncEntityKind::Config;

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn apply_patch(&self, patch: &ConfigPatch) -> Self {
        Self {
            owner_id: self.owner_id.clone(),
            log_symptoms: patch.log_symptoms.unwrap_or(self.log_symptoms),
            track_appointments: patch.track_appointments.unwrap_or(self.track_appointments),
            manage_medications: patch.manage_medications.unwrap_or(self.manage_medications),
            next_important_date: patch
                .next_important_date
                .unwrap_or(self.next_important_date),
            medications: patch
                .medications
                .clone()
                .unwrap_or_else(|| self.medications.clone()),
        }
    }

    fn into_record(self) -> SyncRecord {
        SyncRecord::Config(self)
    }

    fn from_record(record: SyncRecord) -> Option<Self> {
        match record {
            SyncRecord::Config(config) => Some(config),
            _ => None,
        }
    }
}
