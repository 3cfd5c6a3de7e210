use serde::{Deserialize, Serialize};

use crate::sync::{SyncEntity, SyncEntityKind, SyncRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Condition {
    Hypo,
    Cancer,
    Hyper,
}

/// Treatment stage. Listed in the usual clinical order, but rules only ever
/// compare stages for equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    /// Newly diagnosed.
    Dx,
    MedTitration,
    PreSurgery,
    PostSurgeryNoMeds,
    PostSurgeryOnMeds,
    RaiPrep,
    RaiIsolation,
    Surveillance,
}

/// The user's health profile. One live profile per owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "user_id")]
    pub owner_id: String,
    pub condition: Condition,
    pub stage: Stage,
    pub on_medication: bool,
    pub on_lid: bool,
}

impl Profile {
    pub fn new(owner_id: impl Into<String>, condition: Condition, stage: Stage) -> Self {
        Self {
            owner_id: owner_id.into(),
            condition,
            stage,
            on_medication: false,
            on_lid: false,
        }
    }
}

/// Field-level delta for [`Profile`]. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub condition: Option<Condition>,
    pub stage: Option<Stage>,
    pub on_medication: Option<bool>,
    pub on_lid: Option<bool>,
}

impl ProfilePatch {
    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn on_medication(mut self, on_medication: bool) -> Self {
        self.on_medication = Some(on_medication);
        self
    }

    pub fn on_lid(mut self, on_lid: bool) -> Self {
        self.on_lid = Some(on_lid);
        self
    }
}

impl SyncEntity for Profile {
    type Patch = ProfilePatch;

    const KIND: SyncEntityKind = SyncEntityKind::Profile;

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn apply_patch(&self, patch: &ProfilePatch) -> Self {
        Self {
            owner_id: self.owner_id.clone(),
            condition: patch.condition.unwrap_or(self.condition),
            stage: patch.stage.unwrap_or(self.stage),
            on_medication: patch.on_medication.unwrap_or(self.on_medication),
            on_lid: patch.on_lid.unwrap_or(self.on_lid),
        }
    }

    fn into_record(self) -> SyncRecord {
        SyncRecord::Profile(self)
    }

    fn from_record(record: SyncRecord) -> Option<Self> {
        match record {
            SyncRecord::Profile(profile) => Some(profile),
            _ => None,
        }
    }
}
