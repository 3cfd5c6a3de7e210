use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One symptom check-in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymptomEntry {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    /// Self-reported mood, 1 (worst) to 5 (best).
    pub mood_score: u8,
    pub selected_symptoms: Vec<String>,
    pub notes: Option<String>,
}

impl SymptomEntry {
    pub fn new(date: DateTime<Utc>, mood_score: u8, selected_symptoms: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            mood_score,
            selected_symptoms,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentKind {
    #[default]
    #[serde(rename = "Doctor Visit")]
    DoctorVisit,
    #[serde(rename = "Blood Test")]
    BloodTest,
    #[serde(rename = "Imaging/Scan")]
    ImagingScan,
    Procedure,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub title: String,
    pub doctor_name: Option<String>,
    pub location: Option<String>,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: AppointmentKind,
}

impl Appointment {
    pub fn new(title: impl Into<String>, date: DateTime<Utc>, kind: AppointmentKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            doctor_name: None,
            location: None,
            date,
            notes: None,
            kind,
        }
    }
}
