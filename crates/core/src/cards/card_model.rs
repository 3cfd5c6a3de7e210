use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardType {
    SymptomLog,
    MedicationReminder,
    LidCountdown,
    RaiPrecautions,
    TgTrend,
    HeartRateLog,
    Appointments,
}

impl CardType {
    pub const ALL: [CardType; 7] = [
        CardType::SymptomLog,
        CardType::MedicationReminder,
        CardType::LidCountdown,
        CardType::RaiPrecautions,
        CardType::TgTrend,
        CardType::HeartRateLog,
        CardType::Appointments,
    ];

    /// Stable tag, also the serialized form. Used to order cards that have no
    /// fixed slot.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::SymptomLog => "symptomLog",
            Self::MedicationReminder => "medicationReminder",
            Self::LidCountdown => "lidCountdown",
            Self::RaiPrecautions => "raiPrecautions",
            Self::TgTrend => "tgTrend",
            Self::HeartRateLog => "heartRateLog",
            Self::Appointments => "appointments",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDescriptor {
    pub card_type: CardType,
    pub enabled: bool,
    pub position: usize,
}
