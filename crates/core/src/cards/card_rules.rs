//! Pure card rules.

use super::card_model::{CardDescriptor, CardType};
use crate::journey::{Condition, Profile, Stage};
use crate::preferences::Config;

/// Cards enabled for this profile and configuration, in [`CardType::ALL`]
/// order.
pub fn enabled_cards(profile: &Profile, config: &Config) -> Vec<CardType> {
    CardType::ALL
        .into_iter()
        .filter(|card| is_enabled(*card, profile, config))
        .collect()
}

fn is_enabled(card: CardType, profile: &Profile, config: &Config) -> bool {
    match card {
        CardType::SymptomLog => config.log_symptoms,
        CardType::MedicationReminder => profile.on_medication,
        CardType::LidCountdown => profile.stage == Stage::RaiPrep,
        CardType::RaiPrecautions => {
            matches!(profile.stage, Stage::RaiPrep | Stage::RaiIsolation)
        }
        CardType::TgTrend => {
            profile.condition == Condition::Cancer && profile.stage == Stage::Surveillance
        }
        CardType::HeartRateLog => profile.condition == Condition::Hyper,
        CardType::Appointments => config.track_appointments,
    }
}

/// Display order for the enabled cards.
///
/// An unlogged symptom check-in leads, then the RAI preparation cards, then
/// everything else by tag. A symptom log already filled in today goes last.
pub fn order_cards(enabled: &[CardType], profile: &Profile, logged_today: bool) -> Vec<CardType> {
    let has = |card: CardType| enabled.contains(&card);
    let mut ordered = Vec::with_capacity(enabled.len());

    if has(CardType::SymptomLog) && !logged_today {
        ordered.push(CardType::SymptomLog);
    }
    if has(CardType::LidCountdown) && profile.stage == Stage::RaiPrep {
        ordered.push(CardType::LidCountdown);
    }
    if has(CardType::RaiPrecautions) {
        ordered.push(CardType::RaiPrecautions);
    }

    let mut rest: Vec<CardType> = enabled
        .iter()
        .copied()
        .filter(|card| *card != CardType::SymptomLog && !ordered.contains(card))
        .collect();
    rest.sort_by_key(|card| card.tag());
    rest.dedup();
    ordered.extend(rest);

    if has(CardType::SymptomLog) && logged_today {
        ordered.push(CardType::SymptomLog);
    }
    ordered
}

pub fn derive_cards(profile: &Profile, config: &Config, logged_today: bool) -> Vec<CardDescriptor> {
    let enabled = enabled_cards(profile, config);
    order_cards(&enabled, profile, logged_today)
        .into_iter()
        .enumerate()
        .map(|(position, card_type)| CardDescriptor {
            card_type,
            enabled: true,
            position,
        })
        .collect()
}
