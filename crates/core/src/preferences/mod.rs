//! Feature preferences chosen during onboarding and in settings.

mod preferences_model;

pub use preferences_model::*;
