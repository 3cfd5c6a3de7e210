//! Journey profile: where the user is in their thyroid treatment.

mod journey_model;

pub use journey_model::*;
