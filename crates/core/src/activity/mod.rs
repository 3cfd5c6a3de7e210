//! Auxiliary per-device lists (symptom log, appointments) and the
//! "logged today" signal that feeds card ordering.

mod activity_log;
mod activity_model;
mod appointment_book;
mod day_boundary;

pub use activity_log::*;
pub use activity_model::*;
pub use appointment_book::*;
pub use day_boundary::*;
