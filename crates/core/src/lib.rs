//! Local-first core for the thyroid journey companion.
//!
//! Holds the domain records (journey profile, feature preferences), the
//! pure card derivation rules, and the synchronisation machinery that keeps
//! those records consistent between memory, the local database and the
//! remote backend.

pub mod activity;
pub mod cards;
pub mod errors;
pub mod journey;
pub mod preferences;
pub mod sync;

pub use errors::{DatabaseError, Error, RemoteError, Result};
