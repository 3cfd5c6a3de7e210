//! Whole-record blobs keyed by record kind.

mod model;
mod repository;

pub use model::LocalRecordDB;
pub use repository::LocalRecordRepository;
