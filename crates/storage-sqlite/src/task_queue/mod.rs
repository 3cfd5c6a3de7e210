//! Durable backing for the offline task queue.

mod model;
mod repository;

pub use model::QueuedTaskDB;
pub use repository::TaskQueueRepository;
