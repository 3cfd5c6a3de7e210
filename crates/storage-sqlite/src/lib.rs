//! SQLite persistence for the local record store and the offline task queue.

pub mod db;
pub mod errors;
pub mod records;
pub mod schema;
pub mod task_queue;

pub use db::{create_pool, get_connection, init, run_migrations, DbPool, WriteHandle};
pub use errors::StorageError;
pub use records::LocalRecordRepository;
pub use task_queue::TaskQueueRepository;
