//! Local-first synchronisation: reactive stores, durable offline queue,
//! local persistence facade and the ports the storage/remote crates implement.

mod entity_store;
mod local_session;
mod local_store;
mod network;
mod sync_model;
mod sync_service;
mod sync_task;
mod sync_traits;
mod task_queue;

#[cfg(test)]
pub(crate) mod test_support;

pub use entity_store::*;
pub use local_session::*;
pub use local_store::*;
pub use network::*;
pub use sync_model::*;
pub use sync_service::*;
pub use sync_task::*;
pub use sync_traits::*;
pub use task_queue::*;
