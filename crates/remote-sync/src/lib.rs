//! Remote backend access: REST client, gateway, anonymous session and
//! reachability poller.

pub mod client;
pub mod error;
pub mod gateway;
pub mod reachability;
pub mod session;
pub mod types;

#[cfg(test)]
mod mock_server;

pub use client::RemoteSyncClient;
pub use error::{RemoteSyncError, Result};
pub use gateway::RemoteSyncGateway;
pub use reachability::{PollConfig, ReachabilityPoller};
pub use session::AnonymousSessionProvider;
