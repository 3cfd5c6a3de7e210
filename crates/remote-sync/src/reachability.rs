//! Periodic health check feeding the shared [`NetworkMonitor`].

use log::{debug, info};
use std::time::Duration;
use tokio::task::JoinHandle;

use thyro_core::sync::NetworkMonitor;

use crate::client::RemoteSyncClient;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Marks the network reachable while the backend's health endpoint answers
/// with success, unreachable otherwise.
pub struct ReachabilityPoller {
    client: RemoteSyncClient,
    monitor: NetworkMonitor,
    config: PollConfig,
}

impl ReachabilityPoller {
    pub fn new(client: RemoteSyncClient, monitor: NetworkMonitor, config: PollConfig) -> Self {
        Self {
            client,
            monitor,
            config,
        }
    }

    /// Check once and publish the result. Returns the observed reachability.
    pub async fn check_once(&self) -> bool {
        let reachable = match self.client.health().await {
            Ok(()) => true,
            Err(e) => {
                debug!("[Reachability] Health check failed: {}", e);
                false
            }
        };
        self.monitor.set_reachable(reachable);
        reachable
    }

    /// Check immediately, then every `interval` until the handle is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        info!(
            "[Reachability] Probing {} every {:?}",
            self.client.base_url(),
            self.config.interval
        );
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.check_once().await;
            }
        })
    }
}
