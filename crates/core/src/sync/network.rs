//! Edge-triggered network reachability signal.

use log::debug;
use std::sync::Arc;
use tokio::sync::watch;

/// Shared reachability flag. Subscribers only wake on actual transitions.
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    tx: Arc<watch::Sender<bool>>,
}

impl NetworkMonitor {
    pub fn new(initially_reachable: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_reachable);
        Self { tx: Arc::new(tx) }
    }

    /// Publish the current reachability. Returns true when this was a transition.
    pub fn set_reachable(&self, reachable: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == reachable {
                return false;
            }
            *current = reachable;
            true
        });
        if changed {
            debug!("[Reachability] Network is now {}", describe(reachable));
        }
        changed
    }

    pub fn is_reachable(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

fn describe(reachable: bool) -> &'static str {
    if reachable {
        "reachable"
    } else {
        "unreachable"
    }
}
