//! Runtime configuration read from the environment (and `.env`).

use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

use thyro_core::sync::{RetryPolicy, StoreConfig};
use thyro_remote_sync::PollConfig;

pub const ENV_API_URL: &str = "THYRO_API_URL";
pub const ENV_API_KEY: &str = "THYRO_API_KEY";
pub const ENV_DB_PATH: &str = "THYRO_DB_PATH";
pub const ENV_SETTLE_MS: &str = "THYRO_SETTLE_MS";
pub const ENV_POLL_INTERVAL_SECS: &str = "THYRO_POLL_INTERVAL_SECS";
pub const ENV_TASK_MAX_ATTEMPTS: &str = "THYRO_TASK_MAX_ATTEMPTS";
pub const ENV_LOG_LEVEL: &str = "THYRO_LOG";

const DEFAULT_DB_PATH: &str = "thyro.db";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Backend project URL plus its publishable key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub api_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DaemonConfig {
    /// `None` runs fully offline with a device-local owner id.
    pub remote: Option<RemoteConfig>,
    pub db_path: String,
    pub log_level: String,
    pub store: StoreConfig,
    pub poller: PollConfig,
    pub retry: RetryPolicy,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let remote = match (non_empty(ENV_API_URL), non_empty(ENV_API_KEY)) {
            (Some(api_url), Some(api_key)) => Some(RemoteConfig { api_url, api_key }),
            (None, None) => None,
            (Some(_), None) => {
                anyhow::bail!("{} is set but {} is missing", ENV_API_URL, ENV_API_KEY)
            }
            (None, Some(_)) => {
                anyhow::bail!("{} is set but {} is missing", ENV_API_KEY, ENV_API_URL)
            }
        };

        let mut store = StoreConfig::default();
        if let Some(ms) = parse::<u64>(&non_empty, ENV_SETTLE_MS)? {
            store.settle_window = Duration::from_millis(ms);
        }

        let mut poller = PollConfig::default();
        if let Some(secs) = parse::<u64>(&non_empty, ENV_POLL_INTERVAL_SECS)? {
            anyhow::ensure!(secs > 0, "{} must be at least 1", ENV_POLL_INTERVAL_SECS);
            poller.interval = Duration::from_secs(secs);
        }

        let mut retry = RetryPolicy::default();
        if let Some(attempts) = parse::<u32>(&non_empty, ENV_TASK_MAX_ATTEMPTS)? {
            anyhow::ensure!(attempts > 0, "{} must be at least 1", ENV_TASK_MAX_ATTEMPTS);
            retry.max_attempts = attempts;
        }

        Ok(Self {
            remote,
            db_path: non_empty(ENV_DB_PATH).unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            log_level: non_empty(ENV_LOG_LEVEL).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            store,
            poller,
            retry,
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("Invalid value for {}: {:?}", key, raw))
        })
        .transpose()
}
