//! Queued task descriptors and retry policy for the offline queue.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::sync_model::{SyncEntityKind, SyncRecord};
use crate::journey::Profile;
use crate::preferences::Config;

/// Retry policy classification for remote failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRetryClass {
    Retryable,
    Permanent,
    ReauthRequired,
}

impl SyncRetryClass {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Retryable => "retryable",
            Self::Permanent => "permanent",
            Self::ReauthRequired => "reauth_required",
        }
    }
}

/// Classify HTTP status into retry behavior.
pub fn classify_http_status(status: u16) -> SyncRetryClass {
    match status {
        401 | 403 => SyncRetryClass::ReauthRequired,
        408 | 409 | 423 | 425 | 429 => SyncRetryClass::Retryable,
        500..=599 => SyncRetryClass::Retryable,
        _ => SyncRetryClass::Permanent,
    }
}

/// A pending remote write, stored as data so it survives restarts.
///
/// New entity kinds add a variant here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum SyncTask {
    PushProfile(Profile),
    PushConfig(Config),
}

impl SyncTask {
    pub fn push(record: SyncRecord) -> Self {
        match record {
            SyncRecord::Profile(profile) => Self::PushProfile(profile),
            SyncRecord::Config(config) => Self::PushConfig(config),
        }
    }

    pub fn kind_code(&self) -> &'static str {
        match self {
            Self::PushProfile(_) => "push_profile",
            Self::PushConfig(_) => "push_config",
        }
    }

    /// Entity kind the task writes.
    pub fn kind(&self) -> SyncEntityKind {
        match self {
            Self::PushProfile(_) => SyncEntityKind::Profile,
            Self::PushConfig(_) => SyncEntityKind::Config,
        }
    }

    pub fn owner_id(&self) -> &str {
        match self {
            Self::PushProfile(profile) => &profile.owner_id,
            Self::PushConfig(config) => &config.owner_id,
        }
    }

    /// Record to upsert remotely.
    pub fn record(&self) -> SyncRecord {
        match self {
            Self::PushProfile(profile) => SyncRecord::Profile(profile.clone()),
            Self::PushConfig(config) => SyncRecord::Config(config.clone()),
        }
    }

    /// Two tasks with the same key upsert the same remote row; the later one
    /// carries the newer whole record.
    pub fn supersedes(&self, other: &SyncTask) -> bool {
        self.kind_code() == other.kind_code() && self.owner_id() == other.owner_id()
    }
}

/// A task as held by the queue, with its retry bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedTask {
    pub task_id: String,
    /// Enqueue order; survives restarts.
    pub seq: i64,
    pub task: SyncTask,
    pub attempts: u32,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedTask {
    pub fn new(task: SyncTask, seq: i64) -> Self {
        Self {
            task_id: Uuid::now_v7().to_string(),
            seq,
            task,
            attempts: 0,
            next_attempt_at: None,
            last_error: None,
            enqueued_at: Utc::now(),
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_attempt_at.map_or(true, |at| at <= now)
    }
}

/// Bounded exponential backoff for failed tasks.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Attempts (including the first) before a task is reported as failed.
    pub max_attempts: u32,
    /// Extra random delay as a fraction of the backoff, 0.0 disables jitter.
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(5 * 60),
            max_attempts: 5,
            jitter_ratio: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Backoff before the retry that follows `attempt` failed attempts.
    pub fn backoff(&self, attempt: u32) -> Duration {
        const MAX_EXPONENT: u32 = 16;

        let exp = attempt.saturating_sub(1).min(MAX_EXPONENT);
        let backoff = self
            .base_delay
            .saturating_mul(1_u32 << exp)
            .min(self.max_delay);

        if self.jitter_ratio <= 0.0 {
            return backoff;
        }
        let max_jitter_ms = (backoff.as_millis() as f64 * self.jitter_ratio) as u64;
        let jitter_ms = rand::thread_rng().gen_range(0..=max_jitter_ms.max(1));
        backoff.saturating_add(Duration::from_millis(jitter_ms))
    }

    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}

/// A task the queue gave up on.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFailure {
    pub task: QueuedTask,
    pub class: SyncRetryClass,
    pub error: String,
}

/// Outcome counts of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub succeeded: usize,
    pub retried: usize,
    pub failed: usize,
    pub superseded: usize,
}
