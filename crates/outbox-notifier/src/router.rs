//! Queue routing: live mail goes to the default queue, backlog to low priority.

use crate::config::NotifyConfig;
use crate::model::Account;
use chrono::{DateTime, Utc};
use std::fmt;

/// Destination class of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    Default,
    LowPriority,
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueKind::Default => write!(f, "default"),
            QueueKind::LowPriority => write!(f, "low_priority"),
        }
    }
}

/// Chooses a queue for a message and maps queue kinds to backend keys.
#[derive(Debug, Clone)]
pub struct QueueRouter {
    default_queue: String,
    low_priority_queue: String,
}

impl QueueRouter {
    pub fn new(default_queue: impl Into<String>, low_priority_queue: impl Into<String>) -> Self {
        Self {
            default_queue: default_queue.into(),
            low_priority_queue: low_priority_queue.into(),
        }
    }

    pub fn from_config(config: &NotifyConfig) -> Self {
        Self::new(&config.default_queue, &config.low_priority_queue)
    }

    /// Route an entity by its timestamp.
    ///
    /// Unresolved entity or account routes to default. An entity strictly
    /// older than the account is backlog; ties are live mail.
    pub fn route(&self, entity_time: Option<DateTime<Utc>>, account: Option<&Account>) -> QueueKind {
        match (entity_time, account) {
            (Some(at), Some(account)) if at < account.created_at => QueueKind::LowPriority,
            _ => QueueKind::Default,
        }
    }

    /// Backend queue name for a kind.
    pub fn queue_name(&self, kind: QueueKind) -> &str {
        match kind {
            QueueKind::Default => &self.default_queue,
            QueueKind::LowPriority => &self.low_priority_queue,
        }
    }

    /// Every queue name this router can produce.
    pub fn queue_names(&self) -> [&str; 2] {
        [&self.default_queue, &self.low_priority_queue]
    }
}
