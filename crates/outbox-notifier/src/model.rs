//! Records the notifier reads: change events, messages, namespaces, accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entity type tag of a mail message.
pub const MESSAGE_ENTITY: &str = "message";

/// Mutation kind recorded in the transaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Insert,
    Update,
    Delete,
}

/// One committed mutation of the primary store.
///
/// Fields are private; a change event is a point-in-time fact and cannot be
/// altered after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    command: Command,
    entity_type: String,
    entity_public_id: String,
    namespace_id: i64,
    record_id: i64,
}

impl ChangeEvent {
    pub fn new(
        command: Command,
        entity_type: impl Into<String>,
        entity_public_id: impl Into<String>,
        namespace_id: i64,
        record_id: i64,
    ) -> Self {
        Self {
            command,
            entity_type: entity_type.into(),
            entity_public_id: entity_public_id.into(),
            namespace_id,
            record_id,
        }
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn entity_public_id(&self) -> &str {
        &self.entity_public_id
    }

    pub fn namespace_id(&self) -> i64 {
        self.namespace_id
    }

    /// Id of the transaction-log row, for log correlation only.
    pub fn record_id(&self) -> i64 {
        self.record_id
    }

    /// Whether this event is the creation of a message.
    pub fn is_message_created(&self) -> bool {
        self.command == Command::Insert && self.entity_type == MESSAGE_ENTITY
    }
}

/// A stored mail message, as far as routing is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub public_id: String,
    pub namespace_id: i64,
    /// When the message was received by the mailbox.
    pub received_at: DateTime<Utc>,
}

/// A mail account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub public_id: String,
    pub email_address: String,
    /// Provider tag, e.g. "gmail" or "generic".
    pub provider: String,
    /// Routing threshold: mail older than this is backlog.
    pub created_at: DateTime<Utc>,
}

/// Per-account container for mail data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub id: i64,
    pub public_id: String,
    /// Owning account. `None` when the account row cannot be resolved.
    pub account: Option<Account>,
}

/// A write that has been committed and may need a notification.
#[derive(Debug, Clone)]
pub enum CommittedWrite {
    /// Direct hand-off of a freshly created message.
    MessageCreated(Message),
    /// A record read back from the transaction log.
    Transaction(ChangeEvent),
}
