//! Outbox notifier: turns committed "message created" writes into queued jobs.
//!
//! Called inline by the write path after its transaction commits. For a
//! qualifying write it resolves the owning account, routes, builds the job
//! and performs one atomic registry-add + list-push. Delivery failures are
//! returned to the caller; the committed write is not affected by them.
//!
//! Delivery is at-least-once: a caller that retries after an ambiguous
//! failure (see [`DeliveryError::is_ambiguous`]) may enqueue the same job
//! twice, so job processing must be idempotent.
//!
//! [`DeliveryError::is_ambiguous`]: crate::error::DeliveryError::is_ambiguous

use crate::backend::{QueueBackend, QueueDepth, QueuePush};
use crate::config::{NotifyConfig, TriggerPath};
use crate::directory::Directory;
use crate::error::{NotifyError, NotifyResult};
use crate::job::Job;
use crate::model::{ChangeEvent, CommittedWrite, Message, Namespace};
use crate::router::{QueueKind, QueueRouter};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Why a write produced no job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Not the creation of a message.
    NotMessageCreation,
    /// Arrived through the trigger path that is not configured as canonical.
    NonCanonicalTrigger,
}

/// A job that was pushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub queue: QueueKind,
    pub queue_name: String,
    pub job: Job,
}

/// Outcome of a notify call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Skipped(SkipReason),
    Enqueued(Delivery),
}

impl Notification {
    pub fn delivery(&self) -> Option<&Delivery> {
        match self {
            Notification::Enqueued(delivery) => Some(delivery),
            Notification::Skipped(_) => None,
        }
    }
}

/// The outbox notifier.
pub struct OutboxNotifier {
    backend: Arc<dyn QueueBackend>,
    directory: Arc<dyn Directory>,
    router: QueueRouter,
    registry_key: String,
    queue_key_prefix: String,
    trigger: TriggerPath,
}

impl OutboxNotifier {
    pub fn new(
        config: &NotifyConfig,
        backend: Arc<dyn QueueBackend>,
        directory: Arc<dyn Directory>,
    ) -> Self {
        Self {
            backend,
            directory,
            router: QueueRouter::from_config(config),
            registry_key: config.registry_key.clone(),
            queue_key_prefix: config.queue_key_prefix.clone(),
            trigger: config.trigger,
        }
    }

    pub fn trigger(&self) -> TriggerPath {
        self.trigger
    }

    pub fn router(&self) -> &QueueRouter {
        &self.router
    }

    /// Entry point for the write path, accepting either trigger shape.
    pub async fn on_commit(&self, write: &CommittedWrite) -> NotifyResult<Notification> {
        match write {
            CommittedWrite::MessageCreated(message) => self.notify_message_created(message).await,
            CommittedWrite::Transaction(event) => self.notify_transaction(event).await,
        }
    }

    /// Notify for a message handed over directly by the write path.
    ///
    /// Routing uses the message itself, so no read-back of the row is needed.
    pub async fn notify_message_created(&self, message: &Message) -> NotifyResult<Notification> {
        if self.trigger != TriggerPath::MessageCreated {
            debug!(
                message = %message.public_id,
                "Message trigger is not canonical, skipping"
            );
            return Ok(Notification::Skipped(SkipReason::NonCanonicalTrigger));
        }

        let namespace = self.resolve_namespace(message.namespace_id).await?;
        self.deliver(&namespace, &message.public_id, Some(message.received_at), None)
            .await
    }

    /// Notify for a transaction-log record.
    ///
    /// Only message inserts qualify; anything else returns without touching
    /// the backend.
    pub async fn notify_transaction(&self, event: &ChangeEvent) -> NotifyResult<Notification> {
        if !event.is_message_created() {
            debug!(
                record_id = event.record_id(),
                entity_type = %event.entity_type(),
                command = ?event.command(),
                "Change is not a message creation, skipping"
            );
            return Ok(Notification::Skipped(SkipReason::NotMessageCreation));
        }

        if self.trigger != TriggerPath::TransactionLog {
            debug!(
                record_id = event.record_id(),
                "Transaction-log trigger is not canonical, skipping"
            );
            return Ok(Notification::Skipped(SkipReason::NonCanonicalTrigger));
        }

        let namespace = self.resolve_namespace(event.namespace_id()).await?;

        let received_at = match self
            .directory
            .message(event.namespace_id(), event.entity_public_id())
            .await
        {
            Ok(Some(message)) => Some(message.received_at),
            Ok(None) => {
                warn!(
                    record_id = event.record_id(),
                    message = %event.entity_public_id(),
                    "Message not visible, routing to default queue"
                );
                None
            }
            Err(e) => {
                warn!(
                    record_id = event.record_id(),
                    message = %event.entity_public_id(),
                    error = %e,
                    "Message lookup failed, routing to default queue"
                );
                None
            }
        };

        self.deliver(
            &namespace,
            event.entity_public_id(),
            received_at,
            Some(event.record_id()),
        )
        .await
    }

    /// Registration and length of both configured queues.
    pub async fn queue_depths(&self) -> NotifyResult<Vec<QueueDepth>> {
        let depths = self
            .backend
            .depths(
                &self.registry_key,
                &self.queue_key_prefix,
                &self.router.queue_names(),
            )
            .await?;
        Ok(depths)
    }

    async fn resolve_namespace(&self, namespace_id: i64) -> NotifyResult<Namespace> {
        self.directory
            .namespace(namespace_id)
            .await?
            .ok_or(NotifyError::NamespaceNotFound(namespace_id))
    }

    async fn deliver(
        &self,
        namespace: &Namespace,
        entity_public_id: &str,
        entity_time: Option<DateTime<Utc>>,
        record_id: Option<i64>,
    ) -> NotifyResult<Notification> {
        if namespace.account.is_none() {
            warn!(
                namespace = %namespace.public_id,
                "Owning account not resolvable, routing to default queue"
            );
        }

        let queue = self.router.route(entity_time, namespace.account.as_ref());
        let queue_name = self.router.queue_name(queue).to_string();
        let job = Job::message_created(&namespace.public_id, entity_public_id);

        let push = QueuePush {
            registry_key: self.registry_key.clone(),
            queue_name: queue_name.clone(),
            list_key: format!("{}{}", self.queue_key_prefix, queue_name),
            payload: job.to_json()?,
        };

        if let Err(e) = self.backend.push(&push).await {
            error!(
                queue = %queue_name,
                namespace = %namespace.public_id,
                message = %entity_public_id,
                record_id = ?record_id,
                ambiguous = e.is_ambiguous(),
                error = %e,
                "Failed to enqueue message notification"
            );
            return Err(e.into());
        }

        info!(
            queue = %queue_name,
            priority = %queue,
            namespace = %namespace.public_id,
            message = %entity_public_id,
            record_id = ?record_id,
            "Enqueued message notification"
        );

        Ok(Notification::Enqueued(Delivery {
            queue,
            queue_name,
            job,
        }))
    }
}
