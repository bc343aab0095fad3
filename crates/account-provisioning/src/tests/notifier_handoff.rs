//! A freshly provisioned account drives the notifier's routing.

use super::harness::*;
use chrono::Duration;
use outbox_notifier::{
    Message, MemoryQueueBackend, Notification, NotifyConfig, OutboxNotifier, QueueKind,
};
use std::sync::Arc;

#[tokio::test]
async fn test_backlog_and_new_mail_route_by_account_creation() {
    let h = TestHarness::new();
    let outcome = h
        .service
        .resolve_or_create_account(&identity(IMAP), &password())
        .await
        .unwrap();
    let crate::service::ProvisionOutcome::Created { account, namespace } = outcome else {
        panic!("expected a new account");
    };

    let backend = Arc::new(MemoryQueueBackend::new());
    let notifier = OutboxNotifier::new(
        &NotifyConfig::new("127.0.0.1", 0),
        backend.clone(),
        h.directory.clone(),
    );

    let backlog = Message {
        public_id: "old".to_string(),
        namespace_id: namespace.id,
        received_at: account.created_at - Duration::days(30),
    };
    let fresh = Message {
        public_id: "new".to_string(),
        namespace_id: namespace.id,
        received_at: account.created_at + Duration::seconds(1),
    };

    let Notification::Enqueued(old) = notifier.notify_message_created(&backlog).await.unwrap()
    else {
        panic!("backlog message was skipped");
    };
    let Notification::Enqueued(new) = notifier.notify_message_created(&fresh).await.unwrap()
    else {
        panic!("new message was skipped");
    };

    assert_eq!(old.queue, QueueKind::LowPriority);
    assert_eq!(new.queue, QueueKind::Default);
    assert_eq!(old.job.namespace_public_id(), namespace.public_id);
    assert_eq!(backend.list_len("resque:queue:nylas_low"), 1);
    assert_eq!(backend.list_len("resque:queue:nylas_default"), 1);
}
