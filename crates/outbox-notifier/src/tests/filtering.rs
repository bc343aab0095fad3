//! Non-qualifying writes are strict no-ops.

use super::harness::{at, TestHarness};
use crate::model::{ChangeEvent, Command};
use crate::notifier::{Notification, SkipReason};

#[tokio::test]
async fn updates_and_deletes_of_messages_are_skipped() {
    let h = TestHarness::transaction_log();
    h.add_namespace(1, "ns_1");
    h.commit_message(1, "msg_1", at(20, 9));

    for command in [Command::Update, Command::Delete] {
        let event = ChangeEvent::new(command, "message", "msg_1", 1, 7);
        let outcome = h.notifier.notify_transaction(&event).await.unwrap();
        assert_eq!(outcome, Notification::Skipped(SkipReason::NotMessageCreation));
    }

    assert_eq!(h.backend.calls(), 0);
}

#[tokio::test]
async fn inserts_of_other_entities_are_skipped() {
    let h = TestHarness::transaction_log();
    h.add_namespace(1, "ns_1");

    for entity in ["thread", "contact", "event", "account", "Message"] {
        let event = ChangeEvent::new(Command::Insert, entity, "obj_1", 1, 8);
        let outcome = h.notifier.notify_transaction(&event).await.unwrap();
        assert_eq!(outcome, Notification::Skipped(SkipReason::NotMessageCreation));
    }

    assert_eq!(h.backend.calls(), 0);
    assert!(h.registry().is_empty());
}

#[tokio::test]
async fn skipped_events_do_not_need_a_namespace() {
    // Filtering happens before any lookup, so an unknown namespace is fine.
    let h = TestHarness::transaction_log();

    let event = ChangeEvent::new(Command::Delete, "message", "msg_x", 404, 9);
    let outcome = h.notifier.notify_transaction(&event).await.unwrap();

    assert_eq!(outcome, Notification::Skipped(SkipReason::NotMessageCreation));
    assert_eq!(h.backend.calls(), 0);
}

#[tokio::test]
async fn message_insert_reaches_the_backend_once() {
    let h = TestHarness::transaction_log();
    h.add_namespace(1, "ns_1");
    h.commit_message(1, "msg_1", at(20, 9));

    let event = ChangeEvent::new(Command::Insert, "message", "msg_1", 1, 10);
    let outcome = h.notifier.notify_transaction(&event).await.unwrap();

    assert!(outcome.delivery().is_some());
    assert_eq!(h.backend.calls(), 1);
    assert_eq!(h.default_jobs().len(), 1);
}
