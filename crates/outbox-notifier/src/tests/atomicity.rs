//! Registry add and list push are committed together or not at all.

use super::harness::{at, TestHarness};
use crate::backend::Fault;
use crate::error::{DeliveryError, NotifyError};

#[tokio::test]
async fn successful_push_registers_queue_and_appends_job() {
    let h = TestHarness::message_created();
    h.add_namespace(1, "ns_1");
    let message = h.commit_message(1, "msg_1", at(20, 0));

    h.notifier.notify_message_created(&message).await.unwrap();

    assert!(h.registry().contains("nylas_default"));
    assert_eq!(h.default_jobs().len(), 1);
}

#[tokio::test]
async fn failure_between_commands_leaves_no_partial_state() {
    let h = TestHarness::message_created();
    h.add_namespace(1, "ns_1");
    let message = h.commit_message(1, "msg_1", at(20, 0));
    h.backend.inject_fault(Fault::AbortBetweenCommands);

    let err = h.notifier.notify_message_created(&message).await.unwrap_err();

    assert!(matches!(
        err,
        NotifyError::Delivery(DeliveryError::Unavailable(_))
    ));
    assert!(h.registry().is_empty(), "registry must not change without the push");
    assert!(h.default_jobs().is_empty());
    assert!(h.low_jobs().is_empty());
}

#[tokio::test]
async fn retry_after_abort_produces_exactly_one_job() {
    let h = TestHarness::message_created();
    h.add_namespace(1, "ns_1");
    let message = h.commit_message(1, "msg_1", at(20, 0));
    h.backend.inject_fault(Fault::AbortBetweenCommands);

    assert!(h.notifier.notify_message_created(&message).await.is_err());
    h.notifier.notify_message_created(&message).await.unwrap();

    assert_eq!(h.default_jobs().len(), 1);
    assert_eq!(h.registry().len(), 1);
}

#[tokio::test]
async fn repeated_registration_is_harmless() {
    let h = TestHarness::message_created();
    h.add_namespace(1, "ns_1");

    for i in 0..5 {
        let message = h.commit_message(1, &format!("msg_{}", i), at(20, i));
        h.notifier.notify_message_created(&message).await.unwrap();
    }

    assert_eq!(h.registry().len(), 1);
    assert_eq!(h.default_jobs().len(), 5);
}
