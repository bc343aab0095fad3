//! Error types for the outbox notifier.

use std::time::Duration;
use thiserror::Error;

/// Failure to hand a job to the queue backend.
///
/// Always propagated to the caller: a swallowed delivery error means the
/// message is never processed downstream.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// Redis connection or command error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// No pooled connection became available in time
    #[error("Connection pool exhausted, no connection available after {0:?}")]
    PoolExhausted(Duration),

    /// The pipelined push did not complete in time. The backend may still
    /// have applied it.
    #[error("Queue backend did not answer within {0:?}, push outcome unknown")]
    Timeout(Duration),

    /// Backend refused or could not be reached
    #[error("Queue backend unavailable: {0}")]
    Unavailable(String),
}

impl DeliveryError {
    /// Whether the push may have been applied despite the error.
    ///
    /// Retrying after an ambiguous failure can enqueue the job twice.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, DeliveryError::Timeout(_))
    }
}

/// Failure of a directory (namespace / account / message) lookup.
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// Underlying store could not answer
    #[error("Directory unavailable: {0}")]
    Unavailable(String),

    /// A record with the same identity already exists
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// The record to update does not exist
    #[error("Record not found: {0}")]
    NotFound(String),
}

/// Outbox notifier error type.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Job could not be delivered to the queue backend
    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    /// Directory lookup failed
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// The namespace owning the change is unknown, so the job has no
    /// namespace public id to carry
    #[error("Namespace not found: {0}")]
    NamespaceNotFound(i64),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (config file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NotifyError {
    /// Returns the delivery error if this failure happened at the backend.
    pub fn as_delivery(&self) -> Option<&DeliveryError> {
        match self {
            NotifyError::Delivery(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for notifier operations.
pub type NotifyResult<T> = Result<T, NotifyError>;
