//! Provisioning error types.

use outbox_notifier::DirectoryError;
use thiserror::Error;

/// Provisioning error type.
#[derive(Error, Debug)]
pub enum ProvisioningError {
    /// Malformed or missing caller input. Never retried automatically.
    #[error("{0}")]
    Validation(String),

    /// No account exists for the given email address
    #[error("No account exists for {0}")]
    AccountNotFound(String),

    /// Credentials were accepted syntactically but the account does not work
    #[error("Account verification failed: {0}")]
    VerificationFailed(String),

    /// The OAuth provider returned an error
    #[error("Internal error: {0}")]
    Upstream(String),

    /// The provider does not support the requested capability
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// Account store error
    #[error("Store error: {0}")]
    Store(#[from] DirectoryError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for provisioning operations.
pub type ProvisioningResult<T> = Result<T, ProvisioningError>;
