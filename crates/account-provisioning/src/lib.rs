//! Account provisioning boundary.
//!
//! Turns an email plus either an OAuth authorization code or raw IMAP/SMTP
//! settings into a persisted account and namespace. Every account created
//! here carries a `created_at` and a stable public id, which the outbox
//! notifier relies on for routing and job payloads.
//!
//! The HTTP surface itself lives elsewhere; [`ApiResponse`] describes the
//! status codes and JSON bodies it returns.

pub mod error;
pub mod provider;
pub mod request;
pub mod response;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use error::{ProvisioningError, ProvisioningResult};
pub use provider::{
    AccountDraft, AuthHandler, AuthMaterial, Credentials, GenericAuthHandler, GmailAuthHandler,
    ImapSmtpSettings, OAuthGrant, OAuthTokenService, Provider, TokenInfo,
};
pub use request::{Identity, ProvisionRequest};
pub use response::{ApiErrorBody, ApiResponse, ErrorType, ProvisionedAccount, ResponseBody};
pub use service::{ProvisionOutcome, ProvisioningService};
pub use store::{AccountStore, DirectoryAccountStore};
