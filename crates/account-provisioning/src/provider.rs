//! Provider handlers.
//!
//! The providers form a closed set. Each one implements the same capability
//! trait and is selected by its provider tag.

use crate::error::{ProvisioningError, ProvisioningResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Supported account providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google mail, authorized through OAuth.
    Gmail,
    /// Any IMAP/SMTP server, authorized with a password.
    Generic,
}

impl Provider {
    pub fn from_tag(tag: &str) -> ProvisioningResult<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "gmail" => Ok(Provider::Gmail),
            "generic" | "custom" | "imap" => Ok(Provider::Generic),
            other => Err(ProvisioningError::Validation(format!(
                "Unknown provider '{}'",
                other
            ))),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Provider::Gmail => "gmail",
            Provider::Generic => "generic",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// IMAP and SMTP connection settings for a password-authorized account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImapSmtpSettings {
    pub imap_host: String,
    pub imap_port: u16,
    pub imap_username: String,
    pub imap_password: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub ssl_required: bool,
}

impl ImapSmtpSettings {
    /// First missing or invalid field, if any.
    pub fn problem(&self) -> Option<&'static str> {
        if self.imap_host.trim().is_empty() {
            return Some("imap_host");
        }
        if self.imap_port == 0 {
            return Some("imap_port");
        }
        if self.imap_username.is_empty() {
            return Some("imap_username");
        }
        if self.imap_password.is_empty() {
            return Some("imap_password");
        }
        if self.smtp_host.trim().is_empty() {
            return Some("smtp_host");
        }
        if self.smtp_port == 0 {
            return Some("smtp_port");
        }
        if self.smtp_username.is_empty() {
            return Some("smtp_username");
        }
        if self.smtp_password.is_empty() {
            return Some("smtp_password");
        }
        None
    }
}

/// Credentials supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Authorization code returned by the OAuth consent screen.
    OAuthCode { code: String },
    /// Raw IMAP/SMTP settings.
    Password(ImapSmtpSettings),
}

impl Credentials {
    /// Provider implied by the credential shape.
    pub fn provider(&self) -> Provider {
        match self {
            Credentials::OAuthCode { .. } => Provider::Gmail,
            Credentials::Password(_) => Provider::Generic,
        }
    }
}

/// Secret material kept for an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMaterial {
    OAuth {
        access_token: String,
        refresh_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
        scope: Option<String>,
    },
    Password(ImapSmtpSettings),
}

/// An account produced by a handler, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDraft {
    pub email_address: String,
    pub provider: Provider,
    pub auth: AuthMaterial,
}

/// Token grant returned by an authorization-code exchange.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OAuthGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Result of validating an access token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenInfo {
    pub email: String,
    #[serde(default)]
    pub scope: Option<String>,
}

/// The OAuth provider's token endpoints. The wire protocol lives elsewhere.
#[async_trait]
pub trait OAuthTokenService: Send + Sync {
    /// Exchange an authorization code for tokens.
    async fn exchange_code(&self, code: &str) -> ProvisioningResult<OAuthGrant>;

    /// Validate an access token and return what it grants.
    async fn validate_token(&self, access_token: &str) -> ProvisioningResult<TokenInfo>;
}

/// Capabilities every provider offers.
#[async_trait]
pub trait AuthHandler: Send + Sync {
    fn provider(&self) -> Provider;

    /// Build a new account from credentials.
    async fn create_account(
        &self,
        email_address: &str,
        credentials: &Credentials,
    ) -> ProvisioningResult<AccountDraft>;

    /// Replace the credentials of an existing account.
    async fn update_account(
        &self,
        draft: AccountDraft,
        credentials: &Credentials,
    ) -> ProvisioningResult<AccountDraft>;

    /// Whether the account is usable as configured.
    async fn verify_account(&self, draft: &AccountDraft) -> ProvisioningResult<bool>;

    /// Validate an access token.
    async fn validate_token(&self, access_token: &str) -> ProvisioningResult<TokenInfo>;
}

/// Gmail: OAuth authorization codes.
pub struct GmailAuthHandler {
    oauth: Arc<dyn OAuthTokenService>,
}

impl GmailAuthHandler {
    pub fn new(oauth: Arc<dyn OAuthTokenService>) -> Self {
        Self { oauth }
    }

    async fn authorize(
        &self,
        email_address: &str,
        credentials: &Credentials,
    ) -> ProvisioningResult<AuthMaterial> {
        let code = match credentials {
            Credentials::OAuthCode { code } => code,
            Credentials::Password(_) => {
                return Err(ProvisioningError::Validation(
                    "Gmail accounts require an authorization_code".to_string(),
                ))
            }
        };

        let grant = self.oauth.exchange_code(code).await?;
        let info = self.oauth.validate_token(&grant.access_token).await?;

        if !info.email.eq_ignore_ascii_case(email_address) {
            warn!(
                requested = %email_address,
                authorized = %info.email,
                "Authorization code belongs to a different mailbox"
            );
            return Err(ProvisioningError::Validation(format!(
                "Authorization was granted for {}, not {}",
                info.email, email_address
            )));
        }

        Ok(AuthMaterial::OAuth {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expires_at: grant
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
            scope: info.scope,
        })
    }
}

#[async_trait]
impl AuthHandler for GmailAuthHandler {
    fn provider(&self) -> Provider {
        Provider::Gmail
    }

    async fn create_account(
        &self,
        email_address: &str,
        credentials: &Credentials,
    ) -> ProvisioningResult<AccountDraft> {
        let auth = self.authorize(email_address, credentials).await?;
        Ok(AccountDraft {
            email_address: email_address.to_string(),
            provider: Provider::Gmail,
            auth,
        })
    }

    async fn update_account(
        &self,
        draft: AccountDraft,
        credentials: &Credentials,
    ) -> ProvisioningResult<AccountDraft> {
        let auth = self.authorize(&draft.email_address, credentials).await?;
        Ok(AccountDraft { auth, ..draft })
    }

    async fn verify_account(&self, draft: &AccountDraft) -> ProvisioningResult<bool> {
        match &draft.auth {
            AuthMaterial::OAuth {
                access_token,
                refresh_token,
                expires_at,
                ..
            } => {
                let unexpired = expires_at.map(|at| at > Utc::now()).unwrap_or(true);
                // Without a refresh token the account dies when the access token expires.
                let ok = !access_token.is_empty() && refresh_token.is_some() && unexpired;
                debug!(email = %draft.email_address, ok, "Verified Gmail account");
                Ok(ok)
            }
            AuthMaterial::Password(_) => Ok(false),
        }
    }

    async fn validate_token(&self, access_token: &str) -> ProvisioningResult<TokenInfo> {
        self.oauth.validate_token(access_token).await
    }
}

/// Generic IMAP/SMTP: password credentials.
#[derive(Debug, Default)]
pub struct GenericAuthHandler;

impl GenericAuthHandler {
    fn settings(credentials: &Credentials) -> ProvisioningResult<ImapSmtpSettings> {
        match credentials {
            Credentials::Password(settings) => match settings.problem() {
                None => Ok(settings.clone()),
                Some(field) => Err(ProvisioningError::Validation(format!(
                    "Missing or invalid {}",
                    field
                ))),
            },
            Credentials::OAuthCode { .. } => Err(ProvisioningError::Validation(
                "IMAP accounts require imap_host and credentials".to_string(),
            )),
        }
    }
}

#[async_trait]
impl AuthHandler for GenericAuthHandler {
    fn provider(&self) -> Provider {
        Provider::Generic
    }

    async fn create_account(
        &self,
        email_address: &str,
        credentials: &Credentials,
    ) -> ProvisioningResult<AccountDraft> {
        Ok(AccountDraft {
            email_address: email_address.to_string(),
            provider: Provider::Generic,
            auth: AuthMaterial::Password(Self::settings(credentials)?),
        })
    }

    async fn update_account(
        &self,
        draft: AccountDraft,
        credentials: &Credentials,
    ) -> ProvisioningResult<AccountDraft> {
        let auth = AuthMaterial::Password(Self::settings(credentials)?);
        Ok(AccountDraft { auth, ..draft })
    }

    async fn verify_account(&self, draft: &AccountDraft) -> ProvisioningResult<bool> {
        match &draft.auth {
            AuthMaterial::Password(settings) => Ok(settings.problem().is_none()),
            AuthMaterial::OAuth { .. } => Ok(false),
        }
    }

    async fn validate_token(&self, _access_token: &str) -> ProvisioningResult<TokenInfo> {
        Err(ProvisioningError::NotSupported(
            "password accounts have no access token".to_string(),
        ))
    }
}
