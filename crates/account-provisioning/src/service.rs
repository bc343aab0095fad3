//! Account provisioning service.

use crate::error::{ProvisioningError, ProvisioningResult};
use crate::provider::{AccountDraft, AuthHandler, Credentials, GenericAuthHandler, GmailAuthHandler, Provider};
use crate::request::Identity;
use crate::store::AccountStore;
use chrono::Utc;
use outbox_notifier::{Account, DirectoryError, Namespace};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a provisioning call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// A new account and namespace were persisted.
    Created { account: Account, namespace: Namespace },
    /// An account with this email already exists; nothing was changed.
    AlreadyProvisioned {
        account: Account,
        namespace: Option<Namespace>,
    },
}

impl ProvisionOutcome {
    pub fn account(&self) -> &Account {
        match self {
            ProvisionOutcome::Created { account, .. } => account,
            ProvisionOutcome::AlreadyProvisioned { account, .. } => account,
        }
    }
}

/// Creates and maintains accounts.
pub struct ProvisioningService {
    store: Arc<dyn AccountStore>,
    gmail: Arc<dyn AuthHandler>,
    generic: Arc<dyn AuthHandler>,
}

impl ProvisioningService {
    pub fn new(store: Arc<dyn AccountStore>, gmail: GmailAuthHandler) -> Self {
        Self::with_handlers(store, Arc::new(gmail), Arc::new(GenericAuthHandler))
    }

    pub fn with_handlers(
        store: Arc<dyn AccountStore>,
        gmail: Arc<dyn AuthHandler>,
        generic: Arc<dyn AuthHandler>,
    ) -> Self {
        Self {
            store,
            gmail,
            generic,
        }
    }

    pub fn handler(&self, provider: Provider) -> &dyn AuthHandler {
        match provider {
            Provider::Gmail => self.gmail.as_ref(),
            Provider::Generic => self.generic.as_ref(),
        }
    }

    /// Return the existing account for `identity`, or create one.
    ///
    /// New accounts are verified before they are persisted. `created_at` is
    /// set here, which the notifier later uses as its routing threshold.
    pub async fn resolve_or_create_account(
        &self,
        identity: &Identity,
        credentials: &Credentials,
    ) -> ProvisioningResult<ProvisionOutcome> {
        if let Some(outcome) = self.existing(identity).await? {
            return Ok(outcome);
        }

        let provider = credentials.provider();
        let handler = self.handler(provider);
        let draft = handler
            .create_account(&identity.email_address, credentials)
            .await?;

        if !handler.verify_account(&draft).await? {
            warn!(
                email = %identity.email_address,
                provider = %provider,
                "New account failed verification"
            );
            return Err(ProvisioningError::VerificationFailed(format!(
                "{} account {} could not be verified",
                provider, identity.email_address
            )));
        }

        match self.store.insert(&draft, Utc::now()).await {
            Ok((account, namespace)) => {
                info!(
                    account = %account.public_id,
                    namespace = %namespace.public_id,
                    provider = %provider,
                    "Provisioned account"
                );
                Ok(ProvisionOutcome::Created { account, namespace })
            }
            // Lost a race with a concurrent request for the same email.
            Err(ProvisioningError::Store(DirectoryError::Duplicate(_))) => self
                .existing(identity)
                .await?
                .ok_or_else(|| {
                    ProvisioningError::Store(DirectoryError::NotFound(
                        identity.email_address.clone(),
                    ))
                }),
            Err(e) => Err(e),
        }
    }

    /// Re-authorize an existing account with new credentials.
    pub async fn update_credentials(
        &self,
        identity: &Identity,
        credentials: &Credentials,
    ) -> ProvisioningResult<Account> {
        let account = self
            .store
            .find_by_email(&identity.email_address)
            .await?
            .ok_or_else(|| ProvisioningError::AccountNotFound(identity.email_address.clone()))?;

        let provider = Provider::from_tag(&account.provider)?;
        if provider != credentials.provider() {
            return Err(ProvisioningError::Validation(format!(
                "Account {} is a {} account",
                account.email_address, provider
            )));
        }

        let draft = self.draft_of(&account, provider).await?;
        let handler = self.handler(provider);
        let updated = handler.update_account(draft, credentials).await?;
        if !handler.verify_account(&updated).await? {
            return Err(ProvisioningError::VerificationFailed(format!(
                "{} account {} could not be verified",
                provider, account.email_address
            )));
        }

        self.store.update_auth(&account, &updated.auth).await?;
        info!(account = %account.public_id, "Updated account credentials");
        Ok(account)
    }

    /// Whether a stored account is usable with its current credentials.
    pub async fn verify_account(&self, account: &Account) -> ProvisioningResult<bool> {
        let provider = Provider::from_tag(&account.provider)?;
        let draft = match self.draft_of(account, provider).await {
            Ok(draft) => draft,
            Err(ProvisioningError::Store(DirectoryError::NotFound(_))) => {
                debug!(account = %account.public_id, "No credentials on record");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        self.handler(provider).verify_account(&draft).await
    }

    async fn existing(&self, identity: &Identity) -> ProvisioningResult<Option<ProvisionOutcome>> {
        let Some(account) = self.store.find_by_email(&identity.email_address).await? else {
            return Ok(None);
        };
        debug!(account = %account.public_id, "Account already provisioned");
        let namespace = self.store.namespace_of(account.id).await?;
        Ok(Some(ProvisionOutcome::AlreadyProvisioned { account, namespace }))
    }

    async fn draft_of(&self, account: &Account, provider: Provider) -> ProvisioningResult<AccountDraft> {
        let auth = self.store.auth(account.id).await?.ok_or_else(|| {
            ProvisioningError::Store(DirectoryError::NotFound(format!(
                "credentials for account {}",
                account.id
            )))
        })?;
        Ok(AccountDraft {
            email_address: account.email_address.clone(),
            provider,
            auth,
        })
    }
}
