//! Account persistence for the provisioning service.
//!
//! Account and namespace rows live in the shared directory, so the notifier
//! sees new accounts immediately. Secret material is kept apart from them.

use crate::error::{ProvisioningError, ProvisioningResult};
use crate::provider::{AccountDraft, AuthMaterial};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use outbox_notifier::{Account, MemoryDirectory, Namespace};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Case-insensitive lookup by email address.
    async fn find_by_email(&self, email_address: &str) -> ProvisioningResult<Option<Account>>;

    /// Namespace owned by an account.
    async fn namespace_of(&self, account_id: i64) -> ProvisioningResult<Option<Namespace>>;

    /// Persist a new account and its namespace.
    async fn insert(
        &self,
        draft: &AccountDraft,
        created_at: DateTime<Utc>,
    ) -> ProvisioningResult<(Account, Namespace)>;

    /// Replace the secret material of an existing account.
    async fn update_auth(&self, account: &Account, auth: &AuthMaterial) -> ProvisioningResult<()>;

    /// Secret material of an account.
    async fn auth(&self, account_id: i64) -> ProvisioningResult<Option<AuthMaterial>>;
}

/// Store backed by a [`MemoryDirectory`].
pub struct DirectoryAccountStore {
    directory: Arc<MemoryDirectory>,
    secrets: RwLock<HashMap<i64, AuthMaterial>>,
}

impl DirectoryAccountStore {
    pub fn new(directory: Arc<MemoryDirectory>) -> Self {
        Self {
            directory,
            secrets: RwLock::new(HashMap::new()),
        }
    }

    pub fn directory(&self) -> &Arc<MemoryDirectory> {
        &self.directory
    }
}

#[async_trait]
impl AccountStore for DirectoryAccountStore {
    async fn find_by_email(&self, email_address: &str) -> ProvisioningResult<Option<Account>> {
        Ok(self.directory.account_by_email(email_address))
    }

    async fn namespace_of(&self, account_id: i64) -> ProvisioningResult<Option<Namespace>> {
        Ok(self.directory.namespace_of(account_id))
    }

    async fn insert(
        &self,
        draft: &AccountDraft,
        created_at: DateTime<Utc>,
    ) -> ProvisioningResult<(Account, Namespace)> {
        let (account, namespace) = self.directory.create_account(
            &draft.email_address,
            draft.provider.tag(),
            created_at,
        )?;
        self.secrets
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(account.id, draft.auth.clone());
        Ok((account, namespace))
    }

    async fn update_auth(&self, account: &Account, auth: &AuthMaterial) -> ProvisioningResult<()> {
        let mut secrets = self
            .secrets
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match secrets.get_mut(&account.id) {
            Some(stored) => {
                *stored = auth.clone();
                Ok(())
            }
            None => Err(ProvisioningError::Store(
                outbox_notifier::DirectoryError::NotFound(format!("account {}", account.id)),
            )),
        }
    }

    async fn auth(&self, account_id: i64) -> ProvisioningResult<Option<AuthMaterial>> {
        Ok(self
            .secrets
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&account_id)
            .cloned())
    }
}
