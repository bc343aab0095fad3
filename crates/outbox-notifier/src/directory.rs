//! Read access to namespaces, accounts and messages.
//!
//! The notifier needs two lookups: the namespace (and its owning account)
//! of a change, and, on the transaction-log path, the message a change
//! refers to. `MemoryDirectory` keeps everything in process; it backs the
//! binary's dry runs and the tests, and doubles as the account store of the
//! provisioning service.

use crate::error::DirectoryError;
use crate::model::{Account, Message, Namespace};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Lookups the notifier performs against the primary store.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Namespace by internal id, with its owning account if resolvable.
    async fn namespace(&self, namespace_id: i64) -> Result<Option<Namespace>, DirectoryError>;

    /// Message by public id within a namespace.
    async fn message(
        &self,
        namespace_id: i64,
        public_id: &str,
    ) -> Result<Option<Message>, DirectoryError>;
}

#[derive(Debug, Clone)]
struct NamespaceRow {
    public_id: String,
    account_id: Option<i64>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    accounts: HashMap<i64, Account>,
    namespaces: HashMap<i64, NamespaceRow>,
    messages: HashMap<(i64, String), Message>,
    next_id: i64,
}

impl DirectoryState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn resolve(&self, namespace_id: i64) -> Option<Namespace> {
        self.namespaces.get(&namespace_id).map(|row| Namespace {
            id: namespace_id,
            public_id: row.public_id.clone(),
            account: row.account_id.and_then(|id| self.accounts.get(&id).cloned()),
        })
    }
}

/// Generate an opaque external identifier.
pub fn new_public_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// In-process directory.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    state: RwLock<DirectoryState>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, DirectoryState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, DirectoryState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create an account together with the namespace it owns.
    pub fn create_account(
        &self,
        email_address: &str,
        provider: &str,
        created_at: DateTime<Utc>,
    ) -> Result<(Account, Namespace), DirectoryError> {
        let mut state = self.write();

        if state
            .accounts
            .values()
            .any(|a| a.email_address.eq_ignore_ascii_case(email_address))
        {
            return Err(DirectoryError::Duplicate(email_address.to_string()));
        }

        let account = Account {
            id: state.allocate_id(),
            public_id: new_public_id(),
            email_address: email_address.to_string(),
            provider: provider.to_string(),
            created_at,
        };
        let namespace_id = state.allocate_id();
        let row = NamespaceRow {
            public_id: new_public_id(),
            account_id: Some(account.id),
        };

        state.accounts.insert(account.id, account.clone());
        state.namespaces.insert(namespace_id, row.clone());

        let namespace = Namespace {
            id: namespace_id,
            public_id: row.public_id,
            account: Some(account.clone()),
        };
        Ok((account, namespace))
    }

    /// Replace a stored account, keeping its id.
    pub fn update_account(&self, account: &Account) -> Result<(), DirectoryError> {
        let mut state = self.write();
        match state.accounts.get_mut(&account.id) {
            Some(stored) => {
                *stored = account.clone();
                Ok(())
            }
            None => Err(DirectoryError::NotFound(format!("account {}", account.id))),
        }
    }

    pub fn account_by_email(&self, email_address: &str) -> Option<Account> {
        self.read()
            .accounts
            .values()
            .find(|a| a.email_address.eq_ignore_ascii_case(email_address))
            .cloned()
    }

    /// Namespace owned by an account.
    pub fn namespace_of(&self, account_id: i64) -> Option<Namespace> {
        let state = self.read();
        state
            .namespaces
            .iter()
            .find(|(_, row)| row.account_id == Some(account_id))
            .and_then(|(id, _)| state.resolve(*id))
    }

    /// Store a namespace with explicit ids. Its account, if any, is stored too.
    ///
    /// Fails if the account id already belongs to a different mailbox.
    pub fn insert_namespace(&self, namespace: Namespace) -> Result<(), DirectoryError> {
        let mut state = self.write();
        let account_id = namespace.account.as_ref().map(|a| a.id);

        if let Some(account) = namespace.account {
            if let Some(existing) = state.accounts.get(&account.id) {
                if !existing
                    .email_address
                    .eq_ignore_ascii_case(&account.email_address)
                {
                    return Err(DirectoryError::Duplicate(format!(
                        "account id {} already belongs to {}",
                        account.id, existing.email_address
                    )));
                }
            }
            state.accounts.insert(account.id, account);
        }

        state.next_id = state
            .next_id
            .max(namespace.id)
            .max(account_id.unwrap_or(0));
        state.namespaces.insert(
            namespace.id,
            NamespaceRow {
                public_id: namespace.public_id,
                account_id,
            },
        );
        Ok(())
    }

    /// Record a committed message.
    pub fn insert_message(&self, message: Message) {
        self.write()
            .messages
            .insert((message.namespace_id, message.public_id.clone()), message);
    }

    pub fn message_count(&self) -> usize {
        self.read().messages.len()
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn namespace(&self, namespace_id: i64) -> Result<Option<Namespace>, DirectoryError> {
        Ok(self.read().resolve(namespace_id))
    }

    async fn message(
        &self,
        namespace_id: i64,
        public_id: &str,
    ) -> Result<Option<Message>, DirectoryError> {
        Ok(self
            .read()
            .messages
            .get(&(namespace_id, public_id.to_string()))
            .cloned())
    }
}
