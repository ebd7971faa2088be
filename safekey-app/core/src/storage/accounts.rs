//! Stored service credentials.
//!
//! Accounts are kept in `accounts.json` next to the settings file.
//! Passwords are stored in plain text: the app lock gates the UI, it does
//! not encrypt the vault. Integrators must not treat this file as secret
//! storage.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::write_atomic;
use crate::error::{Result, SafeKeyError};

#[derive(Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub website: String,
    /// Comma-separated tag list.
    #[serde(default)]
    pub tags: String,
    /// Identifier of the service icon.
    #[serde(default)]
    pub icon: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn tag_list(&self) -> Vec<&str> {
        split_tags(&self.tags)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("website", &self.website)
            .field("tags", &self.tags)
            .field("icon", &self.icon)
            .finish()
    }
}

/// Fields supplied when creating an account.
#[derive(Clone, Default)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub website: String,
    pub tags: String,
    pub icon: String,
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Normalize a user-entered tag list to `a,b,c`.
pub(crate) fn join_tags(raw: &str) -> String {
    split_tags(raw).join(",")
}

fn split_tags(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AccountsFile {
    /// Ids are never reused, even after deletion.
    next_id: i64,
    accounts: Vec<Account>,
}

pub struct AccountStore {
    path: PathBuf,
    io: Mutex<()>,
}

impl AccountStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<AccountsFile> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AccountsFile {
                next_id: 1,
                accounts: Vec::new(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, file: &AccountsFile) -> Result<()> {
        let content = serde_json::to_vec_pretty(file)?;
        write_atomic(&self.path, &content).await
    }

    /// Insert a new account and return its id.
    pub async fn insert(&self, new: NewAccount) -> Result<i64> {
        if new.name.trim().is_empty() {
            return Err(SafeKeyError::InvalidInput(
                "Please fill in the Service Name".into(),
            ));
        }

        let _guard = self.io.lock().await;
        let mut file = self.load().await?;
        let id = file.next_id.max(1);
        let now = Utc::now();
        file.accounts.push(Account {
            id,
            name: new.name,
            email: new.email,
            password: new.password,
            website: new.website,
            tags: join_tags(&new.tags),
            icon: new.icon,
            created_at: now,
            updated_at: now,
        });
        file.next_id = id + 1;
        self.save(&file).await?;

        info!("Saved account {}", id);
        Ok(id)
    }

    /// All accounts ordered by name.
    pub async fn list(&self) -> Result<Vec<Account>> {
        let _guard = self.io.lock().await;
        let mut accounts = self.load().await?.accounts;
        accounts.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(accounts)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Account>> {
        let _guard = self.io.lock().await;
        let file = self.load().await?;
        Ok(file.accounts.into_iter().find(|a| a.id == id))
    }

    /// Replace every editable field of an existing account.
    pub async fn update(&self, account: Account) -> Result<()> {
        if account.name.trim().is_empty() {
            return Err(SafeKeyError::InvalidInput(
                "Please fill in the Service Name".into(),
            ));
        }

        let _guard = self.io.lock().await;
        let mut file = self.load().await?;
        let existing = file
            .accounts
            .iter_mut()
            .find(|a| a.id == account.id)
            .ok_or(SafeKeyError::AccountNotFound(account.id))?;

        existing.name = account.name;
        existing.email = account.email;
        existing.password = account.password;
        existing.website = account.website;
        existing.tags = join_tags(&account.tags);
        existing.icon = account.icon;
        existing.updated_at = Utc::now();
        self.save(&file).await?;

        debug!("Updated account {}", account.id);
        Ok(())
    }

    /// Deleting an unknown id is not an error.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let _guard = self.io.lock().await;
        let mut file = self.load().await?;
        let before = file.accounts.len();
        file.accounts.retain(|a| a.id != id);
        if file.accounts.len() < before {
            self.save(&file).await?;
            info!("Deleted account {}", id);
        }
        Ok(())
    }

    /// Delete every stored account. Returns how many were removed.
    pub async fn delete_all(&self) -> Result<usize> {
        let _guard = self.io.lock().await;
        let mut file = self.load().await?;
        let removed = file.accounts.len();
        file.accounts.clear();
        self.save(&file).await?;
        info!("Deleted all {} accounts", removed);
        Ok(removed)
    }
}
