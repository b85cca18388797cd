//! Linked accounts and the storage contract
//!
//! `AccountStore` is the boundary to whatever persists linked accounts. The
//! broker only needs keyed get/upsert/delete; schema and storage technology
//! belong to the adapter. Two adapters ship here: `MemoryAccountStore` for
//! tests and embedding, and `FileAccountStore` (see `file_store`) for a
//! restart-safe JSON file.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use platform::Platform;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::token::TokenResponse;

/// Boxed future returned by `AccountStore` methods (keeps the trait dyn-compatible).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Whether an account's tokens are still usable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    /// The provider refused the refresh token; the owner must link again.
    RelinkRequired,
}

impl AccountStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::RelinkRequired => "relink_required",
        }
    }
}

/// A platform account linked to an internal owner.
///
/// Timestamps are unix milliseconds. `expires_at` is absolute, computed from
/// the token response's `expires_in` delta at storage time.
#[derive(Clone, Serialize, Deserialize)]
pub struct LinkedAccount {
    pub id: String,
    pub owner_id: String,
    pub platform: Platform,
    #[serde(default)]
    pub provider_user_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub status: AccountStatus,
    pub linked_at: u64,
    pub updated_at: u64,
}

impl fmt::Debug for LinkedAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkedAccount")
            .field("id", &self.id)
            .field("owner_id", &self.owner_id)
            .field("platform", &self.platform)
            .field("provider_user_id", &self.provider_user_id)
            .field("username", &self.username)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl LinkedAccount {
    /// New account from a fresh token exchange, with a generated id.
    pub fn from_tokens(
        owner_id: &str,
        platform: Platform,
        token: TokenResponse,
        now_millis: u64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            platform,
            provider_user_id: None,
            username: None,
            expires_at: token.expires_in.map(|secs| expiry_from(now_millis, secs)),
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            scope: token.scope,
            status: AccountStatus::Active,
            linked_at: now_millis,
            updated_at: now_millis,
        }
    }

    /// Replace tokens after a successful refresh.
    ///
    /// Keeps the current refresh token when the provider does not rotate it.
    pub fn apply_refresh(&mut self, token: TokenResponse, now_millis: u64) {
        self.access_token = token.access_token;
        if let Some(refresh) = token.refresh_token {
            self.refresh_token = Some(refresh);
        }
        self.expires_at = token.expires_in.map(|secs| expiry_from(now_millis, secs));
        if token.scope.is_some() {
            self.scope = token.scope;
        }
        self.status = AccountStatus::Active;
        self.updated_at = now_millis;
    }

    /// True once `now` is within `skew` of expiry. Accounts without a known
    /// expiry never need a proactive refresh.
    pub fn needs_refresh(&self, now_millis: u64, skew: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => now_millis >= expires_at.saturating_sub(skew.as_millis() as u64),
            None => false,
        }
    }

    /// Whether two records describe the same (owner, platform, provider identity).
    pub fn same_identity(&self, other: &LinkedAccount) -> bool {
        self.owner_id == other.owner_id
            && self.platform == other.platform
            && self.provider_user_id == other.provider_user_id
    }

    /// Token-free view for listing to callers.
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id.clone(),
            platform: self.platform,
            provider_user_id: self.provider_user_id.clone(),
            username: self.username.clone(),
            status: self.status,
            expires_at: self.expires_at,
            linked_at: self.linked_at,
        }
    }
}

/// Absolute expiry for a provider-supplied `expires_in`; absurd values clamp.
fn expiry_from(now_millis: u64, expires_in_secs: u64) -> u64 {
    now_millis.saturating_add(expires_in_secs.saturating_mul(1000))
}

/// Linked account without credentials.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub id: String,
    pub platform: Platform,
    pub provider_user_id: Option<String>,
    pub username: Option<String>,
    pub status: AccountStatus,
    pub expires_at: Option<u64>,
    pub linked_at: u64,
}

/// Persistence contract for linked accounts.
///
/// Uses boxed futures for dyn-compatibility (`Arc<dyn AccountStore>`).
pub trait AccountStore: Send + Sync {
    /// Most recently updated account for (owner, platform).
    fn get_account<'a>(
        &'a self,
        owner_id: &'a str,
        platform: Platform,
    ) -> BoxFuture<'a, Result<Option<LinkedAccount>>>;

    fn account_by_id<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<LinkedAccount>>>;

    /// Insert, or overwrite the account with the same (owner, platform,
    /// provider_user_id). Returns the stored record (with the surviving id).
    fn upsert_account(&self, account: LinkedAccount) -> BoxFuture<'_, Result<LinkedAccount>>;

    fn delete_account<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<LinkedAccount>>>;

    fn list_accounts<'a>(&'a self, owner_id: &'a str) -> BoxFuture<'a, Result<Vec<LinkedAccount>>>;
}

/// Apply upsert semantics to an id-keyed map.
pub(crate) fn upsert_into(
    accounts: &mut HashMap<String, LinkedAccount>,
    mut account: LinkedAccount,
) -> LinkedAccount {
    let existing = accounts
        .values()
        .find(|a| a.same_identity(&account))
        .map(|a| (a.id.clone(), a.linked_at));
    if let Some((id, linked_at)) = existing {
        if id != account.id {
            accounts.remove(&account.id);
        }
        account.id = id;
        account.linked_at = linked_at;
        debug!(account_id = %account.id, platform = %account.platform, "updating linked account");
    } else {
        debug!(account_id = %account.id, platform = %account.platform, "inserting linked account");
    }
    accounts.insert(account.id.clone(), account.clone());
    account
}

pub(crate) fn latest_for(
    accounts: &HashMap<String, LinkedAccount>,
    owner_id: &str,
    platform: Platform,
) -> Option<LinkedAccount> {
    accounts
        .values()
        .filter(|a| a.owner_id == owner_id && a.platform == platform)
        .max_by_key(|a| a.updated_at)
        .cloned()
}

pub(crate) fn owned_by(accounts: &HashMap<String, LinkedAccount>, owner_id: &str) -> Vec<LinkedAccount> {
    let mut owned: Vec<LinkedAccount> = accounts
        .values()
        .filter(|a| a.owner_id == owner_id)
        .cloned()
        .collect();
    owned.sort_by(|a, b| a.platform.cmp(&b.platform).then(a.linked_at.cmp(&b.linked_at)));
    owned
}

/// Process-local account store.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<HashMap<String, LinkedAccount>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.accounts.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl AccountStore for MemoryAccountStore {
    fn get_account<'a>(
        &'a self,
        owner_id: &'a str,
        platform: Platform,
    ) -> BoxFuture<'a, Result<Option<LinkedAccount>>> {
        Box::pin(async move {
            let accounts = self.accounts.lock().await;
            Ok(latest_for(&accounts, owner_id, platform))
        })
    }

    fn account_by_id<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<LinkedAccount>>> {
        Box::pin(async move { Ok(self.accounts.lock().await.get(id).cloned()) })
    }

    fn upsert_account(&self, account: LinkedAccount) -> BoxFuture<'_, Result<LinkedAccount>> {
        Box::pin(async move {
            let mut accounts = self.accounts.lock().await;
            Ok(upsert_into(&mut accounts, account))
        })
    }

    fn delete_account<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<LinkedAccount>>> {
        Box::pin(async move { Ok(self.accounts.lock().await.remove(id)) })
    }

    fn list_accounts<'a>(&'a self, owner_id: &'a str) -> BoxFuture<'a, Result<Vec<LinkedAccount>>> {
        Box::pin(async move {
            let accounts = self.accounts.lock().await;
            Ok(owned_by(&accounts, owner_id))
        })
    }
}
