//! JSON file adapter for `AccountStore`
//!
//! Keeps linked accounts in a JSON object keyed by account id. All writes use
//! atomic temp-file + rename so a crash mid-write never corrupts the file, and
//! a tokio Mutex serializes concurrent writers (callback upserts, refreshes,
//! disconnects). Linked accounts therefore survive restarts while pending
//! sessions and pooled clients do not.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use platform::Platform;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::accounts::{AccountStore, BoxFuture, LinkedAccount, latest_for, owned_by, upsert_into};
use crate::error::{Error, Result};

/// Thread-safe account file manager.
///
/// Reads clone from the in-memory map. Every mutation is applied to a copy,
/// persisted, and only then made visible, so a failed write changes nothing.
pub struct FileAccountStore {
    path: PathBuf,
    state: Mutex<HashMap<String, LinkedAccount>>,
}

impl FileAccountStore {
    /// Load accounts from `path`.
    ///
    /// If the file doesn't exist, creates it as `{}` (cold start with no
    /// linked accounts).
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading account file: {e}")))?;
            let accounts: HashMap<String, LinkedAccount> = serde_json::from_str(&contents)
                .map_err(|e| Error::AccountParse(format!("parsing account file: {e}")))?;
            info!(path = %path.display(), accounts = accounts.len(), "loaded linked accounts");
            accounts
        } else {
            info!(path = %path.display(), "account file not found, starting with empty store");
            let accounts = HashMap::new();
            write_atomic(&path, &accounts).await?;
            accounts
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl AccountStore for FileAccountStore {
    fn get_account<'a>(
        &'a self,
        owner_id: &'a str,
        platform: Platform,
    ) -> BoxFuture<'a, Result<Option<LinkedAccount>>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(latest_for(&state, owner_id, platform))
        })
    }

    fn account_by_id<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<LinkedAccount>>> {
        Box::pin(async move { Ok(self.state.lock().await.get(id).cloned()) })
    }

    fn upsert_account(&self, account: LinkedAccount) -> BoxFuture<'_, Result<LinkedAccount>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let mut next = state.clone();
            let stored = upsert_into(&mut next, account);
            write_atomic(&self.path, &next).await?;
            *state = next;
            Ok(stored)
        })
    }

    fn delete_account<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<LinkedAccount>>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            if !state.contains_key(id) {
                return Ok(None);
            }
            let mut next = state.clone();
            let removed = next.remove(id);
            write_atomic(&self.path, &next).await?;
            *state = next;
            debug!(account_id = id, "removed linked account");
            Ok(removed)
        })
    }

    fn list_accounts<'a>(&'a self, owner_id: &'a str) -> BoxFuture<'a, Result<Vec<LinkedAccount>>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(owned_by(&state, owner_id))
        })
    }
}

/// Write accounts to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Sets permissions to 0600 (owner read/write only) since the
/// file contains OAuth tokens.
async fn write_atomic(path: &Path, data: &HashMap<String, LinkedAccount>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::AccountParse(format!("serializing accounts: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("account path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".accounts.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp account file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting account file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp account file: {e}")))?;

    debug!(path = %path.display(), "persisted linked accounts");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::AccountStatus;
    use crate::accounts::tests::account;
    use std::sync::Arc;

    #[tokio::test]
    async fn accounts_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");

        let store = FileAccountStore::load(path.clone()).await.unwrap();
        let stored = store
            .upsert_account(account("owner-1", Platform::Twitter, Some("42"), 100))
            .await
            .unwrap();

        let reloaded = FileAccountStore::load(path).await.unwrap();
        let account = reloaded
            .get_account("owner-1", Platform::Twitter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.id, stored.id);
        assert_eq!(account.access_token, "at_owner-1_100");
        assert_eq!(account.provider_user_id.as_deref(), Some("42"));
        assert_eq!(account.status, AccountStatus::Active);
    }

    #[tokio::test]
    async fn cold_start_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");

        assert!(!path.exists());
        let store = FileAccountStore::load(path.clone()).await.unwrap();
        assert!(store.is_empty().await);
        assert!(path.exists());

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: HashMap<String, LinkedAccount> = serde_json::from_str(&contents).unwrap();
        assert!(parsed.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let result = FileAccountStore::load(path).await;
        assert!(matches!(result, Err(Error::AccountParse(_))));
    }

    #[tokio::test]
    async fn delete_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");

        let store = FileAccountStore::load(path.clone()).await.unwrap();
        let stored = store
            .upsert_account(account("owner-1", Platform::Reddit, Some("r"), 1))
            .await
            .unwrap();
        store.delete_account(&stored.id).await.unwrap();

        let reloaded = FileAccountStore::load(path).await.unwrap();
        assert!(reloaded.is_empty().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_permissions_are_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");

        let store = FileAccountStore::load(path.clone()).await.unwrap();
        store
            .upsert_account(account("owner-1", Platform::Discord, None, 1))
            .await
            .unwrap();

        let metadata = tokio::fs::metadata(&path).await.unwrap();
        let mode = metadata.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "account file must be 0600, got {mode:o}");
    }

    #[tokio::test]
    async fn concurrent_upserts_dont_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        let store = Arc::new(FileAccountStore::load(path.clone()).await.unwrap());

        let mut handles = vec![];
        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .upsert_account(account(&format!("owner-{i}"), Platform::Twitter, Some("u"), i))
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(store.len().await, 10);
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: HashMap<String, LinkedAccount> = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.len(), 10);
    }

    #[tokio::test]
    async fn failed_write_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("accounts.json");
        tokio::fs::create_dir(dir.path().join("state")).await.unwrap();

        let store = FileAccountStore::load(path.clone()).await.unwrap();
        let kept = store
            .upsert_account(account("owner-1", Platform::Reddit, Some("r"), 1))
            .await
            .unwrap();

        tokio::fs::remove_dir_all(dir.path().join("state")).await.unwrap();

        let result = store
            .upsert_account(account("owner-2", Platform::Twitter, Some("t"), 2))
            .await;
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(store.get_account("owner-2", Platform::Twitter).await.unwrap().is_none());
        assert_eq!(store.len().await, 1);

        let result = store.delete_account(&kept.id).await;
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(store.account_by_id(&kept.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_of_unknown_id_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileAccountStore::load(dir.path().join("accounts.json"))
            .await
            .unwrap();
        assert!(store.delete_account("missing").await.unwrap().is_none());
    }
}
