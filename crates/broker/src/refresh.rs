//! Token refresher
//!
//! `ensure_fresh` refreshes an account's access token once it is within the
//! configured skew of expiry. Refreshes are serialized per account id and the
//! store is re-read after taking the lock, so concurrent callers for one
//! account trigger a single provider call.
//!
//! Outcome policy (same for every platform):
//! - Success: persist new tokens, then invalidate the old fingerprint, both
//!   under the account lock. No caller can pair the new token with a handle
//!   built from the old one.
//! - Provider rejection (`invalid_grant`, other 4xx) or no refresh token:
//!   mark `RelinkRequired`, persist, invalidate the handle, fail. Later calls
//!   fail immediately without contacting the provider.
//! - Transport error or 5xx: fail, account unchanged. The next call retries.

use common::Secret;
use oauth::{AccountStatus, LinkedAccount, refresh_token};
use tracing::{debug, info, warn};

use crate::broker::{Broker, fingerprint};
use crate::error::{Error, Result};

impl Broker {
    /// Return `account` with a usable access token, refreshing if needed.
    pub async fn ensure_fresh(&self, account: LinkedAccount) -> Result<LinkedAccount> {
        if account.status == AccountStatus::RelinkRequired {
            return Err(relink_required(&account.id, "account requires re-link"));
        }
        if !account.needs_refresh(self.clock.now_millis(), self.config.refresh_skew) {
            return Ok(account);
        }

        let lock = self.refresh_lock(&account.id).await;
        let _guard = lock.lock().await;

        // Another caller may have refreshed (or failed) while we waited.
        let current = self
            .store
            .account_by_id(&account.id)
            .await
            .map_err(Error::store)?
            .ok_or(Error::AccountNotFound(account.platform))?;
        if current.status == AccountStatus::RelinkRequired {
            return Err(relink_required(&current.id, "account requires re-link"));
        }
        if !current.needs_refresh(self.clock.now_millis(), self.config.refresh_skew) {
            debug!(account_id = %current.id, "token already refreshed by another caller");
            return Ok(current);
        }

        self.refresh_locked(current).await
    }

    /// Refresh while holding the account's lock.
    async fn refresh_locked(&self, mut account: LinkedAccount) -> Result<LinkedAccount> {
        let platform = account.platform;
        let settings = self.provider(platform)?;
        let Some(refresh) = account.refresh_token.clone() else {
            return self
                .require_relink(account, "no refresh token stored")
                .await;
        };
        let old_key = fingerprint(platform, &account.access_token);

        debug!(%platform, account_id = %account.id, "refreshing access token");
        match refresh_token(&self.http, settings, &Secret::new(refresh)).await {
            Ok(token) => {
                if let Some(current) = self.superseded(&account).await? {
                    return Ok(current);
                }
                account.apply_refresh(token, self.clock.now_millis());
                let stored = self
                    .store
                    .upsert_account(account)
                    .await
                    .map_err(Error::store)?;
                self.pool.invalidate(&old_key).await;
                info!(%platform, account_id = %stored.id, "access token refreshed");
                metrics::counter!("broker_token_refresh_total", "platform" => platform.as_str(), "outcome" => "success")
                    .increment(1);
                Ok(stored)
            }
            Err(oauth::Error::InvalidGrant(message)) => {
                self.require_relink(account, &message).await
            }
            Err(err) => {
                warn!(%platform, account_id = %account.id, error = %err, "token refresh failed, will retry on next use");
                metrics::counter!("broker_token_refresh_total", "platform" => platform.as_str(), "outcome" => "transient")
                    .increment(1);
                Err(Error::RefreshFailed {
                    account_id: account.id,
                    relink_required: false,
                    message: err.to_string(),
                })
            }
        }
    }

    /// Mark the account as needing a new login and drop its handle.
    async fn require_relink(&self, mut account: LinkedAccount, reason: &str) -> Result<LinkedAccount> {
        if let Some(current) = self.superseded(&account).await? {
            return Ok(current);
        }
        let platform = account.platform;
        let key = fingerprint(platform, &account.access_token);
        account.status = AccountStatus::RelinkRequired;
        account.updated_at = self.clock.now_millis();
        let id = account.id.clone();
        self.store
            .upsert_account(account)
            .await
            .map_err(Error::store)?;
        self.pool.invalidate(&key).await;

        warn!(%platform, account_id = %id, reason, "refresh rejected, account requires re-link");
        metrics::counter!("broker_token_refresh_total", "platform" => platform.as_str(), "outcome" => "relink_required")
            .increment(1);
        Err(relink_required(&id, reason))
    }

    /// The stored record, if its access token is no longer the one this
    /// refresh started from. Results computed from the old token are then
    /// discarded instead of written back.
    async fn superseded(&self, account: &LinkedAccount) -> Result<Option<LinkedAccount>> {
        let current = self
            .store
            .account_by_id(&account.id)
            .await
            .map_err(Error::store)?
            .ok_or(Error::AccountNotFound(account.platform))?;
        if current.access_token == account.access_token {
            return Ok(None);
        }
        debug!(account_id = %current.id, "account re-linked during refresh, keeping stored tokens");
        if current.status == AccountStatus::RelinkRequired {
            return Err(relink_required(&current.id, "account requires re-link"));
        }
        Ok(Some(current))
    }
}

fn relink_required(account_id: &str, message: &str) -> Error {
    Error::RefreshFailed {
        account_id: account_id.to_string(),
        relink_required: true,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::tests::{harness, seed_account};
    use common::Clock;
    use oauth::AccountStore;
    use platform::Platform;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_refresh(server: &MockServer, response: ResponseTemplate, expected: u64) {
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(response)
            .expect(expected)
            .mount(server)
            .await;
    }

    fn refreshed(access: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": access,
            "refresh_token": "rt_rotated",
            "expires_in": 7200,
            "token_type": "bearer"
        }))
    }

    #[tokio::test]
    async fn fresh_account_is_returned_unchanged() {
        let server = MockServer::start().await;
        mount_refresh(&server, refreshed("unused"), 0).await;
        let h = harness(&server);
        let account = seed_account(&h, "alice", 3600).await;

        let fresh = h.broker.ensure_fresh(account.clone()).await.unwrap();
        assert_eq!(fresh.access_token, account.access_token);
    }

    #[tokio::test]
    async fn refreshes_within_skew_of_expiry() {
        let server = MockServer::start().await;
        mount_refresh(&server, refreshed("at_fresh"), 1).await;
        let h = harness(&server);
        let account = seed_account(&h, "alice", 3600).await;

        h.clock.advance(Duration::from_secs(3600 - 30));
        let fresh = h.broker.ensure_fresh(account.clone()).await.unwrap();
        assert_eq!(fresh.id, account.id);
        assert_eq!(fresh.access_token, "at_fresh");
        assert_eq!(fresh.refresh_token.as_deref(), Some("rt_rotated"));
        assert_eq!(fresh.expires_at, Some(h.clock.now_millis() + 7_200_000));

        let stored = h.store.account_by_id(&account.id).await.unwrap().unwrap();
        assert_eq!(stored.access_token, "at_fresh");
    }

    #[tokio::test]
    async fn refresh_then_acquire_never_returns_stale_handle() {
        let server = MockServer::start().await;
        mount_refresh(&server, refreshed("at_fresh"), 1).await;
        let h = harness(&server);
        seed_account(&h, "alice", 3600).await;

        let stale = h.broker.get_client("alice", Platform::Twitter).await.unwrap();
        assert_eq!(stale.credential().expose(), "at_alice");

        h.clock.advance(Duration::from_secs(3600));
        let client = h.broker.get_client("alice", Platform::Twitter).await.unwrap();
        assert_eq!(client.credential().expose(), "at_fresh");
        assert_eq!(h.broker.health().await.pooled_clients, 1);
        assert_eq!(h.factory.count(), 2);
    }

    #[tokio::test]
    async fn concurrent_callers_refresh_once() {
        let server = MockServer::start().await;
        mount_refresh(&server, refreshed("at_fresh"), 1).await;
        let h = harness(&server);
        let account = seed_account(&h, "alice", 10).await;
        h.clock.advance(Duration::from_secs(60));

        let mut tasks = vec![];
        for _ in 0..8 {
            let broker = h.broker.clone();
            let account = account.clone();
            tasks.push(tokio::spawn(async move { broker.ensure_fresh(account).await }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap().access_token, "at_fresh");
        }
    }

    #[tokio::test]
    async fn invalid_grant_marks_relink_and_invalidates_handle() {
        let server = MockServer::start().await;
        mount_refresh(
            &server,
            ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Refresh token revoked"
            })),
            1,
        )
        .await;
        let h = harness(&server);
        let account = seed_account(&h, "alice", 3600).await;
        h.broker.get_client("alice", Platform::Twitter).await.unwrap();
        assert_eq!(h.broker.health().await.pooled_clients, 1);

        h.clock.advance(Duration::from_secs(7200));
        let err = h.broker.ensure_fresh(account.clone()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::RefreshFailed {
                relink_required: true,
                ..
            }
        ));
        assert!(!err.to_string().contains("rt_alice"));

        let stored = h.store.account_by_id(&account.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AccountStatus::RelinkRequired);
        assert_eq!(stored.access_token, "at_alice");
        assert_eq!(h.broker.health().await.pooled_clients, 0);

        // Terminal: no second provider call (the mock expects exactly one).
        let err = h.broker.get_client("alice", Platform::Twitter).await.unwrap_err();
        assert_eq!(err.kind(), "relink_required");
    }

    #[tokio::test]
    async fn transient_failure_leaves_account_unchanged() {
        let server = MockServer::start().await;
        mount_refresh(&server, ResponseTemplate::new(503), 2).await;
        let h = harness(&server);
        let account = seed_account(&h, "alice", 3600).await;

        h.clock.advance(Duration::from_secs(7200));
        let err = h.broker.ensure_fresh(account.clone()).await.unwrap_err();
        assert_eq!(err.kind(), "refresh_failed");

        let stored = h.store.account_by_id(&account.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AccountStatus::Active);
        assert_eq!(stored.access_token, "at_alice");

        // The next call tries again.
        let err = h.broker.ensure_fresh(stored).await.unwrap_err();
        assert_eq!(err.kind(), "refresh_failed");
    }

    #[tokio::test]
    async fn missing_refresh_token_requires_relink() {
        let server = MockServer::start().await;
        mount_refresh(&server, refreshed("unused"), 0).await;
        let h = harness(&server);
        let mut account = seed_account(&h, "alice", 3600).await;
        account.refresh_token = None;
        let account = h.store.upsert_account(account).await.unwrap();

        h.clock.advance(Duration::from_secs(7200));
        let err = h.broker.ensure_fresh(account).await.unwrap_err();
        assert_eq!(err.kind(), "relink_required");
    }

    #[tokio::test]
    async fn account_without_expiry_is_never_refreshed() {
        let server = MockServer::start().await;
        mount_refresh(&server, refreshed("unused"), 0).await;
        let h = harness(&server);
        let mut account = seed_account(&h, "alice", 3600).await;
        account.expires_at = None;
        let account = h.store.upsert_account(account).await.unwrap();

        h.clock.advance(Duration::from_secs(30 * 24 * 3600));
        let same = h.broker.ensure_fresh(account).await.unwrap();
        assert_eq!(same.access_token, "at_alice");
    }

    #[tokio::test]
    async fn rejected_refresh_does_not_overwrite_replaced_token() {
        let server = MockServer::start().await;
        mount_refresh(
            &server,
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"error": "invalid_grant"}))
                .set_delay(Duration::from_millis(300)),
            1,
        )
        .await;
        let h = harness(&server);
        let account = seed_account(&h, "alice", 3600).await;
        h.clock.advance(Duration::from_secs(7200));

        let refresh = {
            let broker = h.broker.clone();
            let account = account.clone();
            tokio::spawn(async move { broker.ensure_fresh(account).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Written straight to the store, outside the account lock.
        let mut replaced = account.clone();
        replaced.access_token = "at_replaced".into();
        replaced.expires_at = Some(h.clock.now_millis() + 3_600_000);
        h.store.upsert_account(replaced).await.unwrap();

        let result = refresh.await.unwrap().unwrap();
        assert_eq!(result.access_token, "at_replaced");

        let stored = h.store.account_by_id(&account.id).await.unwrap().unwrap();
        assert_eq!(stored.access_token, "at_replaced");
        assert_eq!(stored.status, AccountStatus::Active);
    }

    #[tokio::test]
    async fn successful_refresh_keeps_token_replaced_meanwhile() {
        let server = MockServer::start().await;
        mount_refresh(
            &server,
            refreshed("at_from_refresh").set_delay(Duration::from_millis(300)),
            1,
        )
        .await;
        let h = harness(&server);
        let account = seed_account(&h, "alice", 3600).await;
        h.clock.advance(Duration::from_secs(7200));

        let refresh = {
            let broker = h.broker.clone();
            let account = account.clone();
            tokio::spawn(async move { broker.ensure_fresh(account).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut replaced = account.clone();
        replaced.access_token = "at_replaced".into();
        h.store.upsert_account(replaced).await.unwrap();

        let result = refresh.await.unwrap().unwrap();
        assert_eq!(result.access_token, "at_replaced");
        let stored = h.store.account_by_id(&account.id).await.unwrap().unwrap();
        assert_eq!(stored.access_token, "at_replaced");
    }
}
