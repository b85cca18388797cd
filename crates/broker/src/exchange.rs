//! Callback exchanger
//!
//! Turns a provider redirect into a stored `LinkedAccount`:
//! `Started -> Exchanging -> Linked`, or `Started -> Failed` from any step.
//!
//! The pending session is consumed before any network call, so a replayed
//! callback (same code and state) always fails with `InvalidOrExpiredState`
//! instead of linking twice.

use std::fmt;

use oauth::{LinkedAccount, exchange_code};
use platform::Platform;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::broker::{Broker, fingerprint};
use crate::error::{Error, Result};

/// Progress of one callback through the exchanger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Started,
    Exchanging,
    Linked,
    Failed,
}

impl LoginState {
    pub fn label(&self) -> &'static str {
        match self {
            LoginState::Started => "started",
            LoginState::Exchanging => "exchanging",
            LoginState::Linked => "linked",
            LoginState::Failed => "failed",
        }
    }
}

/// Query parameters of the provider redirect.
#[derive(Clone, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl fmt::Debug for CallbackParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackParams")
            .field("has_code", &self.code.is_some())
            .field("has_state", &self.state.is_some())
            .field("error", &self.error)
            .field("error_description", &self.error_description)
            .finish()
    }
}

/// Callback that carried both a code and a state.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizedCallback<'a> {
    pub code: &'a str,
    pub state: &'a str,
}

impl CallbackParams {
    pub fn new(code: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            state: Some(state.into()),
            ..Self::default()
        }
    }

    /// Check the parameters without touching any state.
    ///
    /// An `error` parameter wins over everything else; then `code` and
    /// `state` must both be present and non-empty.
    pub fn validate(&self) -> Result<AuthorizedCallback<'_>> {
        if let Some(error) = non_empty(&self.error) {
            return Err(Error::ProviderDenied {
                platform: None,
                error: error.to_string(),
                description: non_empty(&self.error_description).map(str::to_owned),
            });
        }
        match (non_empty(&self.code), non_empty(&self.state)) {
            (Some(code), Some(state)) => Ok(AuthorizedCallback { code, state }),
            (None, Some(_)) => Err(Error::MalformedCallback("missing code".into())),
            (Some(_), None) => Err(Error::MalformedCallback("missing state".into())),
            (None, None) => Err(Error::MalformedCallback("missing code and state".into())),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Broker {
    /// Complete a login from the provider redirect.
    ///
    /// Exchanges the code with the session's verifier, fetches the account's
    /// identity (best effort) and upserts the linked account.
    pub async fn complete_login(&self, params: &CallbackParams) -> Result<LinkedAccount> {
        let mut state = LoginState::Started;
        debug!(state = state.label(), ?params, "callback received");

        let callback = match params.validate() {
            Ok(callback) => callback,
            Err(Error::ProviderDenied {
                error, description, ..
            }) => {
                // Burn the session so the state cannot be replayed.
                let platform = match non_empty(&params.state) {
                    Some(s) => self.sessions.take(s).await.map(|session| session.platform),
                    None => None,
                };
                let err = Error::ProviderDenied {
                    platform,
                    error,
                    description,
                };
                return Err(self.fail(platform, err));
            }
            Err(err) => return Err(self.fail(None, err)),
        };

        let Some(session) = self.sessions.take(callback.state).await else {
            return Err(self.fail(None, Error::InvalidOrExpiredState));
        };
        let platform = session.platform;
        let owner_id = session.owner_id.as_str();

        let settings = match self.provider(platform) {
            Ok(settings) => settings,
            Err(err) => return Err(self.fail(Some(platform), err)),
        };

        state = LoginState::Exchanging;
        debug!(state = state.label(), %platform, owner_id, "exchanging authorization code");

        let token = match exchange_code(&self.http, settings, callback.code, &session.code_verifier).await {
            Ok(token) => token,
            Err(err) => {
                return Err(self.fail(Some(platform), Error::TokenExchange(err.to_string())));
            }
        };

        let mut account =
            LinkedAccount::from_tokens(owner_id, platform, token, self.clock.now_millis());
        self.attach_identity(&mut account).await;

        let stored = match self.link_account(account).await {
            Ok(stored) => stored,
            Err(err) => return Err(self.fail(Some(platform), err)),
        };

        state = LoginState::Linked;
        info!(
            state = state.label(),
            %platform,
            owner_id,
            account_id = %stored.id,
            provider_user_id = stored.provider_user_id.as_deref().unwrap_or("-"),
            "account linked"
        );
        metrics::counter!("broker_logins_total", "platform" => platform.as_str(), "outcome" => "linked")
            .increment(1);
        Ok(stored)
    }

    /// Store a freshly exchanged account.
    ///
    /// A re-link of an existing record happens under that record's refresh
    /// lock, so an in-flight refresh cannot write its stale token (or a
    /// `RelinkRequired` mark) over the new one afterwards. The handle built
    /// from the replaced token is dropped before the lock is released.
    async fn link_account(&self, mut account: LinkedAccount) -> Result<LinkedAccount> {
        let platform = account.platform;
        let Some(previous) = self.relink_target(&mut account).await? else {
            return self.store.upsert_account(account).await.map_err(Error::store);
        };

        let lock = self.refresh_lock(&previous.id).await;
        let _guard = lock.lock().await;

        // Re-read: a refresh may have rotated the token while we waited.
        let replaced = self
            .store
            .account_by_id(&previous.id)
            .await
            .map_err(Error::store)?
            .map(|current| current.access_token);
        let stored = self
            .store
            .upsert_account(account)
            .await
            .map_err(Error::store)?;
        if let Some(old) = replaced.filter(|old| *old != stored.access_token) {
            self.pool.invalidate(&fingerprint(platform, &old)).await;
        }
        debug!(%platform, account_id = %stored.id, "re-linked existing account");
        Ok(stored)
    }

    /// Existing record this login replaces, if any.
    ///
    /// Without a provider identity the latest record for (owner, platform)
    /// is taken over, and its identity copied, rather than stored beside it.
    async fn relink_target(&self, account: &mut LinkedAccount) -> Result<Option<LinkedAccount>> {
        if account.provider_user_id.is_none() {
            let latest = self
                .store
                .get_account(&account.owner_id, account.platform)
                .await
                .map_err(Error::store)?;
            if let Some(latest) = &latest {
                warn!(
                    platform = %account.platform,
                    owner_id = %account.owner_id,
                    account_id = %latest.id,
                    "identity unknown, re-linking over the existing account"
                );
                account.provider_user_id = latest.provider_user_id.clone();
                if account.username.is_none() {
                    account.username = latest.username.clone();
                }
            }
            return Ok(latest);
        }

        let owned = self
            .store
            .list_accounts(&account.owner_id)
            .await
            .map_err(Error::store)?;
        Ok(owned.into_iter().find(|existing| existing.same_identity(account)))
    }

    /// Fill in provider identity. Failures keep the tokens and leave the
    /// identity empty.
    async fn attach_identity(&self, account: &mut LinkedAccount) {
        let platform = account.platform;
        let client = match self.client_for(platform, &account.access_token).await {
            Ok(client) => client,
            Err(err) => {
                warn!(%platform, error = %err, "could not build client for identity fetch");
                return;
            }
        };
        match client.identity().await {
            Ok(identity) => {
                account.provider_user_id = Some(identity.id);
                account.username = identity.username;
            }
            Err(err) => {
                warn!(%platform, error = %err, "identity fetch failed, linking without identity");
            }
        }
    }

    fn fail(&self, platform: Option<Platform>, err: Error) -> Error {
        let label = platform.map(Platform::as_str).unwrap_or("unknown");
        warn!(
            state = LoginState::Failed.label(),
            platform = label,
            kind = err.kind(),
            error = %err,
            "login failed"
        );
        metrics::counter!("broker_logins_total", "platform" => label, "outcome" => err.kind())
            .increment(1);
        err
    }
}
