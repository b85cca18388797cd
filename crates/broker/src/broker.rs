//! Broker facade
//!
//! `Broker` owns every piece of in-memory state (pending sessions, pooled
//! clients, per-account refresh locks) plus the collaborators it calls out
//! to (account store, client factory, token endpoint HTTP client, clock).
//! There are no globals; the service wraps one `Broker` in an `Arc`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use client_pool::{ClientPool, Fingerprint};
use common::{Clock, Secret, SystemClock};
use oauth::{
    AccountStore, AccountSummary, AuthorizationLink, DEFAULT_SESSION_TTL, Entropy, OsEntropy,
    ProviderSettings, SessionRegistry, build_authorization_url,
};
use platform::{AuthKind, ErrorClassification, Platform, PlatformClient, classify_status};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::factory::{ClientFactory, HttpClientFactory};

/// Default margin before expiry at which tokens are refreshed.
pub const DEFAULT_REFRESH_SKEW: Duration = Duration::from_secs(60);

/// Default time an unused pooled client is kept.
pub const DEFAULT_CLIENT_MAX_IDLE: Duration = Duration::from_secs(30 * 60);

/// Timing knobs for the broker.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub session_ttl: Duration,
    pub refresh_skew: Duration,
    pub client_max_idle: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            session_ttl: DEFAULT_SESSION_TTL,
            refresh_skew: DEFAULT_REFRESH_SKEW,
            client_max_idle: DEFAULT_CLIENT_MAX_IDLE,
        }
    }
}

/// A configured bot identity for a bot-token platform.
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub platform: Platform,
    pub token: Secret<String>,
    pub api_base: String,
}

impl BotSettings {
    pub fn telegram(token: Secret<String>) -> Self {
        Self {
            platform: Platform::Telegram,
            token,
            api_base: platform::endpoints::TELEGRAM_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }

    fn validate(&self) -> Result<()> {
        if self.platform.auth_kind() != AuthKind::BotToken {
            return Err(Error::Configuration(format!(
                "{} does not use bot tokens",
                self.platform
            )));
        }
        if self.token.is_blank() {
            return Err(Error::Configuration(format!(
                "{}: bot token is empty",
                self.platform
            )));
        }
        Ok(())
    }
}

/// Injectable collaborators. `BrokerParts::system()` wires the real ones.
pub struct BrokerParts {
    pub clock: Arc<dyn Clock>,
    pub entropy: Arc<dyn Entropy>,
    pub factory: Arc<dyn ClientFactory>,
    /// Client for token endpoint calls.
    pub http: reqwest::Client,
}

impl BrokerParts {
    pub fn system() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(platform::endpoints::USER_AGENT)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            clock: Arc::new(SystemClock),
            entropy: Arc::new(OsEntropy),
            factory: Arc::new(HttpClientFactory),
            http,
        })
    }
}

/// Returned by `start_login`. The verifier stays inside the broker.
#[derive(Debug, Clone, Serialize)]
pub struct LoginStart {
    pub authorization_url: String,
    pub state: String,
}

/// Snapshot for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Every known platform and whether it is configured.
    pub platforms: BTreeMap<Platform, bool>,
    pub pending_sessions: usize,
    pub pooled_clients: usize,
}

pub struct Broker {
    pub(crate) config: BrokerConfig,
    pub(crate) providers: HashMap<Platform, ProviderSettings>,
    pub(crate) bots: HashMap<Platform, BotSettings>,
    pub(crate) sessions: SessionRegistry,
    pub(crate) store: Arc<dyn AccountStore>,
    pub(crate) pool: ClientPool<PlatformClient>,
    pub(crate) factory: Arc<dyn ClientFactory>,
    pub(crate) http: reqwest::Client,
    pub(crate) clock: Arc<dyn Clock>,
    /// One lock per account id so concurrent callers refresh once.
    pub(crate) refresh_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Broker {
    /// Build a broker with system clock, OS entropy and HTTP client factory.
    pub fn new(
        config: BrokerConfig,
        providers: Vec<ProviderSettings>,
        bots: Vec<BotSettings>,
        store: Arc<dyn AccountStore>,
    ) -> Result<Self> {
        Self::with_parts(config, providers, bots, store, BrokerParts::system()?)
    }

    /// Build a broker with explicit collaborators.
    ///
    /// Every provider and bot is validated here so misconfiguration fails at
    /// startup rather than mid-login.
    pub fn with_parts(
        config: BrokerConfig,
        providers: Vec<ProviderSettings>,
        bots: Vec<BotSettings>,
        store: Arc<dyn AccountStore>,
        parts: BrokerParts,
    ) -> Result<Self> {
        let mut provider_map = HashMap::new();
        for settings in providers {
            settings
                .validate()
                .map_err(|e| Error::Configuration(e.to_string()))?;
            let platform = settings.platform;
            if provider_map.insert(platform, settings).is_some() {
                return Err(Error::Configuration(format!(
                    "{platform} is configured more than once"
                )));
            }
        }

        let mut bot_map = HashMap::new();
        for bot in bots {
            bot.validate()?;
            let platform = bot.platform;
            if bot_map.insert(platform, bot).is_some() {
                return Err(Error::Configuration(format!(
                    "{platform} bot is configured more than once"
                )));
            }
        }

        info!(
            providers = provider_map.len(),
            bots = bot_map.len(),
            session_ttl_secs = config.session_ttl.as_secs(),
            "broker initialized"
        );

        Ok(Self {
            sessions: SessionRegistry::new(config.session_ttl, parts.clock.clone(), parts.entropy),
            pool: ClientPool::new(parts.clock.clone()),
            config,
            providers: provider_map,
            bots: bot_map,
            store,
            factory: parts.factory,
            http: parts.http,
            clock: parts.clock,
            refresh_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Whether `platform` can be used (OAuth settings or a bot token present).
    pub fn is_configured(&self, platform: Platform) -> bool {
        self.providers.contains_key(&platform) || self.bots.contains_key(&platform)
    }

    pub(crate) fn provider(&self, platform: Platform) -> Result<&ProviderSettings> {
        self.providers.get(&platform).ok_or_else(|| {
            if platform.auth_kind() == AuthKind::BotToken {
                Error::Configuration(format!("{platform} uses bot tokens, not OAuth login"))
            } else {
                Error::Configuration(format!("{platform} is not configured"))
            }
        })
    }

    /// Create a pending session and its authorization URL.
    ///
    /// The returned link carries the verifier; only in-process callers that
    /// hold their own session state should use this. HTTP callers get
    /// `start_login`.
    pub async fn build_link(&self, owner_id: &str, platform: Platform) -> Result<AuthorizationLink> {
        let settings = self.provider(platform)?;
        let session = self.sessions.create(owner_id, platform).await;
        let url = build_authorization_url(settings, &session)
            .map_err(|e| Error::Configuration(e.to_string()))?;
        Ok(AuthorizationLink {
            url,
            state: session.state,
            code_verifier: session.code_verifier,
        })
    }

    /// Begin a login for `owner_id` on `platform`.
    pub async fn start_login(&self, owner_id: &str, platform: Platform) -> Result<LoginStart> {
        let link = self.build_link(owner_id, platform).await?;
        info!(%platform, owner_id, "login started");
        metrics::counter!("broker_logins_started_total", "platform" => platform.as_str())
            .increment(1);
        Ok(LoginStart {
            authorization_url: link.url,
            state: link.state,
        })
    }

    /// Ready client for the owner's linked account on `platform`.
    ///
    /// Refreshes the token first if it is near expiry. For bot-token
    /// platforms the configured bot identity is returned instead.
    pub async fn get_client(&self, owner_id: &str, platform: Platform) -> Result<PlatformClient> {
        if platform.auth_kind() == AuthKind::BotToken {
            let bot = self.bots.get(&platform).ok_or_else(|| {
                Error::Configuration(format!("{platform} bot token is not configured"))
            })?;
            return self.bot_client(platform, &bot.token).await;
        }

        let account = self
            .store
            .get_account(owner_id, platform)
            .await
            .map_err(Error::store)?
            .ok_or(Error::AccountNotFound(platform))?;
        let account = self.ensure_fresh(account).await?;
        self.client_for(platform, &account.access_token).await
    }

    /// Pooled client for an arbitrary bot token.
    pub async fn bot_client(
        &self,
        platform: Platform,
        token: &Secret<String>,
    ) -> Result<PlatformClient> {
        if platform.auth_kind() != AuthKind::BotToken {
            return Err(Error::Configuration(format!(
                "{platform} does not use bot tokens"
            )));
        }
        self.client_for(platform, token.expose()).await
    }

    /// Acquire the pooled handle for `credential`, building it on a cold key.
    pub(crate) async fn client_for(
        &self,
        platform: Platform,
        credential: &str,
    ) -> Result<PlatformClient> {
        let api_base = self.api_base(platform)?;
        let key = fingerprint(platform, credential);
        let factory = self.factory.clone();
        let credential = Secret::new(credential.to_string());
        let client = self
            .pool
            .acquire(&key, || async move {
                let client = factory.build(platform, &api_base, credential).await?;
                metrics::counter!("broker_pool_constructions_total", "platform" => platform.as_str())
                    .increment(1);
                Ok::<_, platform::ClientError>(client)
            })
            .await?;
        Ok(client)
    }

    fn api_base(&self, platform: Platform) -> Result<String> {
        if let Some(settings) = self.providers.get(&platform) {
            return Ok(settings.api_base.clone());
        }
        if let Some(bot) = self.bots.get(&platform) {
            return Ok(bot.api_base.clone());
        }
        match platform.auth_kind() {
            AuthKind::BotToken => Ok(platform.api_base().to_string()),
            AuthKind::OAuth => Err(Error::Configuration(format!("{platform} is not configured"))),
        }
    }

    /// Unlink the owner's account on `platform` and drop its pooled client.
    pub async fn disconnect(&self, owner_id: &str, platform: Platform) -> Result<AccountSummary> {
        let account = self
            .store
            .get_account(owner_id, platform)
            .await
            .map_err(Error::store)?
            .ok_or(Error::AccountNotFound(platform))?;

        let lock = self.refresh_lock(&account.id).await;
        let _guard = lock.lock().await;

        // Re-read under the lock: a refresh may have rotated the token.
        let current = self
            .store
            .account_by_id(&account.id)
            .await
            .map_err(Error::store)?
            .unwrap_or(account);
        self.store
            .delete_account(&current.id)
            .await
            .map_err(Error::store)?;
        self.pool
            .invalidate(&fingerprint(platform, &current.access_token))
            .await;
        self.refresh_locks.lock().await.remove(&current.id);

        info!(%platform, owner_id, account_id = %current.id, "account disconnected");
        Ok(current.summary())
    }

    /// Linked accounts for an owner, without credentials.
    pub async fn list_accounts(&self, owner_id: &str) -> Result<Vec<AccountSummary>> {
        let accounts = self
            .store
            .list_accounts(owner_id)
            .await
            .map_err(Error::store)?;
        Ok(accounts.iter().map(|a| a.summary()).collect())
    }

    /// Classify a failed platform call made with `client`.
    ///
    /// Permanent auth failures drop the handle so the next `get_client`
    /// rebuilds (and, for OAuth accounts, refreshes) instead of reusing a
    /// credential the platform no longer accepts.
    pub async fn report_client_error(
        &self,
        client: &PlatformClient,
        status: u16,
    ) -> ErrorClassification {
        let platform = client.platform();
        let classification =
            classify_status(status, platform.auth_kind() == AuthKind::BotToken);
        if classification == ErrorClassification::Permanent {
            let key = fingerprint(platform, client.credential().expose());
            if self.pool.invalidate(&key).await {
                warn!(%platform, fingerprint = %key, status, "dropped pooled client after auth failure");
            }
        } else {
            debug!(%platform, status, ?classification, "platform call failed");
        }
        classification
    }

    pub async fn evict_expired_sessions(&self) -> usize {
        self.sessions.evict_expired().await
    }

    pub async fn evict_idle_clients(&self) -> usize {
        self.pool.evict_idle(self.config.client_max_idle).await
    }

    pub async fn health(&self) -> HealthReport {
        HealthReport {
            platforms: Platform::ALL
                .iter()
                .map(|p| (*p, self.is_configured(*p)))
                .collect(),
            pending_sessions: self.sessions.len().await,
            pooled_clients: self.pool.len().await,
        }
    }

    pub(crate) async fn refresh_lock(&self, account_id: &str) -> Arc<Mutex<()>> {
        self.refresh_locks
            .lock()
            .await
            .entry(account_id.to_string())
            .or_default()
            .clone()
    }
}

/// Pool key for a platform credential.
pub(crate) fn fingerprint(platform: Platform, credential: &str) -> Fingerprint {
    Fingerprint::of(platform.as_str(), credential)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::factory::tests::CountingFactory;
    use common::ManualClock;
    use oauth::{LinkedAccount, MemoryAccountStore, TokenResponse};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Start of the test clock (2024-01-01T00:00:00Z).
    pub(crate) const T0: u64 = 1_704_067_200_000;

    pub(crate) struct Harness {
        pub(crate) broker: Arc<Broker>,
        pub(crate) clock: Arc<ManualClock>,
        pub(crate) store: Arc<MemoryAccountStore>,
        pub(crate) factory: Arc<CountingFactory>,
    }

    pub(crate) fn twitter_settings(server: &MockServer) -> ProviderSettings {
        ProviderSettings::for_platform(
            Platform::Twitter,
            "client-123",
            Some(Secret::from("shh")),
            "https://app.example/oauth/callback",
        )
        .unwrap()
        .with_authorize_url("https://auth.example/i/oauth2/authorize")
        .with_token_url(format!("{}/oauth/token", server.uri()))
        .with_api_base(server.uri())
    }

    pub(crate) fn harness(server: &MockServer) -> Harness {
        harness_with(vec![twitter_settings(server)], vec![])
    }

    pub(crate) fn harness_with(providers: Vec<ProviderSettings>, bots: Vec<BotSettings>) -> Harness {
        let clock = Arc::new(ManualClock::new(T0));
        let store = Arc::new(MemoryAccountStore::new());
        let factory = Arc::new(CountingFactory::default());
        let parts = BrokerParts {
            clock: clock.clone(),
            entropy: Arc::new(OsEntropy),
            factory: factory.clone(),
            http: reqwest::Client::new(),
        };
        let broker = Broker::with_parts(
            BrokerConfig::default(),
            providers,
            bots,
            store.clone(),
            parts,
        )
        .unwrap();
        Harness {
            broker: Arc::new(broker),
            clock,
            store,
            factory,
        }
    }

    /// Store an account for `owner` whose token expires `expires_in` seconds from now.
    pub(crate) async fn seed_account(h: &Harness, owner: &str, expires_in: u64) -> LinkedAccount {
        let token = TokenResponse {
            access_token: format!("at_{owner}"),
            refresh_token: Some(format!("rt_{owner}")),
            expires_in: Some(expires_in),
            scope: None,
            token_type: Some("bearer".into()),
        };
        let mut account =
            LinkedAccount::from_tokens(owner, Platform::Twitter, token, h.clock.now_millis());
        account.provider_user_id = Some(format!("uid_{owner}"));
        h.store.upsert_account(account).await.unwrap()
    }

    #[tokio::test]
    async fn rejects_invalid_provider_settings() {
        let server = MockServer::start().await;
        let mut settings = twitter_settings(&server);
        settings.client_secret = None;

        let result = Broker::new(
            BrokerConfig::default(),
            vec![settings],
            vec![],
            Arc::new(MemoryAccountStore::new()),
        );
        assert!(matches!(result, Err(Error::Configuration(msg)) if msg.contains("client secret")));
    }

    #[tokio::test]
    async fn rejects_duplicate_platforms() {
        let server = MockServer::start().await;
        let result = Broker::new(
            BrokerConfig::default(),
            vec![twitter_settings(&server), twitter_settings(&server)],
            vec![],
            Arc::new(MemoryAccountStore::new()),
        );
        assert!(matches!(result, Err(Error::Configuration(msg)) if msg.contains("more than once")));
    }

    #[tokio::test]
    async fn rejects_blank_bot_token() {
        let result = Broker::new(
            BrokerConfig::default(),
            vec![],
            vec![BotSettings::telegram(Secret::from(""))],
            Arc::new(MemoryAccountStore::new()),
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn start_login_returns_pkce_url_and_registers_session() {
        let server = MockServer::start().await;
        let h = harness(&server);

        let start = h.broker.start_login("owner-1", Platform::Twitter).await.unwrap();
        let url = url::Url::parse(&start.authorization_url).unwrap();
        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("auth.example"));
        assert_eq!(query["state"], start.state);
        assert_eq!(query["client_id"], "client-123");
        assert_eq!(query["code_challenge_method"], "S256");
        assert_eq!(query["response_type"], "code");
        assert!(query["scope"].contains("offline.access"));
        assert!(!start.authorization_url.contains("code_verifier"));
        assert_eq!(h.broker.health().await.pending_sessions, 1);
    }

    #[tokio::test]
    async fn start_login_for_unconfigured_platform_fails() {
        let server = MockServer::start().await;
        let h = harness(&server);

        let err = h.broker.start_login("o", Platform::Discord).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let err = h.broker.start_login("o", Platform::Telegram).await.unwrap_err();
        assert!(err.to_string().contains("bot tokens"));
    }

    #[tokio::test]
    async fn get_client_without_account_is_not_found() {
        let server = MockServer::start().await;
        let h = harness(&server);

        let err = h.broker.get_client("nobody", Platform::Twitter).await.unwrap_err();
        assert!(matches!(err, Error::AccountNotFound(Platform::Twitter)));
    }

    #[tokio::test]
    async fn get_client_reuses_pooled_handle() {
        let server = MockServer::start().await;
        let h = harness(&server);
        seed_account(&h, "alice", 3600).await;

        let a = h.broker.get_client("alice", Platform::Twitter).await.unwrap();
        let b = h.broker.get_client("alice", Platform::Twitter).await.unwrap();
        assert_eq!(a.credential().expose(), "at_alice");
        assert_eq!(b.credential().expose(), "at_alice");
        assert_eq!(h.factory.count(), 1);
    }

    #[tokio::test]
    async fn client_construction_failure_is_not_cached() {
        let server = MockServer::start().await;
        let h = harness(&server);
        seed_account(&h, "alice", 3600).await;

        h.factory.fail.store(true, std::sync::atomic::Ordering::SeqCst);
        let err = h.broker.get_client("alice", Platform::Twitter).await.unwrap_err();
        assert!(matches!(err, Error::ClientConstruction(_)));
        assert!(!err.to_string().contains("at_alice"));

        h.factory.fail.store(false, std::sync::atomic::Ordering::SeqCst);
        h.broker.get_client("alice", Platform::Twitter).await.unwrap();
        assert_eq!(h.factory.count(), 2);
    }

    #[tokio::test]
    async fn bot_clients_are_pooled_per_token() {
        let h = harness_with(
            vec![],
            vec![BotSettings::telegram(Secret::from("123:default"))],
        );

        let default = h.broker.get_client("anyone", Platform::Telegram).await.unwrap();
        assert_eq!(default.credential().expose(), "123:default");

        let other = h
            .broker
            .bot_client(Platform::Telegram, &Secret::from("456:other"))
            .await
            .unwrap();
        let again = h
            .broker
            .bot_client(Platform::Telegram, &Secret::from("456:other"))
            .await
            .unwrap();
        assert_eq!(other.credential().expose(), again.credential().expose());
        assert_eq!(h.factory.count(), 2);

        let err = h
            .broker
            .bot_client(Platform::Discord, &Secret::from("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn permanent_client_error_drops_handle() {
        let server = MockServer::start().await;
        let h = harness(&server);
        seed_account(&h, "alice", 3600).await;

        let client = h.broker.get_client("alice", Platform::Twitter).await.unwrap();
        assert_eq!(
            h.broker.report_client_error(&client, 429).await,
            ErrorClassification::RateLimited
        );
        h.broker.get_client("alice", Platform::Twitter).await.unwrap();
        assert_eq!(h.factory.count(), 1);

        assert_eq!(
            h.broker.report_client_error(&client, 401).await,
            ErrorClassification::Permanent
        );
        h.broker.get_client("alice", Platform::Twitter).await.unwrap();
        assert_eq!(h.factory.count(), 2);
    }

    #[tokio::test]
    async fn disconnect_deletes_account_and_handle() {
        let server = MockServer::start().await;
        let h = harness(&server);
        let account = seed_account(&h, "alice", 3600).await;
        h.broker.get_client("alice", Platform::Twitter).await.unwrap();

        let summary = h.broker.disconnect("alice", Platform::Twitter).await.unwrap();
        assert_eq!(summary.id, account.id);
        assert!(h.store.is_empty().await);
        assert_eq!(h.broker.health().await.pooled_clients, 0);

        let err = h.broker.disconnect("alice", Platform::Twitter).await.unwrap_err();
        assert!(matches!(err, Error::AccountNotFound(_)));
    }

    #[tokio::test]
    async fn list_accounts_hides_tokens() {
        let server = MockServer::start().await;
        let h = harness(&server);
        seed_account(&h, "alice", 3600).await;
        seed_account(&h, "bob", 3600).await;

        let accounts = h.broker.list_accounts("alice").await.unwrap();
        assert_eq!(accounts.len(), 1);
        let json = serde_json::to_string(&accounts).unwrap();
        assert!(json.contains("uid_alice"));
        assert!(!json.contains("at_alice"));
        assert!(!json.contains("rt_alice"));
    }

    #[tokio::test]
    async fn idle_clients_are_evicted() {
        let server = MockServer::start().await;
        let h = harness(&server);
        seed_account(&h, "alice", 7200).await;
        h.broker.get_client("alice", Platform::Twitter).await.unwrap();

        h.clock.advance(Duration::from_secs(29 * 60));
        assert_eq!(h.broker.evict_idle_clients().await, 0);
        h.clock.advance(Duration::from_secs(2 * 60));
        assert_eq!(h.broker.evict_idle_clients().await, 1);
    }

    #[tokio::test]
    async fn health_reports_configured_platforms() {
        let server = MockServer::start().await;
        let h = harness_with(
            vec![twitter_settings(&server)],
            vec![BotSettings::telegram(Secret::from("123:abc"))],
        );
        h.broker.start_login("o", Platform::Twitter).await.unwrap();

        let health = h.broker.health().await;
        assert_eq!(health.platforms[&Platform::Twitter], true);
        assert_eq!(health.platforms[&Platform::Telegram], true);
        assert_eq!(health.platforms[&Platform::Reddit], false);
        assert_eq!(health.pending_sessions, 1);

        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["platforms"]["discord"], false);
    }

    #[tokio::test]
    async fn identity_endpoint_is_reachable_through_pooled_client() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": {"id": "42", "username": "alice"}})),
            )
            .mount(&server)
            .await;
        let h = harness(&server);
        seed_account(&h, "alice", 3600).await;

        let client = h.broker.get_client("alice", Platform::Twitter).await.unwrap();
        assert_eq!(client.identity().await.unwrap().id, "42");
    }
}
