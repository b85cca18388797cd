//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Client secrets and bot tokens are loaded from `<PLATFORM>_CLIENT_SECRET` /
//! `TELEGRAM_BOT_TOKEN` env vars or a `*_file` path, never stored in the
//! TOML directly to avoid leaking secrets.

use broker::{BotSettings, BrokerConfig};
use common::Secret;
use oauth::ProviderSettings;
use platform::Platform;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub broker: BrokerSection,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Where browser callbacks are redirected. Without it callbacks answer JSON.
    #[serde(default)]
    pub frontend_url: Option<String>,
}

/// Broker timing and persistence
#[derive(Debug, Deserialize)]
pub struct BrokerSection {
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_refresh_skew")]
    pub refresh_skew_secs: u64,
    #[serde(default = "default_client_max_idle")]
    pub client_max_idle_secs: u64,
    #[serde(default = "default_maintenance_interval")]
    pub maintenance_interval_secs: u64,
    #[serde(default = "default_accounts_path")]
    pub accounts_path: PathBuf,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl(),
            refresh_skew_secs: default_refresh_skew(),
            client_max_idle_secs: default_client_max_idle(),
            maintenance_interval_secs: default_maintenance_interval(),
            accounts_path: default_accounts_path(),
        }
    }
}

/// Per-platform sections; a platform without a section is disabled.
#[derive(Debug, Default, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub twitter: Option<OAuthProviderConfig>,
    #[serde(default)]
    pub reddit: Option<OAuthProviderConfig>,
    #[serde(default)]
    pub discord: Option<OAuthProviderConfig>,
    #[serde(default)]
    pub telegram: Option<BotConfig>,
}

/// OAuth client registration for one platform
#[derive(Debug, Deserialize)]
pub struct OAuthProviderConfig {
    pub client_id: String,
    pub redirect_uri: String,
    /// Overrides the platform's default scopes
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
    #[serde(default)]
    pub authorize_url: Option<String>,
    #[serde(default)]
    pub token_url: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    /// Path to a file containing the client secret (alternative to the env var)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
}

/// Default bot identity for a bot-token platform
#[derive(Debug, Deserialize)]
pub struct BotConfig {
    /// Path to a file containing the bot token (alternative to the env var)
    #[serde(default)]
    pub bot_token_file: Option<PathBuf>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(skip)]
    pub bot_token: Option<Secret<String>>,
}

fn default_max_connections() -> usize {
    1000
}

fn default_session_ttl() -> u64 {
    600
}

fn default_refresh_skew() -> u64 {
    60
}

fn default_client_max_idle() -> u64 {
    1800
}

fn default_maintenance_interval() -> u64 {
    60
}

fn default_accounts_path() -> PathBuf {
    PathBuf::from("accounts.json")
}

impl Config {
    /// Load configuration from a TOML file, then overlay secrets from the
    /// environment or secret files.
    ///
    /// Secret resolution order per platform:
    /// 1. `<PLATFORM>_CLIENT_SECRET` / `TELEGRAM_BOT_TOKEN` env var
    /// 2. `client_secret_file` / `bot_token_file` path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if config.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }
        if let Some(url) = &config.server.frontend_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "frontend_url must start with http:// or https://, got: {url}"
                )));
            }
        }
        for (name, value) in [
            ("session_ttl_secs", config.broker.session_ttl_secs),
            ("client_max_idle_secs", config.broker.client_max_idle_secs),
            (
                "maintenance_interval_secs",
                config.broker.maintenance_interval_secs,
            ),
        ] {
            if value == 0 {
                return Err(common::Error::Config(format!(
                    "{name} must be greater than 0"
                )));
            }
        }

        for (platform, section) in config.providers.oauth_sections_mut() {
            section.client_secret = resolve_secret(
                platform.secret_env_var(),
                section.client_secret_file.as_deref(),
            )?;
            if section.client_secret.is_none() {
                return Err(common::Error::Config(format!(
                    "{platform}: set {} or client_secret_file",
                    platform.secret_env_var()
                )));
            }
        }
        if let Some(bot) = config.providers.telegram.as_mut() {
            bot.bot_token = resolve_secret(
                Platform::Telegram.secret_env_var(),
                bot.bot_token_file.as_deref(),
            )?;
            if bot.bot_token.is_none() {
                return Err(common::Error::Config(format!(
                    "telegram: set {} or bot_token_file",
                    Platform::Telegram.secret_env_var()
                )));
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("link-broker.toml")
    }

    pub fn broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            session_ttl: Duration::from_secs(self.broker.session_ttl_secs),
            refresh_skew: Duration::from_secs(self.broker.refresh_skew_secs),
            client_max_idle: Duration::from_secs(self.broker.client_max_idle_secs),
        }
    }

    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_secs(self.broker.maintenance_interval_secs)
    }

    /// OAuth settings for every configured platform.
    pub fn provider_settings(&self) -> common::Result<Vec<ProviderSettings>> {
        let mut settings = Vec::new();
        for (platform, section) in self.providers.oauth_sections() {
            let mut s = ProviderSettings::for_platform(
                platform,
                section.client_id.clone(),
                section.client_secret.clone(),
                section.redirect_uri.clone(),
            )
            .map_err(|e| common::Error::Config(e.to_string()))?;
            if let Some(scopes) = &section.scopes {
                s = s.with_scopes(scopes.clone());
            }
            if let Some(url) = &section.authorize_url {
                s = s.with_authorize_url(url.clone());
            }
            if let Some(url) = &section.token_url {
                s = s.with_token_url(url.clone());
            }
            if let Some(url) = &section.api_base {
                s = s.with_api_base(url.clone());
            }
            settings.push(s);
        }
        Ok(settings)
    }

    /// Default bot identities.
    pub fn bot_settings(&self) -> Vec<BotSettings> {
        let Some(bot) = &self.providers.telegram else {
            return Vec::new();
        };
        let Some(token) = &bot.bot_token else {
            return Vec::new();
        };
        let settings = BotSettings::telegram(token.clone());
        match &bot.api_base {
            Some(url) => vec![settings.with_api_base(url.clone())],
            None => vec![settings],
        }
    }
}

impl ProvidersConfig {
    fn oauth_sections(&self) -> impl Iterator<Item = (Platform, &OAuthProviderConfig)> {
        [
            (Platform::Twitter, self.twitter.as_ref()),
            (Platform::Reddit, self.reddit.as_ref()),
            (Platform::Discord, self.discord.as_ref()),
        ]
        .into_iter()
        .filter_map(|(p, s)| s.map(|s| (p, s)))
    }

    fn oauth_sections_mut(&mut self) -> impl Iterator<Item = (Platform, &mut OAuthProviderConfig)> {
        [
            (Platform::Twitter, self.twitter.as_mut()),
            (Platform::Reddit, self.reddit.as_mut()),
            (Platform::Discord, self.discord.as_mut()),
        ]
        .into_iter()
        .filter_map(|(p, s)| s.map(|s| (p, s)))
    }
}

/// Env var wins over file; blank values count as unset.
fn resolve_secret(env_var: &str, file: Option<&Path>) -> common::Result<Option<Secret<String>>> {
    if let Ok(value) = std::env::var(env_var) {
        if !value.trim().is_empty() {
            return Ok(Some(Secret::new(value.trim().to_owned())));
        }
    }
    let Some(file) = file else {
        return Ok(None);
    };
    let value = std::fs::read_to_string(file).map_err(|e| {
        common::Error::Config(format!(
            "failed to read secret file {}: {e}",
            file.display()
        ))
    })?;
    let value = value.trim().to_owned();
    if value.is_empty() {
        return Ok(None);
    }
    Ok(Some(Secret::new(value)))
}
