//! Platform catalogue and client handles for linked social accounts
//!
//! `Platform` is the closed set of third-party platforms the broker can link.
//! Each variant carries its own endpoint table, so adding a platform is a
//! compile-time exhaustive change rather than a string switch. `PlatformClient`
//! is the ready-to-call handle the client pool caches per credential.

pub mod classify;
pub mod client;
pub mod endpoints;

pub use classify::classify_status;
pub use client::{ClientError, Identity, PlatformClient};
pub use endpoints::{OAuthEndpoints, TokenAuth};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a platform authenticates follow-up calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    /// Three-legged OAuth2 authorization code + PKCE, bearer access token.
    OAuth,
    /// Long-lived bot token issued out of band (no login flow).
    BotToken,
}

/// Supported third-party platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Reddit,
    Discord,
    Telegram,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Twitter,
        Platform::Reddit,
        Platform::Discord,
        Platform::Telegram,
    ];

    /// Lowercase identifier used in config keys, routes, logs and metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Reddit => "reddit",
            Platform::Discord => "discord",
            Platform::Telegram => "telegram",
        }
    }

    pub fn auth_kind(self) -> AuthKind {
        match self {
            Platform::Twitter | Platform::Reddit | Platform::Discord => AuthKind::OAuth,
            Platform::Telegram => AuthKind::BotToken,
        }
    }

    /// Default OAuth endpoints, `None` for bot-token platforms.
    pub fn oauth_endpoints(self) -> Option<&'static OAuthEndpoints> {
        match self {
            Platform::Twitter => Some(&endpoints::TWITTER),
            Platform::Reddit => Some(&endpoints::REDDIT),
            Platform::Discord => Some(&endpoints::DISCORD),
            Platform::Telegram => None,
        }
    }

    /// Base URL for authorized API calls made through a `PlatformClient`.
    pub fn api_base(self) -> &'static str {
        match self {
            Platform::Twitter => endpoints::TWITTER.api_base,
            Platform::Reddit => endpoints::REDDIT.api_base,
            Platform::Discord => endpoints::DISCORD.api_base,
            Platform::Telegram => endpoints::TELEGRAM_API_BASE,
        }
    }

    /// Environment variable holding this platform's client secret or bot token.
    pub fn secret_env_var(self) -> &'static str {
        match self {
            Platform::Twitter => "TWITTER_CLIENT_SECRET",
            Platform::Reddit => "REDDIT_CLIENT_SECRET",
            Platform::Discord => "DISCORD_CLIENT_SECRET",
            Platform::Telegram => "TELEGRAM_BOT_TOKEN",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized platform names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown platform: {0}")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "twitter" | "x" => Ok(Platform::Twitter),
            "reddit" => Ok(Platform::Reddit),
            "discord" => Ok(Platform::Discord),
            "telegram" => Ok(Platform::Telegram),
            other => Err(UnknownPlatform(other.to_string())),
        }
    }
}

/// Classification of an HTTP failure from a platform API.
///
/// Drives what the broker does with the pooled handle that made the call:
/// - Permanent invalidates the handle (credential rejected)
/// - RateLimited and Transient leave the handle cached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClassification {
    /// Retryable on the same credential (timeouts, 5xx)
    Transient,
    /// Platform throttling, credential still valid
    RateLimited,
    /// Credential rejected (401/403), handle must be rebuilt
    Permanent,
}
