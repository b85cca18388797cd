//! Per-platform OAuth endpoint table
//!
//! Public endpoint configuration for each OAuth platform. None of these
//! values are secrets; client ids and secrets come from configuration.

/// How client credentials are presented to a token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAuth {
    /// `Authorization: Basic base64(client_id:client_secret)`
    Basic,
    /// `client_id` and `client_secret` as form fields
    Form,
}

/// Static OAuth configuration for one platform.
#[derive(Debug)]
pub struct OAuthEndpoints {
    pub authorize_url: &'static str,
    pub token_url: &'static str,
    /// Base URL for authorized API calls
    pub api_base: &'static str,
    /// Path under `api_base` returning the authorizing user's identity
    pub identity_path: &'static str,
    pub default_scopes: &'static [&'static str],
    pub token_auth: TokenAuth,
    /// Additional authorization query parameters the platform requires
    pub extra_authorize_params: &'static [(&'static str, &'static str)],
}

/// Twitter/X OAuth 2.0. `offline.access` is required to receive a refresh token.
pub static TWITTER: OAuthEndpoints = OAuthEndpoints {
    authorize_url: "https://twitter.com/i/oauth2/authorize",
    token_url: "https://api.twitter.com/2/oauth2/token",
    api_base: "https://api.twitter.com",
    identity_path: "/2/users/me",
    default_scopes: &[
        "tweet.read",
        "tweet.write",
        "users.read",
        "follows.read",
        "follows.write",
        "offline.access",
    ],
    token_auth: TokenAuth::Basic,
    extra_authorize_params: &[],
};

/// Reddit. Refresh tokens are only issued for `duration=permanent` grants.
pub static REDDIT: OAuthEndpoints = OAuthEndpoints {
    authorize_url: "https://www.reddit.com/api/v1/authorize",
    token_url: "https://www.reddit.com/api/v1/access_token",
    api_base: "https://oauth.reddit.com",
    identity_path: "/api/v1/me",
    default_scopes: &["identity", "edit", "submit", "read", "history"],
    token_auth: TokenAuth::Basic,
    extra_authorize_params: &[("duration", "permanent")],
};

pub static DISCORD: OAuthEndpoints = OAuthEndpoints {
    authorize_url: "https://discord.com/oauth2/authorize",
    token_url: "https://discord.com/api/oauth2/token",
    api_base: "https://discord.com/api",
    identity_path: "/users/@me",
    default_scopes: &["identify", "guilds"],
    token_auth: TokenAuth::Form,
    extra_authorize_params: &[],
};

/// Telegram Bot API. Calls are addressed as `{base}/bot<token>/<method>`.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// User agent sent on every platform request. Reddit rejects generic agents.
pub const USER_AGENT: &str = concat!("link-broker/", env!("CARGO_PKG_VERSION"));
