//! Provider settings and authorization URL construction
//!
//! `ProviderSettings` combines a platform's public endpoint table with the
//! deployment's client credentials and redirect URI. Settings are validated
//! when the broker is built so a missing secret or redirect URI fails at
//! startup instead of halfway through a user's login.

use common::Secret;
use platform::{Platform, TokenAuth};
use url::Url;

use crate::error::{Error, Result};
use crate::session::PendingSession;

/// OAuth client configuration for one platform.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub platform: Platform,
    pub client_id: String,
    pub client_secret: Option<Secret<String>>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub authorize_url: String,
    pub token_url: String,
    /// Base URL for authorized API calls (identity fetch, follow-up actions)
    pub api_base: String,
    pub token_auth: TokenAuth,
    pub extra_authorize_params: Vec<(String, String)>,
}

impl ProviderSettings {
    /// Settings with the platform's default endpoints and scopes.
    ///
    /// Fails for bot-token platforms, which have no login flow.
    pub fn for_platform(
        platform: Platform,
        client_id: impl Into<String>,
        client_secret: Option<Secret<String>>,
        redirect_uri: impl Into<String>,
    ) -> Result<Self> {
        let endpoints = platform.oauth_endpoints().ok_or_else(|| {
            Error::Configuration(format!("{platform} does not support OAuth login"))
        })?;
        Ok(Self {
            platform,
            client_id: client_id.into(),
            client_secret,
            redirect_uri: redirect_uri.into(),
            scopes: endpoints
                .default_scopes
                .iter()
                .map(|s| s.to_string())
                .collect(),
            authorize_url: endpoints.authorize_url.to_string(),
            token_url: endpoints.token_url.to_string(),
            api_base: endpoints.api_base.to_string(),
            token_auth: endpoints.token_auth,
            extra_authorize_params: endpoints
                .extra_authorize_params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_authorize_url(mut self, url: impl Into<String>) -> Self {
        self.authorize_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }

    /// Check that everything a login needs is present and well-formed.
    pub fn validate(&self) -> Result<()> {
        let platform = self.platform;
        if self.client_id.trim().is_empty() {
            return Err(Error::Configuration(format!("{platform}: client_id is empty")));
        }
        match &self.client_secret {
            Some(secret) if !secret.is_blank() => {}
            _ => {
                return Err(Error::Configuration(format!(
                    "{platform}: client secret is not configured"
                )));
            }
        }
        if self.scopes.is_empty() {
            return Err(Error::Configuration(format!("{platform}: no scopes configured")));
        }
        for (name, value) in [
            ("redirect_uri", &self.redirect_uri),
            ("authorize_url", &self.authorize_url),
            ("token_url", &self.token_url),
            ("api_base", &self.api_base),
        ] {
            require_http_url(platform, name, value)?;
        }
        Ok(())
    }
}

fn require_http_url(platform: Platform, name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Configuration(format!("{platform}: {name} is not configured")));
    }
    let url = Url::parse(value)
        .map_err(|e| Error::Configuration(format!("{platform}: invalid {name} {value:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Configuration(format!(
            "{platform}: {name} must use http or https, got {}",
            url.scheme()
        )));
    }
    Ok(())
}

/// Authorization URL plus the PKCE material the caller must keep server-side.
#[derive(Debug, Clone)]
pub struct AuthorizationLink {
    pub url: String,
    pub state: String,
    pub code_verifier: Secret<String>,
}

/// Build the provider authorization URL for a pending session.
///
/// Includes `client_id`, `redirect_uri`, `response_type=code`, `scope`,
/// `state`, `code_challenge` and `code_challenge_method=S256`, followed by any
/// platform-specific parameters.
pub fn build_authorization_url(
    settings: &ProviderSettings,
    session: &PendingSession,
) -> Result<String> {
    if session.platform != settings.platform {
        return Err(Error::Configuration(format!(
            "session for {} used with {} settings",
            session.platform, settings.platform
        )));
    }

    let mut url = Url::parse(&settings.authorize_url).map_err(|e| {
        Error::Configuration(format!("{}: invalid authorize_url: {e}", settings.platform))
    })?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("client_id", &settings.client_id)
            .append_pair("redirect_uri", &settings.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &settings.scopes.join(" "))
            .append_pair("state", &session.state)
            .append_pair("code_challenge", &session.code_challenge)
            .append_pair("code_challenge_method", "S256");
        for (key, value) in &settings.extra_authorize_params {
            query.append_pair(key, value);
        }
    }
    Ok(url.into())
}
