//! OAuth token exchange and refresh
//!
//! Handles the two token endpoint interactions:
//! 1. Authorization code exchange (login completion)
//! 2. Token refresh (when an access token nears expiry)
//!
//! Both POST a form to the platform's token endpoint with different grant
//! types. Client credentials go in a Basic header or the form body depending
//! on the platform. Failures are split into `InvalidGrant` (the provider
//! refused the grant; retrying cannot help) and `TokenExchange`/`Http`
//! (transient or unexpected).

use std::fmt;

use common::Secret;
use platform::TokenAuth;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::authorize::ProviderSettings;
use crate::error::{Error, Result};

/// Response from the token endpoint for both exchange and refresh.
///
/// `expires_in` is a delta in seconds from the response time. Providers that
/// rotate refresh tokens return a new one; others omit it.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires (delta, not absolute)
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Exchange an authorization code for tokens.
///
/// Sends the PKCE verifier so the provider can check it against the
/// challenge from the authorization URL.
pub async fn exchange_code(
    client: &reqwest::Client,
    settings: &ProviderSettings,
    code: &str,
    code_verifier: &Secret<String>,
) -> Result<TokenResponse> {
    let form = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("code_verifier", code_verifier.expose().as_str()),
        ("redirect_uri", settings.redirect_uri.as_str()),
    ];
    post_token(client, settings, &form, &[code_verifier.expose().as_str()]).await
}

/// Exchange a refresh token for a new token set.
pub async fn refresh_token(
    client: &reqwest::Client,
    settings: &ProviderSettings,
    refresh: &Secret<String>,
) -> Result<TokenResponse> {
    let form = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh.expose().as_str()),
    ];
    post_token(client, settings, &form, &[refresh.expose().as_str()]).await
}

async fn post_token(
    client: &reqwest::Client,
    settings: &ProviderSettings,
    grant: &[(&str, &str)],
    redact: &[&str],
) -> Result<TokenResponse> {
    let mut form: Vec<(&str, &str)> = grant.to_vec();
    form.push(("client_id", settings.client_id.as_str()));

    let mut request = client.post(&settings.token_url);
    match (&settings.client_secret, settings.token_auth) {
        (Some(secret), TokenAuth::Basic) => {
            request = request.basic_auth(&settings.client_id, Some(secret.expose()));
        }
        (Some(secret), TokenAuth::Form) => {
            form.push(("client_secret", secret.expose().as_str()));
        }
        (None, _) => {}
    }

    let mut secrets: Vec<&str> = redact.to_vec();
    if let Some(secret) = &settings.client_secret {
        secrets.push(secret.expose().as_str());
    }

    let response = request
        .form(&form)
        .send()
        .await
        .map_err(|e| Error::Http(format!("token endpoint request failed: {}", e.without_url())))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<no body>"));
    let parsed: Option<Value> = serde_json::from_str(&body).ok();
    let provider_error = parsed
        .as_ref()
        .and_then(|v| v.get("error"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    if !status.is_success() || provider_error.is_some() {
        let detail = redact_secrets(
            format!("{} returned {status}: {body}", settings.platform),
            &secrets,
        );
        debug!(platform = %settings.platform, status = status.as_u16(), error = ?provider_error, "token endpoint rejected request");
        return Err(classify_failure(status.as_u16(), provider_error.as_deref(), detail));
    }

    let parsed = parsed.ok_or_else(|| {
        Error::TokenExchange(format!("{} returned a non-JSON token response", settings.platform))
    })?;
    serde_json::from_value::<TokenResponse>(parsed)
        .map_err(|e| Error::TokenExchange(format!("invalid token response: {e}")))
}

/// Decide whether a token endpoint failure is a refused grant or transient.
///
/// Client errors (4xx other than 408/429) mean the provider looked at the
/// grant and said no. Reddit signals failures with `200 {"error": ...}`, so an
/// `invalid_grant` body is a refusal regardless of status.
fn classify_failure(status: u16, provider_error: Option<&str>, detail: String) -> Error {
    if provider_error == Some("invalid_grant") {
        return Error::InvalidGrant(detail);
    }
    match status {
        408 | 429 => Error::TokenExchange(detail),
        400..=499 => Error::InvalidGrant(detail),
        _ => Error::TokenExchange(detail),
    }
}

fn redact_secrets(mut text: String, secrets: &[&str]) -> String {
    for secret in secrets.iter().filter(|s| !s.is_empty()) {
        text = text.replace(secret, "[REDACTED]");
    }
    text
}
