//! Ready-to-call platform client handle
//!
//! A `PlatformClient` wraps one credential (an OAuth access token or a bot
//! token) and a configured HTTP client. Cloning is cheap; the client pool
//! hands out clones of a single cached instance per credential.

use std::fmt;

use common::Secret;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::endpoints::USER_AGENT;
use crate::{AuthKind, ErrorClassification, Platform, classify_status};

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Errors from platform API calls.
///
/// Messages never contain the credential: reqwest errors are stripped of
/// their URL because Telegram embeds the bot token in the request path.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to build client: {0}")]
    Build(String),

    #[error("request failed: {0}")]
    Http(String),

    #[error("platform returned {status}: {body}")]
    Status {
        status: u16,
        classification: ErrorClassification,
        body: String,
    },

    #[error("unexpected response shape: {0}")]
    Decode(String),
}

impl ClientError {
    /// Classification for errors caused by the platform's response, if any.
    pub fn classification(&self) -> Option<ErrorClassification> {
        match self {
            ClientError::Status { classification, .. } => Some(*classification),
            _ => None,
        }
    }
}

/// Minimal identity of the account behind a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: String,
    pub username: Option<String>,
}

/// Authorized handle for one platform credential.
#[derive(Clone)]
pub struct PlatformClient {
    platform: Platform,
    api_base: String,
    http: reqwest::Client,
    credential: Secret<String>,
}

impl fmt::Debug for PlatformClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformClient")
            .field("platform", &self.platform)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl PlatformClient {
    /// Build a handle for `credential` against `api_base`.
    ///
    /// OAuth platforms get a default `Authorization: Bearer` header marked
    /// sensitive; bot-token platforms carry the token in the request path.
    pub fn new(
        platform: Platform,
        api_base: impl Into<String>,
        credential: Secret<String>,
    ) -> Result<Self, ClientError> {
        if credential.is_blank() {
            return Err(ClientError::Build(format!("empty {platform} credential")));
        }

        let mut headers = HeaderMap::new();
        if platform.auth_kind() == AuthKind::OAuth {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", credential.expose()))
                .map_err(|_| {
                    ClientError::Build("credential contains invalid header characters".into())
                })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ClientError::Build(e.without_url().to_string()))?;

        Ok(Self {
            platform,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            http,
            credential,
        })
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// The wrapped credential, redacted in Debug/Display.
    pub fn credential(&self) -> &Secret<String> {
        &self.credential
    }

    /// Fetch the identity of the account the credential belongs to.
    pub async fn identity(&self) -> Result<Identity, ClientError> {
        let path = match self.platform.oauth_endpoints() {
            Some(endpoints) => endpoints.identity_path,
            None => "getMe",
        };
        let body = self.get_json(path).await?;
        parse_identity(self.platform, &body)
    }

    /// GET `path` and decode the JSON body.
    pub async fn get_json(&self, path: &str) -> Result<Value, ClientError> {
        let request = self.http.get(self.url(path));
        self.send(request).await
    }

    /// POST a JSON body to `path` and decode the JSON response.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, ClientError> {
        let request = self.http.post(self.url(path)).json(body);
        self.send(request).await
    }

    fn url(&self, path: &str) -> String {
        match self.platform.auth_kind() {
            AuthKind::OAuth => format!("{}/{}", self.api_base, path.trim_start_matches('/')),
            AuthKind::BotToken => format!(
                "{}/bot{}/{}",
                self.api_base,
                self.credential.expose(),
                path.trim_start_matches('/')
            ),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, ClientError> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Http(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            let classification = classify_status(
                status.as_u16(),
                self.platform.auth_kind() == AuthKind::BotToken,
            );
            debug!(platform = %self.platform, status = status.as_u16(), ?classification, "platform call failed");
            return Err(ClientError::Status {
                status: status.as_u16(),
                classification,
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ClientError::Decode(e.without_url().to_string()))
    }
}

/// Extract an `Identity` from a platform's "who am I" response.
pub fn parse_identity(platform: Platform, body: &Value) -> Result<Identity, ClientError> {
    let (id, username) = match platform {
        Platform::Twitter => (&body["data"]["id"], &body["data"]["username"]),
        Platform::Reddit => (&body["id"], &body["name"]),
        Platform::Discord => (&body["id"], &body["username"]),
        Platform::Telegram => {
            if body["ok"] != Value::Bool(true) {
                return Err(ClientError::Decode("telegram getMe returned ok=false".into()));
            }
            (&body["result"]["id"], &body["result"]["username"])
        }
    };

    let id = match id {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => {
            return Err(ClientError::Decode(format!(
                "{platform} identity response has no id"
            )));
        }
    };

    Ok(Identity {
        id,
        username: username.as_str().map(str::to_owned),
    })
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
