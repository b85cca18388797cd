//! Error types for OAuth operations

/// Errors from OAuth operations.
///
/// Messages carry provider status and response detail but never a verifier,
/// access token, refresh token or client secret.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    /// The provider refused the grant (reused code, revoked refresh token).
    #[error("grant rejected: {0}")]
    InvalidGrant(String),

    #[error("account parse error: {0}")]
    AccountParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for OAuth operations.
pub type Result<T> = std::result::Result<T, Error>;
