//! Error types for broker operations

use platform::Platform;

/// Errors surfaced to broker callers.
///
/// Variants carry provider status and detail where useful but never a
/// verifier, token or client secret.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The user or provider refused authorization at the consent screen.
    #[error("authorization denied by provider: {error}")]
    ProviderDenied {
        platform: Option<Platform>,
        error: String,
        description: Option<String>,
    },

    #[error("malformed callback: {0}")]
    MalformedCallback(String),

    /// Unknown, expired or already-consumed `state`.
    #[error("invalid or expired state")]
    InvalidOrExpiredState,

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    /// `relink_required` is set when the provider refused the refresh token;
    /// otherwise the failure was transient and the account is unchanged.
    #[error("token refresh failed for account {account_id}: {message}")]
    RefreshFailed {
        account_id: String,
        relink_required: bool,
        message: String,
    },

    #[error("client construction failed: {0}")]
    ClientConstruction(String),

    #[error("no linked {0} account")]
    AccountNotFound(Platform),

    #[error("account store error: {0}")]
    Store(String),
}

impl Error {
    /// Stable snake_case label for metrics, logs and HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "configuration",
            Error::ProviderDenied { .. } => "provider_denied",
            Error::MalformedCallback(_) => "malformed_callback",
            Error::InvalidOrExpiredState => "invalid_or_expired_state",
            Error::TokenExchange(_) => "token_exchange",
            Error::RefreshFailed {
                relink_required: true,
                ..
            } => "relink_required",
            Error::RefreshFailed { .. } => "refresh_failed",
            Error::ClientConstruction(_) => "client_construction",
            Error::AccountNotFound(_) => "account_not_found",
            Error::Store(_) => "store",
        }
    }

    pub(crate) fn store(err: oauth::Error) -> Self {
        Error::Store(err.to_string())
    }
}

impl From<client_pool::Error> for Error {
    fn from(err: client_pool::Error) -> Self {
        Error::ClientConstruction(err.to_string())
    }
}

/// Result alias for broker operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_kind_depends_on_relink() {
        let terminal = Error::RefreshFailed {
            account_id: "a".into(),
            relink_required: true,
            message: "invalid_grant".into(),
        };
        let transient = Error::RefreshFailed {
            account_id: "a".into(),
            relink_required: false,
            message: "503".into(),
        };
        assert_eq!(terminal.kind(), "relink_required");
        assert_eq!(transient.kind(), "refresh_failed");
    }

    #[test]
    fn pool_errors_become_client_construction() {
        let key = client_pool::Fingerprint::of("twitter", "at_1");
        let err: Error = client_pool::Error::Construction {
            key,
            message: "bad header".into(),
        }
        .into();
        assert_eq!(err.kind(), "client_construction");
        assert!(!err.to_string().contains("at_1"));
    }

    #[test]
    fn account_not_found_names_platform() {
        let err = Error::AccountNotFound(Platform::Reddit);
        assert_eq!(err.to_string(), "no linked reddit account");
    }
}
