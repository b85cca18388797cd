//! HTTP error responses
//!
//! Maps broker errors to status codes and a JSON body of the form
//! `{"error": "<kind>", "message": "<detail>"}`. Messages come from the
//! broker's `Display`, which never includes verifiers or tokens.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::warn;

/// Errors returned by route handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Broker(#[from] broker::Error),

    #[error("missing x-owner-id header")]
    MissingOwner,

    #[error("unknown platform: {0}")]
    UnknownPlatform(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Broker(err) => broker_status(err),
            ApiError::MissingOwner => StatusCode::UNAUTHORIZED,
            ApiError::UnknownPlatform(_) => StatusCode::NOT_FOUND,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Broker(err) => err.kind(),
            ApiError::MissingOwner => "missing_owner",
            ApiError::UnknownPlatform(_) => "unknown_platform",
        }
    }
}

fn broker_status(err: &broker::Error) -> StatusCode {
    use broker::Error;
    match err {
        Error::Configuration(_) | Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        Error::ProviderDenied { .. }
        | Error::MalformedCallback(_)
        | Error::InvalidOrExpiredState => StatusCode::BAD_REQUEST,
        Error::TokenExchange(_) | Error::ClientConstruction(_) => StatusCode::BAD_GATEWAY,
        Error::RefreshFailed {
            relink_required: true,
            ..
        } => StatusCode::CONFLICT,
        Error::RefreshFailed { .. } => StatusCode::BAD_GATEWAY,
        Error::AccountNotFound(_) => StatusCode::NOT_FOUND,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(kind = self.kind(), error = %self, "request failed");
        }
        let body = serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
