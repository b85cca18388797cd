//! Callback response rendering
//!
//! A browser finishing a login is redirected to the configured frontend with
//! `?status=linked&platform=..` or `?status=error&error=<kind>`. API clients
//! (or deployments without a frontend) pass `format=json` and get a JSON
//! body. Tokens never appear in either form.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use oauth::LinkedAccount;
use url::Url;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackFormat {
    Json,
    Redirect,
}

impl CallbackFormat {
    /// JSON when asked for or when there is nowhere to redirect.
    pub fn choose(requested: Option<&str>, frontend_url: Option<&str>) -> Self {
        match (requested, frontend_url) {
            (Some(f), _) if f.eq_ignore_ascii_case("json") => CallbackFormat::Json,
            (_, None) => CallbackFormat::Json,
            (_, Some(_)) => CallbackFormat::Redirect,
        }
    }
}

pub fn linked(format: CallbackFormat, frontend_url: Option<&str>, account: &LinkedAccount) -> Response {
    let platform = account.platform.as_str();
    if format == CallbackFormat::Redirect {
        if let Some(url) = frontend_redirect(frontend_url, &[("status", "linked"), ("platform", platform)]) {
            return Redirect::to(&url).into_response();
        }
    }
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "linked",
            "account": account.summary(),
        })),
    )
        .into_response()
}

pub fn failed(format: CallbackFormat, frontend_url: Option<&str>, err: ApiError) -> Response {
    if format == CallbackFormat::Redirect {
        let mut pairs = vec![("status", "error"), ("error", err.kind())];
        if let ApiError::Broker(broker::Error::ProviderDenied {
            platform: Some(platform),
            ..
        }) = &err
        {
            pairs.push(("platform", platform.as_str()));
        }
        if let Some(url) = frontend_redirect(frontend_url, &pairs) {
            return Redirect::to(&url).into_response();
        }
    }
    err.into_response()
}

fn frontend_redirect(frontend_url: Option<&str>, pairs: &[(&str, &str)]) -> Option<String> {
    let mut url = Url::parse(frontend_url?).ok()?;
    url.query_pairs_mut().extend_pairs(pairs);
    Some(url.into())
}
