//! HTTP routes
//!
//! Thin layer over `Broker`. The owner of a request is the `x-owner-id`
//! header, set by the upstream auth layer; the callback is the exception
//! since the owner is recovered from the pending session.
//!
//! Endpoints:
//! - GET    /health               : configured platforms, pending sessions, pooled clients
//! - GET    /metrics              : Prometheus text exposition
//! - GET    /connect/{platform}   : start a login, return the authorization URL
//! - GET    /oauth/callback       : provider redirect target
//! - GET    /accounts             : linked accounts for the owner (no tokens)
//! - DELETE /accounts/{platform}  : disconnect the owner's account

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use broker::{Broker, CallbackParams};
use metrics_exporter_prometheus::PrometheusHandle;
use platform::Platform;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::render::{self, CallbackFormat};

/// Header carrying the authenticated internal user id.
pub const OWNER_HEADER: &str = "x-owner-id";

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<Broker>,
    pub prometheus: PrometheusHandle,
    pub frontend_url: Option<String>,
}

/// Build the axum router with all routes and shared state.
///
/// Applies a concurrency limit layer based on `max_connections`.
pub fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/connect/{platform}", get(connect))
        .route("/oauth/callback", get(callback))
        .route("/accounts", get(list_accounts))
        .route("/accounts/{platform}", delete(disconnect))
        .route_layer(middleware::from_fn(track_requests))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

/// Record request count and latency per matched route.
async fn track_requests(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let method = request.method().to_string();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed = started.elapsed();
    debug!(%request_id, %route, %method, status, elapsed_ms = elapsed.as_millis() as u64, "request handled");
    crate::metrics::record_request(&route, &method, status, elapsed.as_secs_f64());
    response
}

fn owner(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(OWNER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .ok_or(ApiError::MissingOwner)
}

fn parse_platform(raw: &str) -> Result<Platform, ApiError> {
    Platform::from_str(raw).map_err(|_| ApiError::UnknownPlatform(raw.to_string()))
}

/// GET /health: which platforms are configured plus in-memory state sizes.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.broker.health().await;
    Json(serde_json::json!({
        "status": "ok",
        "platforms": health.platforms,
        "pending_sessions": health.pending_sessions,
        "pooled_clients": health.pooled_clients,
    }))
}

/// GET /metrics: Prometheus text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.prometheus.render(),
    )
}

/// GET /connect/{platform}: start a login for the owner.
async fn connect(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let owner_id = owner(&headers)?;
    let platform = parse_platform(&platform)?;
    let start = state.broker.start_login(&owner_id, platform).await?;
    Ok(Json(start))
}

/// Query of the provider redirect, plus our own `format` switch.
#[derive(Debug, Default, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    format: Option<String>,
}

/// GET /oauth/callback: complete a login and redirect or answer JSON.
async fn callback(State(state): State<AppState>, Query(query): Query<CallbackQuery>) -> Response {
    let frontend_url = state.frontend_url.as_deref();
    let format = CallbackFormat::choose(query.format.as_deref(), frontend_url);
    let params = CallbackParams {
        code: query.code,
        state: query.state,
        error: query.error,
        error_description: query.error_description,
    };

    match state.broker.complete_login(&params).await {
        Ok(account) => render::linked(format, frontend_url, &account),
        Err(err) => render::failed(format, frontend_url, err.into()),
    }
}

/// GET /accounts: the owner's linked accounts, without tokens.
async fn list_accounts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let owner_id = owner(&headers)?;
    let accounts = state.broker.list_accounts(&owner_id).await?;
    Ok(Json(serde_json::json!({ "accounts": accounts })))
}

/// DELETE /accounts/{platform}: unlink the owner's account.
async fn disconnect(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let owner_id = owner(&headers)?;
    let platform = parse_platform(&platform)?;
    let account = state.broker.disconnect(&owner_id, platform).await?;
    info!(%platform, %owner_id, "account disconnected via API");
    Ok(Json(serde_json::json!({
        "status": "disconnected",
        "account": account,
    })))
}
