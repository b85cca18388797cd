//! Link Broker
//!
//! Single-binary Rust service that:
//! 1. Loads provider registrations and secrets
//! 2. Starts OAuth2 PKCE logins and completes them on the provider callback
//! 3. Persists linked accounts to a JSON file
//! 4. Hands out pooled, auto-refreshed platform clients to in-process callers
//! 5. Exposes health and Prometheus metrics

mod config;
mod error;
mod metrics;
mod render;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use broker::{Broker, spawn_maintenance_task};
use oauth::FileAccountStore;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::routes::{AppState, build_router};

/// Maximum time to wait for in-flight requests after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting link-broker");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus = metrics::install_recorder().context("failed to install Prometheus recorder")?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let providers = config.provider_settings()?;
    let bots = config.bot_settings();
    info!(
        listen_addr = %config.server.listen_addr,
        providers = providers.len(),
        bots = bots.len(),
        frontend_url = config.server.frontend_url.as_deref().unwrap_or("-"),
        "configuration loaded"
    );

    let accounts_path = config.broker.accounts_path.clone();
    let store = FileAccountStore::load(accounts_path.clone())
        .await
        .with_context(|| format!("failed to load accounts from {}", accounts_path.display()))?;
    info!(path = %accounts_path.display(), accounts = store.len().await, "account store loaded");

    let broker = Arc::new(
        Broker::new(config.broker_config(), providers, bots, Arc::new(store))
            .context("invalid provider configuration")?,
    );

    let maintenance = spawn_maintenance_task(broker.clone(), config.maintenance_interval());

    let app = build_router(
        AppState {
            broker,
            prometheus,
            frontend_url: config.server.frontend_url.clone(),
        },
        config.server.max_connections,
    );

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    // Graceful shutdown: stop accepting on SIGTERM/SIGINT, then give in-flight
    // requests DRAIN_TIMEOUT (measured from the signal) to finish.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());
    maintenance.abort();

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            warn!(
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
