//! Background maintenance
//!
//! Spawns a periodic task that evicts expired pending sessions and idle
//! pooled clients. Both are also cleaned lazily on the request path; this
//! keeps memory bounded when traffic stops.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::broker::Broker;

/// What one maintenance pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub expired_sessions: usize,
    pub idle_clients: usize,
}

impl Broker {
    /// Run one maintenance pass.
    pub async fn run_maintenance(&self) -> MaintenanceReport {
        let report = MaintenanceReport {
            expired_sessions: self.evict_expired_sessions().await,
            idle_clients: self.evict_idle_clients().await,
        };
        if report != MaintenanceReport::default() {
            debug!(
                expired_sessions = report.expired_sessions,
                idle_clients = report.idle_clients,
                "maintenance pass"
            );
        }
        metrics::gauge!("broker_pending_sessions").set(self.sessions.len().await as f64);
        metrics::gauge!("broker_pooled_clients").set(self.pool.len().await as f64);
        report
    }
}

/// Spawn a task running `run_maintenance` every `interval`.
///
/// Returns the `JoinHandle`; abort it on shutdown.
pub fn spawn_maintenance_task(
    broker: Arc<Broker>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick completes immediately; nothing to clean at startup
        ticker.tick().await;

        loop {
            ticker.tick().await;
            broker.run_maintenance().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::tests::{harness, harness_with, seed_account};
    use common::Secret;
    use oauth::ProviderSettings;
    use platform::Platform;
    use wiremock::MockServer;

    #[tokio::test]
    async fn pass_evicts_expired_sessions_and_idle_clients() {
        let server = MockServer::start().await;
        let h = harness(&server);
        seed_account(&h, "alice", 24 * 3600).await;
        h.broker.start_login("alice", Platform::Twitter).await.unwrap();
        h.broker.get_client("alice", Platform::Twitter).await.unwrap();

        assert_eq!(h.broker.run_maintenance().await, MaintenanceReport::default());

        h.clock.advance(Duration::from_secs(31 * 60));
        let report = h.broker.run_maintenance().await;
        assert_eq!(report.expired_sessions, 1);
        assert_eq!(report.idle_clients, 1);

        let health = h.broker.health().await;
        assert_eq!(health.pending_sessions, 0);
        assert_eq!(health.pooled_clients, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn task_runs_on_interval() {
        let settings = ProviderSettings::for_platform(
            Platform::Reddit,
            "client-123",
            Some(Secret::from("shh")),
            "https://app.example/oauth/callback",
        )
        .unwrap();
        let h = harness_with(vec![settings], vec![]);
        h.broker.start_login("alice", Platform::Reddit).await.unwrap();
        h.clock.advance(Duration::from_secs(601));

        let task = spawn_maintenance_task(h.broker.clone(), Duration::from_secs(30));
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(h.broker.health().await.pending_sessions, 0);
        task.abort();
    }
}
