//! Pending-session registry
//!
//! Maps the opaque `state` token to the PKCE verifier and login context of an
//! in-flight login. A state is consumable exactly once: `take` removes the
//! entry under the same lock that reads it, so duplicate callback deliveries
//! race for a single winner. Abandoned logins are reclaimed by TTL, both
//! lazily on `create` and by the periodic `evict_expired` sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use common::{Clock, Secret};
use platform::Platform;
use tokio::sync::Mutex;
use tracing::debug;

use crate::pkce::{self, Entropy};

/// Maximum age of a pending session before it stops being redeemable.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(600);

/// In-memory state for one in-progress login.
#[derive(Debug, Clone)]
pub struct PendingSession {
    pub state: String,
    pub code_verifier: Secret<String>,
    pub code_challenge: String,
    pub platform: Platform,
    /// Internal identity the linked account will belong to.
    pub owner_id: String,
    /// Unix milliseconds at creation.
    pub created_at: u64,
}

impl PendingSession {
    pub fn is_expired(&self, now_millis: u64, ttl: Duration) -> bool {
        now_millis.saturating_sub(self.created_at) >= ttl.as_millis() as u64
    }
}

/// Registry of in-flight logins keyed by state.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, PendingSession>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entropy: Arc<dyn Entropy>,
}

impl SessionRegistry {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>, entropy: Arc<dyn Entropy>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
            clock,
            entropy,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a login: generate a PKCE triple and register it under its state.
    pub async fn create(&self, owner_id: &str, platform: Platform) -> PendingSession {
        let now = self.clock.now_millis();
        let mut sessions = self.sessions.lock().await;

        // Lazy cleanup: drop expired entries while holding the lock
        let ttl = self.ttl;
        sessions.retain(|_, s| !s.is_expired(now, ttl));

        let pair = loop {
            let pair = pkce::generate(self.entropy.as_ref());
            if !sessions.contains_key(&pair.state) {
                break pair;
            }
        };

        let session = PendingSession {
            state: pair.state,
            code_verifier: pair.code_verifier,
            code_challenge: pair.code_challenge,
            platform,
            owner_id: owner_id.to_string(),
            created_at: now,
        };
        sessions.insert(session.state.clone(), session.clone());
        debug!(%platform, owner_id, pending = sessions.len(), "pending session created");
        session
    }

    /// Consume a state. Returns `None` when unknown, already consumed, or expired.
    pub async fn take(&self, state: &str) -> Option<PendingSession> {
        let session = self.sessions.lock().await.remove(state)?;
        if session.is_expired(self.clock.now_millis(), self.ttl) {
            debug!(platform = %session.platform, "pending session expired before callback");
            return None;
        }
        Some(session)
    }

    /// Remove every expired session. Returns the number removed.
    pub async fn evict_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let ttl = self.ttl;
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now, ttl));
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, remaining = sessions.len(), "evicted expired sessions");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
