//! Account-linking broker for social platforms
//!
//! Ties the OAuth pieces and the client pool into one explicit `Broker` value
//! that callers (the HTTP service, bots, jobs) share behind an `Arc`.
//!
//! Login lifecycle:
//! 1. `start_login` creates a pending PKCE session and returns the provider URL
//! 2. The provider redirects back; `complete_login` consumes the session once,
//!    exchanges the code, fetches identity and stores a `LinkedAccount`
//! 3. `get_client` refreshes near-expiry tokens and returns a pooled handle
//! 4. A rejected refresh marks the account `RelinkRequired` and drops its handle
//! 5. `disconnect` deletes the account and drops its handle
//! 6. The maintenance task evicts expired sessions and idle handles

pub mod broker;
pub mod error;
pub mod exchange;
pub mod factory;
pub mod maintenance;
pub mod refresh;

pub use broker::{BotSettings, Broker, BrokerConfig, BrokerParts, HealthReport, LoginStart};
pub use error::{Error, Result};
pub use exchange::{CallbackParams, LoginState};
pub use factory::{ClientFactory, HttpClientFactory};
pub use maintenance::{MaintenanceReport, spawn_maintenance_task};
