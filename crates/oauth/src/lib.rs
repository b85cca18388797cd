//! OAuth2 authorization code + PKCE building blocks
//!
//! Provides PKCE generation, the pending-session registry, authorization URL
//! construction, token endpoint exchange/refresh, and the linked-account
//! storage contract. This crate holds no process-wide state: every stateful
//! piece is an explicit value with an injected clock and entropy source.
//!
//! Login flow:
//! 1. `SessionRegistry::create()` generates state + verifier via `pkce::generate()`
//! 2. User authorizes via `authorize::build_authorization_url()`
//! 3. `SessionRegistry::take()` consumes the state exactly once on callback
//! 4. `token::exchange_code()` trades the code + verifier for tokens
//! 5. Account persisted via `AccountStore::upsert_account()`
//! 6. `token::refresh_token()` renews tokens when they near expiry

pub mod accounts;
pub mod authorize;
pub mod error;
pub mod file_store;
pub mod pkce;
pub mod session;
pub mod token;

pub use accounts::{
    AccountStatus, AccountStore, AccountSummary, BoxFuture, LinkedAccount, MemoryAccountStore,
};
pub use authorize::{AuthorizationLink, ProviderSettings, build_authorization_url};
pub use error::{Error, Result};
pub use file_store::FileAccountStore;
pub use pkce::{Entropy, OsEntropy, PkcePair, compute_challenge};
pub use session::{DEFAULT_SESSION_TTL, PendingSession, SessionRegistry};
pub use token::{TokenResponse, exchange_code, refresh_token};
