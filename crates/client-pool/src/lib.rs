//! Credential-keyed pool of ready platform client handles
//!
//! Caches one live handle per distinct credential so follow-up calls reuse a
//! configured client instead of rebuilding one per request. Keys are
//! `Fingerprint`s derived from the credential, never the secret itself.
//!
//! Handle lifecycle:
//! 1. First `acquire` for a key runs the factory once; concurrent callers wait
//! 2. Later `acquire`s return the cached handle and bump its last-used time
//! 3. `invalidate` drops it after an auth failure or a token rotation
//! 4. `evict_idle` drops handles unused for longer than the idle threshold

pub mod error;
pub mod fingerprint;
pub mod pool;

pub use error::{Error, Result};
pub use fingerprint::Fingerprint;
pub use pool::ClientPool;
