//! Error types for pool operations

use crate::fingerprint::Fingerprint;

/// Errors from pool operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The factory failed; nothing was cached for the key.
    #[error("client construction failed for {key}: {message}")]
    Construction { key: Fingerprint, message: String },
}

/// Result alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;
