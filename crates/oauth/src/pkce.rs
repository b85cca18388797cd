//! PKCE (Proof Key for Code Exchange) generation per RFC 7636
//!
//! Produces the opaque `state` token, the code verifier and its S256
//! challenge for one login attempt. Only the challenge is ever sent to the
//! provider's authorization endpoint; the verifier stays server-side until
//! the token exchange.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use common::Secret;
use rand::RngExt;
use sha2::{Digest, Sha256};

/// Random bytes behind the state token (256 bits, 43 base64url chars).
pub const STATE_BYTES: usize = 32;

/// Random bytes behind the verifier (86 base64url chars, RFC range 43-128).
pub const VERIFIER_BYTES: usize = 64;

/// Source of random bytes for state and verifier generation.
///
/// Production code uses `OsEntropy`; tests inject deterministic sources.
pub trait Entropy: Send + Sync {
    fn fill(&self, dest: &mut [u8]);
}

/// Cryptographically secure thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl Entropy for OsEntropy {
    fn fill(&self, dest: &mut [u8]) {
        rand::rng().fill(dest);
    }
}

/// State token, verifier and challenge for one login attempt.
#[derive(Debug, Clone)]
pub struct PkcePair {
    pub state: String,
    pub code_verifier: Secret<String>,
    pub code_challenge: String,
}

/// Generate a fresh state + verifier + challenge triple.
pub fn generate(entropy: &dyn Entropy) -> PkcePair {
    let mut state = [0u8; STATE_BYTES];
    entropy.fill(&mut state);

    let mut verifier = [0u8; VERIFIER_BYTES];
    entropy.fill(&mut verifier);
    let code_verifier = URL_SAFE_NO_PAD.encode(verifier);

    PkcePair {
        state: URL_SAFE_NO_PAD.encode(state),
        code_challenge: compute_challenge(&code_verifier),
        code_verifier: Secret::new(code_verifier),
    }
}

/// Compute the S256 code challenge from a verifier.
///
/// `challenge = BASE64URL(SHA256(verifier))`
pub fn compute_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}
