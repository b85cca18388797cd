//! Non-reversible cache keys for credentials
//!
//! A fingerprint is the first 16 bytes of `SHA-256(namespace || 0x00 ||
//! secret)` as lowercase hex. It is safe to log and to put in error messages.
//! The namespace keeps identical secrets on different platforms apart.

use std::fmt;

use sha2::{Digest, Sha256};

const FINGERPRINT_BYTES: usize = 16;

/// Stable identifier derived from, but not revealing, a credential.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(namespace: &str, secret: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(namespace.as_bytes());
        hasher.update([0u8]);
        hasher.update(secret.as_bytes());
        let digest = hasher.finalize();
        Self(hex::encode(&digest[..FINGERPRINT_BYTES]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_and_hex() {
        let a = Fingerprint::of("twitter", "at_123");
        let b = Fingerprint::of("twitter", "at_123");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn never_contains_secret() {
        let fp = Fingerprint::of("telegram", "123456:ABCdef");
        assert!(!fp.to_string().contains("ABCdef"));
        assert!(!format!("{fp:?}").contains("ABCdef"));
    }

    #[test]
    fn namespace_separates_identical_secrets() {
        assert_ne!(
            Fingerprint::of("reddit", "same"),
            Fingerprint::of("discord", "same")
        );
    }

    #[test]
    fn separator_prevents_boundary_collisions() {
        assert_ne!(Fingerprint::of("ab", "c"), Fingerprint::of("a", "bc"));
    }
}
