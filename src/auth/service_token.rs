//! Shared service-token authentication for gateway callers.

use sha2::{Digest, Sha256};

/// Validates the bearer token presented by calling services.
///
/// Only the SHA-256 digest of the configured token is kept in memory.
#[derive(Debug, Clone, Default)]
pub struct ServiceTokenValidator {
    digest: Option<String>,
}

impl ServiceTokenValidator {
    /// Build from the configured token. Blank disables the check.
    pub fn new(token: &str) -> Self {
        let token = token.trim();
        Self {
            digest: (!token.is_empty()).then(|| Self::hash_token(token)),
        }
    }

    /// Hash a token for comparison.
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn enabled(&self) -> bool {
        self.digest.is_some()
    }

    /// Whether `token` matches. Always true when the check is disabled.
    pub fn validate(&self, token: &str) -> bool {
        match &self.digest {
            Some(expected) => *expected == Self::hash_token(token),
            None => true,
        }
    }
}
