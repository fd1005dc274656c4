//! PKCE (Proof Key for Code Exchange, RFC 7636).
//!
//! Google accepts S256 challenges for web-server clients; the verifier is
//! persisted (encrypted) with the authorization state until the callback.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Only challenge method we send.
pub const PKCE_METHOD: &str = "S256";

/// PKCE verifier and challenge pair.
#[derive(Clone)]
pub struct PkceChallenge {
    /// Secret half, sent in the token exchange.
    pub verifier: String,
    /// Public half, sent in the authorization URL.
    pub challenge: String,
}

impl PkceChallenge {
    /// Generate a fresh pair from 32 random bytes.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);

        let verifier = URL_SAFE_NO_PAD.encode(bytes);
        let challenge = challenge_for(&verifier);
        Self {
            verifier,
            challenge,
        }
    }

    /// Check that `verifier` hashes to `challenge`.
    pub fn verify(verifier: &str, challenge: &str) -> bool {
        challenge_for(verifier) == challenge
    }
}

fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

impl std::fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("verifier", &"[REDACTED]")
            .field("challenge", &self.challenge)
            .finish()
    }
}
