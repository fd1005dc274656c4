//! Pending authorization attempt, keyed by its anti-forgery `state` value.
//!
//! Issued when an authorization URL is built, bound to one (client, provider)
//! pair, and consumed exactly once when the provider redirects back.

use std::fmt;

use chrono::{DateTime, Duration, Utc};

use super::Provider;

/// Default lifetime of an issued state value.
pub const DEFAULT_STATE_TTL_SECS: i64 = 600;

#[derive(Clone)]
pub struct AuthorizationState {
    /// Random, URL-safe anti-forgery value
    pub state: String,
    pub client_id: String,
    pub provider: Provider,
    /// PKCE verifier matching the challenge sent in the authorization URL
    pub pkce_verifier: String,
    /// Redirect URI used for this attempt (must be echoed in the exchange)
    pub redirect_uri: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthorizationState {
    pub fn new(
        state: impl Into<String>,
        client_id: impl Into<String>,
        provider: Provider,
        pkce_verifier: impl Into<String>,
        redirect_uri: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            state: state.into(),
            client_id: client_id.into(),
            provider,
            pkce_verifier: pkce_verifier.into(),
            redirect_uri: redirect_uri.into(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// First 8 characters of the state, for log lines.
    pub fn short_state(&self) -> &str {
        short_state(&self.state)
    }
}

/// Truncate a state value for logging.
pub fn short_state(state: &str) -> &str {
    let end = state
        .char_indices()
        .nth(8)
        .map(|(i, _)| i)
        .unwrap_or(state.len());
    &state[..end]
}

impl fmt::Debug for AuthorizationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationState")
            .field("state", &self.short_state())
            .field("client_id", &self.client_id)
            .field("provider", &self.provider)
            .field("pkce_verifier", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
