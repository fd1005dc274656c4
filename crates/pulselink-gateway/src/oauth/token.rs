//! OAuth token types.
//!
//! Google's token endpoint returns a refresh token only on the first consent
//! (or when `prompt=consent` is forced); refresh grants usually omit it.

use chrono::{DateTime, Duration, Utc};
use pulselink_core::{ConnectError, Credential, Provider};
use serde::Deserialize;

/// Token endpoint response body.
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Tokens issued by a successful exchange or refresh.
#[derive(Clone)]
pub struct OAuthToken {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub scope: Option<String>,
}

impl TryFrom<TokenResponse> for OAuthToken {
    type Error = ConnectError;

    /// Fails on an `expires_in` that is negative or does not fit a timestamp.
    fn try_from(response: TokenResponse) -> Result<Self, Self::Error> {
        let expires_at = match response.expires_in {
            None => None,
            Some(secs) => Some(expiry_from_now(secs).ok_or_else(|| {
                ConnectError::UpstreamAuthFailure {
                    status: 502,
                    message: "malformed token response".to_string(),
                }
            })?),
        };

        Ok(Self {
            access_token: response.access_token,
            token_type: response.token_type,
            refresh_token: response.refresh_token.filter(|t| !t.is_empty()),
            expires_at,
            scope: response.scope,
        })
    }
}

fn expiry_from_now(secs: i64) -> Option<DateTime<Utc>> {
    if secs < 0 {
        return None;
    }
    Duration::try_seconds(secs).and_then(|d| Utc::now().checked_add_signed(d))
}

impl OAuthToken {
    /// Scopes granted, split on whitespace.
    pub fn scopes(&self) -> Vec<&str> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Credentials to persist for this token set.
    ///
    /// Always contains the access token; the refresh token follows when the
    /// provider issued one.
    pub fn into_credentials(self, client_id: &str, provider: Provider) -> Vec<Credential> {
        let mut credentials = vec![Credential::access_token(
            client_id,
            provider,
            self.access_token,
            self.expires_at,
        )
        .with_token_type(self.token_type)
        .with_scope(self.scope.clone())];

        if let Some(refresh) = self.refresh_token {
            credentials
                .push(Credential::refresh_token(client_id, provider, refresh).with_scope(self.scope));
        }
        credentials
    }
}

impl std::fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}
