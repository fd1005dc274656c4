//! Credential entity - one stored secret per (client, provider, kind)
//!
//! The `value` field holds the decoded secret in memory only. Storage
//! implementations encrypt it before it touches disk and must never log it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Provider;

/// Kind of secret stored for a provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    AccessToken,
    RefreshToken,
}

impl CredentialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialType::AccessToken => "access_token",
            CredentialType::RefreshToken => "refresh_token",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "access_token" => Some(CredentialType::AccessToken),
            "refresh_token" => Some(CredentialType::RefreshToken),
            _ => None,
        }
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored secret enabling calls to a provider on a client's behalf.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Tenant (client account) identifier
    pub client_id: String,

    pub provider: Provider,

    pub credential_type: CredentialType,

    /// Decoded secret value
    pub value: String,

    /// When the secret stops being usable (access tokens only, usually)
    pub expires_at: Option<DateTime<Utc>>,

    /// Token type reported by the provider (e.g. "Bearer")
    pub token_type: Option<String>,

    /// Scopes granted, space separated
    pub scope: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Credential {
    fn new(
        client_id: impl Into<String>,
        provider: Provider,
        credential_type: CredentialType,
        value: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            client_id: client_id.into(),
            provider,
            credential_type,
            value: value.into(),
            expires_at,
            token_type: None,
            scope: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create an access token credential
    pub fn access_token(
        client_id: impl Into<String>,
        provider: Provider,
        value: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        let mut cred = Self::new(
            client_id,
            provider,
            CredentialType::AccessToken,
            value,
            expires_at,
        );
        cred.token_type = Some("Bearer".to_string());
        cred
    }

    /// Create a refresh token credential
    pub fn refresh_token(
        client_id: impl Into<String>,
        provider: Provider,
        value: impl Into<String>,
    ) -> Self {
        Self::new(client_id, provider, CredentialType::RefreshToken, value, None)
    }

    pub fn with_scope(mut self, scope: Option<String>) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = Some(token_type.into());
        self
    }

    /// Check if this credential is past its expiry
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => exp <= Utc::now(),
            None => false,
        }
    }

    /// Check if this credential expires within `buffer_seconds`
    pub fn expires_within(&self, buffer_seconds: i64) -> bool {
        match self.expires_at {
            Some(exp) => exp <= Utc::now() + chrono::Duration::seconds(buffer_seconds),
            None => false,
        }
    }

    /// Associated data binding an encrypted value to its row.
    pub fn binding(&self) -> String {
        credential_binding(&self.client_id, self.provider, self.credential_type)
    }
}

/// Associated-data string for a (client, provider, kind) triple.
pub fn credential_binding(
    client_id: &str,
    provider: Provider,
    credential_type: CredentialType,
) -> String {
    format!("{}|{}|{}", client_id, provider.id(), credential_type.as_str())
}

// Manual Debug so the secret never ends up in logs via `{:?}`.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("client_id", &self.client_id)
            .field("provider", &self.provider)
            .field("credential_type", &self.credential_type)
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}
