//! Error taxonomy for the authorization and data-access subsystem.
//!
//! Only configuration and input-validation errors are meant to reach an end
//! user as hard failures. Upstream data failures are absorbed by the facade
//! into a degraded [`ProviderResult`](crate::ProviderResult).

use thiserror::Error;

use crate::domain::Provider;

/// Result alias used by services.
pub type ConnectResult<T> = Result<T, ConnectError>;

/// Every failure the subsystem can signal.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Caller-supplied provider is not in the registry.
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Server-side OAuth application id or redirect origin is absent.
    #[error("Missing server configuration: {0}")]
    MissingConfiguration(&'static str),

    /// Missing or malformed `code`/`state` at the callback.
    #[error("Invalid callback: {0}")]
    InvalidCallback(String),

    /// Token endpoint rejected the exchange or refresh.
    #[error("Authorization with the provider failed (HTTP {status})")]
    UpstreamAuthFailure { status: u16, message: String },

    /// No stored credential for the requested (client, provider).
    #[error("No {provider} credential stored for client {client_id}")]
    CredentialNotFound { client_id: String, provider: Provider },

    /// Provider REST call failed after a credential existed.
    #[error("{provider} API request failed: {message}")]
    UpstreamDataFailure { provider: Provider, message: String },

    /// Malformed data-request parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Storage, encryption or other unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ConnectError {
    /// Short machine-readable code for API responses and logs.
    pub fn code(&self) -> &'static str {
        match self {
            ConnectError::UnsupportedProvider(_) => "unsupported_provider",
            ConnectError::MissingConfiguration(_) => "missing_configuration",
            ConnectError::InvalidCallback(_) => "invalid_callback",
            ConnectError::UpstreamAuthFailure { .. } => "upstream_auth_failure",
            ConnectError::CredentialNotFound { .. } => "credential_not_found",
            ConnectError::UpstreamDataFailure { .. } => "upstream_data_failure",
            ConnectError::InvalidRequest(_) => "invalid_request",
            ConnectError::Internal(_) => "internal_error",
        }
    }

    /// Message safe to return to callers.
    ///
    /// Internal errors are collapsed so storage details never leave the process.
    pub fn public_message(&self) -> String {
        match self {
            ConnectError::Internal(_) => "Unexpected internal error".to_string(),
            ConnectError::UpstreamAuthFailure { status, .. } => format!(
                "Authorization failed (provider returned HTTP {}); please restart the connection flow",
                status
            ),
            other => other.to_string(),
        }
    }
}
