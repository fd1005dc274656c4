//! Authorization Service
//!
//! Drives the OAuth lifecycle for one (client, provider) pair:
//!
//! 1. `start` builds the consent URL and persists the issued state.
//! 2. `complete` validates and consumes that state, exchanges the code and
//!    persists the token set in one transaction.
//! 3. `refresh` / `ensure_fresh` renew the access token on demand.
//! 4. `disconnect` removes everything stored for the pair.
//!
//! A failed exchange writes nothing; the caller restarts the whole flow.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use pulselink_core::{
    short_state, AuthorizationState, AuthorizationStateRepository, ConnectError, ConnectResult,
    Credential, CredentialRepository, CredentialType, Provider,
};
use tracing::{debug, error, info, warn};

use super::validate_client_id;
use crate::oauth::OAuthFlow;

/// Refresh when the access token expires within this many seconds.
const REFRESH_BUFFER_SECS: i64 = 60;

/// Result of `start`.
#[derive(Debug, Clone)]
pub struct StartedAuthorization {
    pub provider: Provider,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of a successful callback.
#[derive(Debug, Clone)]
pub struct CompletedAuthorization {
    pub client_id: String,
    pub provider: Provider,
    pub expires_at: Option<DateTime<Utc>>,
    pub has_refresh_token: bool,
}

pub struct AuthorizationService {
    flow: Arc<OAuthFlow>,
    credentials: Arc<dyn CredentialRepository>,
    states: Arc<dyn AuthorizationStateRepository>,
    state_ttl: Duration,
}

impl AuthorizationService {
    pub fn new(
        flow: Arc<OAuthFlow>,
        credentials: Arc<dyn CredentialRepository>,
        states: Arc<dyn AuthorizationStateRepository>,
        state_ttl: Duration,
    ) -> Self {
        Self {
            flow,
            credentials,
            states,
            state_ttl,
        }
    }

    /// Begin authorization for `provider_id` on behalf of `client_id`.
    ///
    /// An unsupported provider fails before anything is generated or stored.
    pub async fn start(&self, provider_id: &str, client_id: &str) -> ConnectResult<StartedAuthorization> {
        let provider: Provider = provider_id.trim().parse()?;
        let client_id = validate_client_id(client_id)?;

        let request = self.flow.build_authorization_url(provider).map_err(|e| {
            if let ConnectError::MissingConfiguration(what) = &e {
                error!(provider = %provider, "[OAuth] Cannot start authorization: {} is not configured", what);
            }
            e
        })?;

        if let Err(e) = self.states.cleanup_expired().await {
            warn!("[OAuth] Failed to clean up expired states: {:#}", e);
        }

        let state = AuthorizationState::new(
            request.state.as_str(),
            client_id,
            provider,
            request.pkce_verifier.as_str(),
            request.redirect_uri.as_str(),
            self.state_ttl,
        );
        self.states.save(&state).await?;

        info!(
            client_id = %client_id,
            provider = %provider,
            state = %state.short_state(),
            "[OAuth] Authorization started"
        );

        Ok(StartedAuthorization {
            provider,
            url: request.authorization_url,
            expires_at: state.expires_at,
        })
    }

    /// Handle the provider redirect (Token Exchange Handler).
    pub async fn complete(
        &self,
        provider_id: &str,
        code: Option<&str>,
        state: Option<&str>,
        provider_error: Option<&str>,
    ) -> ConnectResult<CompletedAuthorization> {
        let provider: Provider = provider_id.parse().map_err(|_| {
            ConnectError::InvalidCallback(format!("unsupported provider {:?}", provider_id))
        })?;

        let state = state.map(str::trim).filter(|s| !s.is_empty());
        let code = code.map(str::trim).filter(|c| !c.is_empty());

        // A denied consent still burns the state so it cannot be replayed
        if let Some(provider_error) = provider_error {
            if let Some(state) = state {
                self.states.consume(state).await?;
            }
            info!(provider = %provider, "[OAuth] Authorization denied by user: {}", provider_error);
            return Err(ConnectError::InvalidCallback(format!(
                "authorization was not granted ({})",
                provider_error
            )));
        }

        let state = state.ok_or_else(|| ConnectError::InvalidCallback("missing state".to_string()))?;
        let pending = self.states.consume(state).await?.ok_or_else(|| {
            warn!(
                provider = %provider,
                state = %short_state(state),
                "[OAuth] Callback with unknown or already used state"
            );
            ConnectError::InvalidCallback("unknown or already used state".to_string())
        })?;

        if pending.is_expired() {
            warn!(state = %pending.short_state(), "[OAuth] Callback with expired state");
            return Err(ConnectError::InvalidCallback("authorization state expired".to_string()));
        }
        if pending.provider != provider {
            warn!(
                state = %pending.short_state(),
                expected = %pending.provider,
                received = %provider,
                "[OAuth] Callback provider does not match issued state"
            );
            return Err(ConnectError::InvalidCallback(
                "state was issued for a different provider".to_string(),
            ));
        }

        let code = code.ok_or_else(|| ConnectError::InvalidCallback("missing code".to_string()))?;

        let token = self
            .flow
            .exchange_code(code, &pending.redirect_uri, &pending.pkce_verifier)
            .await?;

        let expires_at = token.expires_at;
        let credentials = token.into_credentials(&pending.client_id, provider);
        let has_refresh_token = credentials
            .iter()
            .any(|c| c.credential_type == CredentialType::RefreshToken);
        if !has_refresh_token {
            warn!(
                client_id = %pending.client_id,
                provider = %provider,
                "[OAuth] Provider issued no refresh token; access will lapse at expiry"
            );
        }

        self.credentials.save_all(&credentials).await?;

        info!(
            client_id = %pending.client_id,
            provider = %provider,
            "[OAuth] Provider connected"
        );

        Ok(CompletedAuthorization {
            client_id: pending.client_id,
            provider,
            expires_at,
            has_refresh_token,
        })
    }

    /// Renew the access token with the stored refresh token.
    pub async fn refresh(&self, client_id: &str, provider: Provider) -> ConnectResult<Credential> {
        let client_id = validate_client_id(client_id)?;
        let refresh = self
            .credentials
            .get(client_id, provider, CredentialType::RefreshToken)
            .await?
            .ok_or_else(|| ConnectError::CredentialNotFound {
                client_id: client_id.to_string(),
                provider,
            })?;

        let token = self.flow.refresh_token(&refresh.value).await?;
        let credentials = token.into_credentials(client_id, provider);
        self.credentials.save_all(&credentials).await?;

        info!(client_id = %client_id, provider = %provider, "[OAuth] Access token refreshed");

        credentials
            .into_iter()
            .find(|c| c.credential_type == CredentialType::AccessToken)
            .ok_or_else(|| ConnectError::Internal(anyhow::anyhow!("refresh produced no access token")))
    }

    /// Refresh the access token when it is expired or about to expire.
    ///
    /// Returns `true` when a refresh happened. Clients without a stored
    /// access token or without a refresh token are left untouched.
    pub async fn ensure_fresh(&self, client_id: &str, provider: Provider) -> ConnectResult<bool> {
        let client_id = validate_client_id(client_id)?;
        let Some(access) = self
            .credentials
            .get(client_id, provider, CredentialType::AccessToken)
            .await?
        else {
            return Ok(false);
        };

        if !access.expires_within(REFRESH_BUFFER_SECS) {
            return Ok(false);
        }

        let has_refresh = self
            .credentials
            .get(client_id, provider, CredentialType::RefreshToken)
            .await?
            .is_some();
        if !has_refresh {
            debug!(client_id = %client_id, provider = %provider, "[OAuth] Access token expiring, no refresh token");
            return Ok(false);
        }

        self.refresh(client_id, provider).await?;
        Ok(true)
    }

    /// Remove every credential stored for (client, provider).
    pub async fn disconnect(&self, client_id: &str, provider: Provider) -> ConnectResult<usize> {
        let client_id = validate_client_id(client_id)?;
        let removed = self.credentials.delete_all(client_id, provider).await?;
        info!(
            client_id = %client_id,
            provider = %provider,
            removed,
            "[OAuth] Provider disconnected"
        );
        Ok(removed)
    }
}
