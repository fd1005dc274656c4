//! Google OAuth 2.0 authorization code flow with PKCE.
//!
//! Builds consent URLs from the provider registry and talks to the token
//! endpoint for code exchange and refresh grants. Every outbound call uses the
//! shared `reqwest::Client`, which carries the configured timeout.

use pulselink_core::{short_state, ConnectError, ConnectResult, Provider};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use super::pkce::{PkceChallenge, PKCE_METHOD};
use super::token::{OAuthToken, TokenResponse};
use crate::config::{GoogleEndpoints, OAuthAppConfig};

/// Authorization URL plus the secrets that must be kept until the callback.
#[derive(Clone)]
pub struct AuthorizationRequest {
    /// Consent URL to send the user to
    pub authorization_url: String,
    /// Anti-forgery state embedded in the URL
    pub state: String,
    /// PKCE verifier for the later token exchange
    pub pkce_verifier: String,
    /// Redirect URI embedded in the URL
    pub redirect_uri: String,
}

impl std::fmt::Debug for AuthorizationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationRequest")
            .field("state", &short_state(&self.state))
            .field("pkce_verifier", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// Query parameters Google appends to the redirect URI.
#[derive(Debug, Default, Deserialize)]
pub struct AuthorizationCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set instead of `code` when the user denied consent
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl AuthorizationCallback {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| match &self.error_description {
            Some(desc) => format!("{}: {}", e, desc),
            None => e.clone(),
        })
    }
}

/// Error body returned by Google's token endpoint.
#[derive(Deserialize)]
struct TokenErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// OAuth client for the registered Google application.
pub struct OAuthFlow {
    http: reqwest::Client,
    endpoints: GoogleEndpoints,
    app: OAuthAppConfig,
}

impl OAuthFlow {
    pub fn new(http: reqwest::Client, endpoints: GoogleEndpoints, app: OAuthAppConfig) -> Self {
        Self {
            http,
            endpoints,
            app,
        }
    }

    pub fn app(&self) -> &OAuthAppConfig {
        &self.app
    }

    /// `{origin}/callback/{provider}` for the configured redirect origin.
    pub fn redirect_uri(&self, provider: Provider) -> ConnectResult<String> {
        let origin = self.app.require_redirect_origin()?;
        Ok(format!("{}{}", origin, provider.callback_path()))
    }

    /// Build the consent URL for one provider.
    ///
    /// Requests exactly the provider's registered scopes, offline access and
    /// a forced consent prompt so Google issues a refresh token every time.
    pub fn build_authorization_url(&self, provider: Provider) -> ConnectResult<AuthorizationRequest> {
        let client_id = self.app.require_client_id()?;
        let redirect_uri = self.redirect_uri(provider)?;

        let state = generate_state();
        let pkce = PkceChallenge::generate();

        let mut url = Url::parse(&self.endpoints.authorization_endpoint).map_err(|e| {
            ConnectError::Internal(anyhow::anyhow!("Invalid authorization endpoint: {}", e))
        })?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("response_type", "code");
            query.append_pair("client_id", client_id);
            query.append_pair("redirect_uri", &redirect_uri);
            query.append_pair("scope", &provider.scopes().join(" "));
            query.append_pair("state", &state);
            query.append_pair("access_type", "offline");
            query.append_pair("prompt", "consent");
            query.append_pair("include_granted_scopes", "true");
            query.append_pair("code_challenge", &pkce.challenge);
            query.append_pair("code_challenge_method", PKCE_METHOD);
        }

        debug!(
            provider = %provider,
            state = %short_state(&state),
            "[OAuth] Built authorization URL"
        );

        Ok(AuthorizationRequest {
            authorization_url: url.to_string(),
            state,
            pkce_verifier: pkce.verifier,
            redirect_uri,
        })
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        pkce_verifier: &str,
    ) -> ConnectResult<OAuthToken> {
        info!("[OAuth] Exchanging authorization code for tokens");

        let client_id = self.app.require_client_id()?;
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", client_id),
            ("code_verifier", pkce_verifier),
        ];
        if let Some(secret) = self.app.client_secret() {
            params.push(("client_secret", secret));
        }

        let token = self.token_request(&params, "authorization_code").await?;
        info!("[OAuth] Token exchange successful");
        Ok(token)
    }

    /// Obtain a new access token with a refresh token.
    pub async fn refresh_token(&self, refresh_token: &str) -> ConnectResult<OAuthToken> {
        info!("[OAuth] Refreshing access token");

        let client_id = self.app.require_client_id()?;
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
        ];
        if let Some(secret) = self.app.client_secret() {
            params.push(("client_secret", secret));
        }

        let token = self.token_request(&params, "refresh_token").await?;
        info!("[OAuth] Token refresh successful");
        Ok(token)
    }

    async fn token_request(&self, params: &[(&str, &str)], grant: &str) -> ConnectResult<OAuthToken> {
        let response = self
            .http
            .post(&self.endpoints.token_endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(params)
            .send()
            .await
            .map_err(|e| {
                let status = if e.is_timeout() { 504 } else { 502 };
                warn!(grant, timeout = e.is_timeout(), "[OAuth] Token endpoint unreachable: {}", e);
                ConnectError::UpstreamAuthFailure {
                    status,
                    message: "token endpoint unreachable".to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            // Google's error bodies carry only an error code and description
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<TokenErrorBody>(&body) {
                Ok(err) => match err.error_description {
                    Some(desc) => format!("{}: {}", err.error, desc),
                    None => err.error,
                },
                Err(_) => format!("HTTP {}", status.as_u16()),
            };
            warn!(grant, status = status.as_u16(), "[OAuth] Token endpoint rejected request: {}", message);
            return Err(ConnectError::UpstreamAuthFailure {
                status: status.as_u16(),
                message,
            });
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            warn!(grant, "[OAuth] Malformed token response: {}", e);
            ConnectError::UpstreamAuthFailure {
                status: 502,
                message: "malformed token response".to_string(),
            }
        })?;

        OAuthToken::try_from(body).map_err(|e| {
            warn!(grant, "[OAuth] Token response carried an out-of-range expires_in");
            e
        })
    }
}

/// 16 random bytes, base64url encoded.
pub fn generate_state() -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use rand::RngCore;

    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
