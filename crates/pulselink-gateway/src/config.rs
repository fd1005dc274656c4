//! Gateway configuration.
//!
//! Everything is read from `PULSELINK_*` environment variables. The binary
//! loads `.env` first, so the same keys work from a file during development.
//! Missing OAuth application settings do not stop the server from starting;
//! they surface as `MissingConfiguration` when a flow actually needs them.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use pulselink_core::{branding, ConnectError, ConnectResult, DEFAULT_STATE_TTL_SECS};
use zeroize::Zeroizing;

/// Google's OAuth 2.0 authorization endpoint.
pub const GOOGLE_AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google's OAuth 2.0 token endpoint.
pub const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Default timeout for every outbound HTTP call.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: branding::DEFAULT_GATEWAY_PORT,
            enable_cors: true,
        }
    }
}

impl GatewayConfig {
    /// Socket address to bind.
    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }

    /// Base URL of the running gateway.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// The registered Google OAuth application.
#[derive(Clone, Default)]
pub struct OAuthAppConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Public origin the provider redirects back to (`{origin}/callback/{provider}`).
    pub redirect_origin: Option<String>,
    /// Browser destination after a successful callback. JSON is returned when unset.
    pub post_connect_redirect: Option<String>,
}

impl OAuthAppConfig {
    pub fn require_client_id(&self) -> ConnectResult<&str> {
        self.client_id
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConnectError::MissingConfiguration("OAuth client id"))
    }

    pub fn require_redirect_origin(&self) -> ConnectResult<&str> {
        let origin = self
            .redirect_origin
            .as_deref()
            .map(|v| v.trim().trim_end_matches('/'))
            .filter(|v| !v.is_empty())
            .ok_or(ConnectError::MissingConfiguration("redirect origin"))?;

        match url::Url::parse(origin) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(origin),
            _ => Err(ConnectError::MissingConfiguration("valid redirect origin")),
        }
    }

    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref().filter(|v| !v.is_empty())
    }
}

impl std::fmt::Debug for OAuthAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthAppConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("redirect_origin", &self.redirect_origin)
            .field("post_connect_redirect", &self.post_connect_redirect)
            .finish()
    }
}

/// Upstream Google endpoints.
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    /// Replaces every provider API base URL (used to point adapters at a mock server).
    pub api_base_override: Option<String>,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            authorization_endpoint: GOOGLE_AUTHORIZATION_ENDPOINT.to_string(),
            token_endpoint: GOOGLE_TOKEN_ENDPOINT.to_string(),
            api_base_override: None,
        }
    }
}

impl GoogleEndpoints {
    /// Point every endpoint at a single base URL.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            authorization_endpoint: format!("{}/o/oauth2/v2/auth", base),
            token_endpoint: format!("{}/token", base),
            api_base_override: Some(base.to_string()),
        }
    }
}

/// Complete server configuration.
#[derive(Clone)]
pub struct PulselinkConfig {
    pub gateway: GatewayConfig,
    pub oauth: OAuthAppConfig,
    pub endpoints: GoogleEndpoints,
    pub database_path: Option<PathBuf>,
    pub master_key: Option<Zeroizing<String>>,
    pub http_timeout: Duration,
    pub state_ttl: chrono::Duration,
}

impl Default for PulselinkConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            oauth: OAuthAppConfig::default(),
            endpoints: GoogleEndpoints::default(),
            database_path: None,
            master_key: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            state_ttl: chrono::Duration::seconds(DEFAULT_STATE_TTL_SECS),
        }
    }
}

impl PulselinkConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup (keys are full `PULSELINK_*` names).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&branding::env_var(name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();

        if let Some(host) = get("HOST") {
            config.gateway.host = host;
        }
        if let Some(port) = get("PORT") {
            config.gateway.port = port
                .parse()
                .with_context(|| format!("{} must be a port number", branding::env_var("PORT")))?;
        }
        if let Some(cors) = get("ENABLE_CORS") {
            config.gateway.enable_cors = parse_bool(&cors).with_context(|| {
                format!("{} must be true or false", branding::env_var("ENABLE_CORS"))
            })?;
        }

        config.oauth = OAuthAppConfig {
            client_id: get("GOOGLE_CLIENT_ID"),
            client_secret: get("GOOGLE_CLIENT_SECRET"),
            redirect_origin: get("REDIRECT_ORIGIN"),
            post_connect_redirect: get("POST_CONNECT_REDIRECT"),
        };

        config.database_path = get("DATABASE_PATH").map(PathBuf::from);
        config.master_key = get("MASTER_KEY").map(Zeroizing::new);

        if let Some(secs) = get("HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().with_context(|| {
                format!("{} must be a number of seconds", branding::env_var("HTTP_TIMEOUT_SECS"))
            })?;
            if secs == 0 {
                anyhow::bail!("{} must be positive", branding::env_var("HTTP_TIMEOUT_SECS"));
            }
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = get("STATE_TTL_SECS") {
            let secs: i64 = secs.parse().with_context(|| {
                format!("{} must be a number of seconds", branding::env_var("STATE_TTL_SECS"))
            })?;
            if secs <= 0 {
                anyhow::bail!("{} must be positive", branding::env_var("STATE_TTL_SECS"));
            }
            config.state_ttl = chrono::Duration::seconds(secs);
        }

        Ok(config)
    }
}

impl std::fmt::Debug for PulselinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PulselinkConfig")
            .field("gateway", &self.gateway)
            .field("oauth", &self.oauth)
            .field("endpoints", &self.endpoints)
            .field("database_path", &self.database_path)
            .field("master_key", &self.master_key.as_ref().map(|_| "[REDACTED]"))
            .field("http_timeout", &self.http_timeout)
            .field("state_ttl", &self.state_ttl)
            .finish()
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("not a boolean: {}", other),
    }
}
