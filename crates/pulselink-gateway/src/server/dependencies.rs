//! Dependency Injection Container
//!
//! Everything the gateway talks to is injected here: repositories, the
//! outbound HTTP client and the upstream endpoints. Tests swap in an
//! in-memory database and a mock server base URL.

use std::sync::Arc;
use std::time::Duration;

use pulselink_core::{AuthorizationStateRepository, CredentialRepository, DEFAULT_STATE_TTL_SECS};
use pulselink_storage::{
    Database, FieldEncryptor, SqliteAuthorizationStateRepository, SqliteCredentialRepository,
};
use tokio::sync::Mutex;

use crate::config::{GoogleEndpoints, OAuthAppConfig, PulselinkConfig, DEFAULT_HTTP_TIMEOUT_SECS};

/// Dependency container for the gateway.
#[derive(Clone)]
pub struct GatewayDependencies {
    // Repositories (Data Layer)
    pub credential_repo: Arc<dyn CredentialRepository>,
    pub state_repo: Arc<dyn AuthorizationStateRepository>,

    /// Shared outbound client; carries the request timeout
    pub http_client: reqwest::Client,

    pub oauth: OAuthAppConfig,
    pub endpoints: GoogleEndpoints,
    /// Lifetime of an issued authorization state
    pub state_ttl: chrono::Duration,
}

/// Builder for GatewayDependencies
pub struct DependenciesBuilder {
    credential_repo: Option<Arc<dyn CredentialRepository>>,
    state_repo: Option<Arc<dyn AuthorizationStateRepository>>,
    http_client: Option<reqwest::Client>,
    http_timeout: Duration,
    oauth: OAuthAppConfig,
    endpoints: GoogleEndpoints,
    state_ttl: chrono::Duration,
}

impl DependenciesBuilder {
    pub fn new() -> Self {
        Self {
            credential_repo: None,
            state_repo: None,
            http_client: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            oauth: OAuthAppConfig::default(),
            endpoints: GoogleEndpoints::default(),
            state_ttl: chrono::Duration::seconds(DEFAULT_STATE_TTL_SECS),
        }
    }

    /// Seed OAuth, endpoint and timeout settings from a loaded config.
    pub fn from_config(config: &PulselinkConfig) -> Self {
        Self::new()
            .with_oauth_app(config.oauth.clone())
            .with_endpoints(config.endpoints.clone())
            .with_http_timeout(config.http_timeout)
            .with_state_ttl(config.state_ttl)
    }

    /// Use the SQLite repositories backed by `db`.
    pub fn with_database(mut self, db: Arc<Mutex<Database>>, encryptor: Arc<FieldEncryptor>) -> Self {
        self.credential_repo = Some(Arc::new(SqliteCredentialRepository::new(
            db.clone(),
            encryptor.clone(),
        )));
        self.state_repo = Some(Arc::new(SqliteAuthorizationStateRepository::new(db, encryptor)));
        self
    }

    pub fn with_credential_repo(mut self, repo: Arc<dyn CredentialRepository>) -> Self {
        self.credential_repo = Some(repo);
        self
    }

    pub fn with_state_repo(mut self, repo: Arc<dyn AuthorizationStateRepository>) -> Self {
        self.state_repo = Some(repo);
        self
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Timeout for the default HTTP client. Ignored when a client is injected.
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_oauth_app(mut self, oauth: OAuthAppConfig) -> Self {
        self.oauth = oauth;
        self
    }

    pub fn with_endpoints(mut self, endpoints: GoogleEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_state_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.state_ttl = ttl;
        self
    }

    pub fn build(self) -> Result<GatewayDependencies, String> {
        let http_client = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .timeout(self.http_timeout)
                .user_agent(concat!("pulselink/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| format!("failed to build HTTP client: {}", e))?,
        };

        Ok(GatewayDependencies {
            credential_repo: self.credential_repo.ok_or("credential_repo is required")?,
            state_repo: self.state_repo.ok_or("state_repo is required")?,
            http_client,
            oauth: self.oauth,
            endpoints: self.endpoints,
            state_ttl: self.state_ttl,
        })
    }
}

impl Default for DependenciesBuilder {
    fn default() -> Self {
        Self::new()
    }
}
