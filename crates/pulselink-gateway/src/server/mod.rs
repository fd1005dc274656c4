//! Gateway Server
//!
//! HTTP surface for the OAuth lifecycle and provider data. Self-contained
//! with dependency injection: every repository, the outbound client and the
//! upstream endpoints come in through `GatewayDependencies`.

mod dependencies;
mod error;
mod handlers;
pub mod logging_middleware;
pub mod rate_limit;

pub use dependencies::{DependenciesBuilder, GatewayDependencies};
pub use error::ApiError;
pub use handlers::AppState;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use pulselink_core::{DisconnectionDetector, FallbackDataProvider};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::oauth::OAuthFlow;
use crate::providers::ProviderClients;
use crate::services::{AuthorizationService, ProviderFacade};

/// Pulselink gateway server.
pub struct GatewayServer {
    config: GatewayConfig,
    dependencies: GatewayDependencies,
    state: AppState,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig, dependencies: GatewayDependencies) -> Self {
        info!("[Gateway] Initializing with dependency injection...");

        let flow = Arc::new(OAuthFlow::new(
            dependencies.http_client.clone(),
            dependencies.endpoints.clone(),
            dependencies.oauth.clone(),
        ));
        let clients = Arc::new(ProviderClients::new(
            dependencies.http_client.clone(),
            dependencies.endpoints.api_base_override.as_deref(),
        ));

        let state = AppState {
            authorization: Arc::new(AuthorizationService::new(
                flow,
                dependencies.credential_repo.clone(),
                dependencies.state_repo.clone(),
                dependencies.state_ttl,
            )),
            facade: Arc::new(ProviderFacade::new(
                dependencies.credential_repo.clone(),
                clients,
                FallbackDataProvider::new(),
            )),
            detector: Arc::new(DisconnectionDetector::new(
                dependencies.credential_repo.clone(),
            )),
            post_connect_redirect: dependencies.oauth.post_connect_redirect.clone(),
        };

        info!("[Gateway] Services initialized successfully");

        Self {
            config,
            dependencies,
            state,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The fully layered router, ready to serve or to drive with `oneshot`.
    pub fn router(&self) -> Router {
        self.build_router()
    }

    fn build_router(&self) -> Router {
        // Rate limiter for OAuth endpoints (prevents state and token flooding)
        let rate_limiter = rate_limit::default_oauth_rate_limiter();

        let mut router = Router::new()
            .route("/health", get(handlers::health).options(handlers::preflight))
            // OAuth lifecycle
            .route(
                "/oauth-start",
                get(handlers::oauth_start).options(handlers::preflight),
            )
            .route(
                "/callback/{provider}",
                get(handlers::oauth_callback).options(handlers::preflight),
            )
            .route(
                "/oauth-refresh",
                post(handlers::oauth_refresh).options(handlers::preflight),
            )
            .route(
                "/oauth-disconnect",
                post(handlers::oauth_disconnect).options(handlers::preflight),
            )
            // Connection status
            .route(
                "/connections",
                get(handlers::connections).options(handlers::preflight),
            )
            // Provider data (live or fallback)
            .route(
                "/providers/{provider}/data",
                get(handlers::provider_data).options(handlers::preflight),
            )
            .route(
                "/gsc/sites",
                get(handlers::gsc_sites).options(handlers::preflight),
            )
            .fallback(handlers::not_found)
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            // Request/Response logging with body (DEBUG level)
            .layer(middleware::from_fn(
                logging_middleware::http_logging_middleware,
            ))
            // Rate limiting on OAuth endpoints
            .layer(middleware::from_fn_with_state(
                rate_limiter,
                rate_limit::rate_limit_middleware,
            ));

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            router = router.layer(cors);
        }

        router
    }

    /// Run until the process is stopped.
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run until `shutdown` resolves, then drain in-flight requests.
    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.addr()?;

        info!("[Gateway] Starting on {}", addr);
        info!(
            "[Gateway] CORS: {}",
            if self.config.enable_cors {
                "enabled"
            } else {
                "disabled"
            }
        );

        let oauth = &self.dependencies.oauth;
        match (oauth.require_client_id(), oauth.require_redirect_origin()) {
            (Ok(_), Ok(origin)) => info!("[Gateway] OAuth: configured (redirect origin {})", origin),
            (Err(e), _) | (_, Err(e)) => {
                warn!("[Gateway] OAuth: not configured ({}); /oauth-start will fail", e)
            }
        }

        match self.dependencies.state_repo.cleanup_expired().await {
            Ok(removed) if removed > 0 => {
                info!("[Gateway] Removed {} expired authorization states", removed)
            }
            Ok(_) => {}
            Err(e) => warn!("[Gateway] Failed to clean up authorization states: {}", e),
        }

        let router = self.build_router();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("[Gateway] Ready to accept connections at {}", self.config.base_url());

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("[Gateway] Stopped");
        Ok(())
    }

    /// Start the server in the background
    ///
    /// Returns a JoinHandle that can be used to wait for completion or abort.
    pub fn spawn(self) -> tokio::task::JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
