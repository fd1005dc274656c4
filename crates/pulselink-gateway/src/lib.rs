//! Pulselink Gateway
//!
//! HTTP service that connects client accounts to Google data providers:
//! - OAuth 2.0 authorization code flow with PKCE, per provider
//! - Token refresh and disconnection
//! - Provider API adapters (GA4, Search Console, Business Profile)
//! - Live-or-fallback data facade
//! - Dependency Injection for clean architecture

pub mod config;
pub mod logging;
pub mod oauth;
pub mod providers;
pub mod server;
pub mod services;

pub use config::{GatewayConfig, GoogleEndpoints, OAuthAppConfig, PulselinkConfig};
pub use oauth::{OAuthFlow, OAuthToken};
pub use providers::{ProviderClient, ProviderClients};
pub use server::{ApiError, AppState, DependenciesBuilder, GatewayDependencies, GatewayServer};
pub use services::{AuthorizationService, ProviderFacade};
