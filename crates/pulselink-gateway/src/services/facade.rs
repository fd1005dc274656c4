//! Provider API Client Facade
//!
//! The single entry point for provider data. Every call returns a
//! [`ProviderResult`] tagged live or fallback:
//!
//! - no stored access token: fallback, `connected = false`, no network call
//! - stored but expired access token: fallback, degraded
//! - upstream failure of any kind: fallback, degraded, logged here
//! - success: live
//!
//! Only malformed request parameters and storage failures are returned as
//! errors. One attempt per call, no retries.

use std::sync::Arc;

use chrono::Utc;
use pulselink_core::{
    ConnectError, ConnectResult, CredentialRepository, CredentialType, FallbackDataProvider,
    Provider, ProviderData, ProviderResult, RequestParams, ResolvedParams, SearchConsoleSite,
};
use tracing::{debug, info, warn};

use super::validate_client_id;
use crate::providers::ProviderClients;

/// Stored access token, classified.
enum AccessToken {
    Missing,
    Expired,
    Usable(String),
}

pub struct ProviderFacade {
    credentials: Arc<dyn CredentialRepository>,
    clients: Arc<ProviderClients>,
    fallback: FallbackDataProvider,
}

impl ProviderFacade {
    pub fn new(
        credentials: Arc<dyn CredentialRepository>,
        clients: Arc<ProviderClients>,
        fallback: FallbackDataProvider,
    ) -> Self {
        Self {
            credentials,
            clients,
            fallback,
        }
    }

    /// Live data for (client, provider) or deterministic fallback data.
    pub async fn fetch_data(
        &self,
        provider: Provider,
        client_id: &str,
        params: &RequestParams,
    ) -> ConnectResult<ProviderResult<ProviderData>> {
        let client_id = validate_client_id(client_id)?;
        let resolved = params.resolve(Utc::now().date_naive())?;

        let token = match self.access_token(client_id, provider).await? {
            AccessToken::Usable(token) => token,
            AccessToken::Missing => {
                return Ok(ProviderResult::not_connected(
                    self.fallback.generate(provider, &resolved),
                ))
            }
            AccessToken::Expired => {
                return Ok(ProviderResult::degraded(self.fallback.generate(provider, &resolved)))
            }
        };

        match self.clients.get(provider).fetch(&token, &resolved).await {
            Ok(data) => {
                debug!(client_id = %client_id, provider = %provider, "[Facade] Returning live data");
                Ok(ProviderResult::live(data))
            }
            Err(e @ ConnectError::InvalidRequest(_)) => Err(e),
            Err(e) => {
                warn!(
                    client_id = %client_id,
                    provider = %provider,
                    "[Facade] Live fetch failed, serving fallback data: {}",
                    e
                );
                Ok(ProviderResult::degraded(self.fallback.generate(provider, &resolved)))
            }
        }
    }

    /// Search Console sites, falling back to demo sites when not connected.
    pub async fn list_sites(&self, client_id: &str) -> ConnectResult<ProviderResult<Vec<SearchConsoleSite>>> {
        let client_id = validate_client_id(client_id)?;
        match self.list_sites_connected(client_id).await {
            Err(ConnectError::CredentialNotFound { .. }) => Ok(ProviderResult::not_connected(
                self.fallback.sites(&self.default_params()?),
            )),
            other => other,
        }
    }

    /// Search Console sites for a client that must have a stored credential.
    ///
    /// Fails with `CredentialNotFound` when nothing is stored; upstream
    /// failures still degrade to demo sites.
    pub async fn list_sites_connected(
        &self,
        client_id: &str,
    ) -> ConnectResult<ProviderResult<Vec<SearchConsoleSite>>> {
        let client_id = validate_client_id(client_id)?;
        let sites = match self.access_token(client_id, Provider::Gsc).await? {
            AccessToken::Missing => {
                return Err(ConnectError::CredentialNotFound {
                    client_id: client_id.to_string(),
                    provider: Provider::Gsc,
                })
            }
            AccessToken::Expired => Err(ConnectError::UpstreamDataFailure {
                provider: Provider::Gsc,
                message: "access token expired".to_string(),
            }),
            AccessToken::Usable(token) => self.clients.gsc().list_sites(&token).await,
        };

        match sites {
            Ok(sites) => Ok(ProviderResult::live(sites)),
            Err(e) => {
                warn!(
                    client_id = %client_id,
                    "[Facade] Listing Search Console sites failed, serving demo sites: {}",
                    e
                );
                Ok(ProviderResult::degraded(self.fallback.sites(&self.default_params()?)))
            }
        }
    }

    async fn access_token(&self, client_id: &str, provider: Provider) -> ConnectResult<AccessToken> {
        let credential = self
            .credentials
            .get(client_id, provider, CredentialType::AccessToken)
            .await?;

        Ok(match credential {
            None => {
                info!(
                    client_id = %client_id,
                    provider = %provider,
                    "[Facade] Provider not connected"
                );
                AccessToken::Missing
            }
            Some(credential) if credential.is_expired() => {
                warn!(
                    client_id = %client_id,
                    provider = %provider,
                    "[Facade] Stored access token expired, serving fallback data"
                );
                AccessToken::Expired
            }
            Some(credential) => AccessToken::Usable(credential.value),
        })
    }

    fn default_params(&self) -> ConnectResult<ResolvedParams> {
        RequestParams::default().resolve(Utc::now().date_naive())
    }
}
