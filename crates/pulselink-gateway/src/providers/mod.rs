//! Provider API adapters.
//!
//! One adapter per registry entry. Adapters only translate between Google's
//! REST payloads and the normalized shapes in `pulselink_core`; they never
//! fall back or retry. Any transport error, timeout, non-2xx status or
//! unparseable body becomes `ConnectError::UpstreamDataFailure`, which the
//! facade turns into a degraded result.

mod ga4;
mod gbp;
mod gsc;

pub use ga4::Ga4Client;
pub use gbp::GbpClient;
pub use gsc::GscClient;

use async_trait::async_trait;
use pulselink_core::{ConnectError, ConnectResult, Provider, ProviderData, ResolvedParams};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Live data source for one provider.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// Fetch normalized data with a bearer access token.
    async fn fetch(&self, access_token: &str, params: &ResolvedParams) -> ConnectResult<ProviderData>;
}

/// The full set of adapters, constructed once and shared.
pub struct ProviderClients {
    ga4: Ga4Client,
    gsc: GscClient,
    gbp: GbpClient,
}

impl ProviderClients {
    /// Build every adapter on a shared HTTP client.
    ///
    /// `api_base_override` replaces all registry API origins.
    pub fn new(http: reqwest::Client, api_base_override: Option<&str>) -> Self {
        Self {
            ga4: Ga4Client::new(http.clone(), api_base(Provider::Ga4, api_base_override)),
            gsc: GscClient::new(http.clone(), api_base(Provider::Gsc, api_base_override)),
            gbp: GbpClient::new(
                http,
                api_base(Provider::Gbp, api_base_override),
                aux_api_base(Provider::Gbp, api_base_override),
            ),
        }
    }

    pub fn get(&self, provider: Provider) -> &dyn ProviderClient {
        match provider {
            Provider::Ga4 => &self.ga4,
            Provider::Gsc => &self.gsc,
            Provider::Gbp => &self.gbp,
        }
    }

    pub fn gsc(&self) -> &GscClient {
        &self.gsc
    }
}

fn api_base(provider: Provider, api_base_override: Option<&str>) -> String {
    api_base_override
        .unwrap_or(provider.spec().api_base_url)
        .trim_end_matches('/')
        .to_string()
}

fn aux_api_base(provider: Provider, api_base_override: Option<&str>) -> String {
    match api_base_override {
        Some(base) => base.trim_end_matches('/').to_string(),
        None => provider
            .spec()
            .aux_api_base_url
            .unwrap_or(provider.spec().api_base_url)
            .trim_end_matches('/')
            .to_string(),
    }
}

pub(crate) fn upstream(provider: Provider, message: impl Into<String>) -> ConnectError {
    ConnectError::UpstreamDataFailure {
        provider,
        message: message.into(),
    }
}

/// Send an authenticated request and decode a JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: Provider,
    request: reqwest::RequestBuilder,
    access_token: &str,
) -> ConnectResult<T> {
    let response = request
        .bearer_auth(access_token)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                upstream(provider, "request timed out")
            } else {
                upstream(provider, format!("request failed: {}", e))
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(upstream(
            provider,
            format!("HTTP {}: {}", status.as_u16(), truncate(&body, 300)),
        ));
    }

    let body = response
        .json::<T>()
        .await
        .map_err(|e| upstream(provider, format!("malformed response: {}", e)))?;
    debug!(provider = %provider, "[Facade] Upstream call succeeded");
    Ok(body)
}

fn truncate(text: &str, max_chars: usize) -> String {
    let compact: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match compact.char_indices().nth(max_chars) {
        Some((i, _)) => format!("{}...", &compact[..i]),
        None => compact,
    }
}
