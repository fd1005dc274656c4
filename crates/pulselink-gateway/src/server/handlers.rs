//! HTTP handlers for the gateway server

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
};
use chrono::{DateTime, NaiveDate, Utc};
use pulselink_core::{
    branding, ConnectError, DisconnectionDetector, Provider, ProviderData, ProviderResult,
    RequestParams,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::error::ApiError;
use crate::oauth::AuthorizationCallback;
use crate::services::{AuthorizationService, ProviderFacade};

type ApiResult<T> = Result<T, ApiError>;

/// Shared handler state. Every field is a read-only handle built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub authorization: Arc<AuthorizationService>,
    pub facade: Arc<ProviderFacade>,
    pub detector: Arc<DisconnectionDetector>,
    /// Browser destination after a successful callback
    pub post_connect_redirect: Option<String>,
}

impl axum::extract::FromRef<AppState> for Arc<DisconnectionDetector> {
    fn from_ref(state: &AppState) -> Self {
        state.detector.clone()
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    debug!("[Gateway] Health check");
    Json(HealthResponse {
        status: "ok",
        service: branding::IDENTIFIER,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Answer a bare `OPTIONS` request with permissive CORS headers.
pub async fn preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "*"),
            (header::ACCESS_CONTROL_MAX_AGE, "86400"),
        ],
    )
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "ok": false, "message": "Not found" })),
    )
}

// =============================================================================
// OAuth
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQuery {
    pub provider: Option<String>,
    pub client_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub ok: bool,
    pub url: String,
    pub provider: Provider,
    pub expires_at: DateTime<Utc>,
}

/// `GET /oauth-start?provider=gsc&clientId=...`
pub async fn oauth_start(
    State(state): State<AppState>,
    query: Result<Query<StartQuery>, QueryRejection>,
) -> ApiResult<Json<StartResponse>> {
    let Query(query) = query?;
    let provider = required(query.provider.as_deref(), "provider")?;

    let started = state
        .authorization
        .start(provider, query.client_id.as_deref().unwrap_or_default())
        .await?;

    Ok(Json(StartResponse {
        ok: true,
        url: started.url,
        provider: started.provider,
        expires_at: started.expires_at,
    }))
}

/// `GET /callback/{provider}?code=...&state=...`
///
/// Redirects the browser when a post-connect destination is configured,
/// otherwise answers with JSON.
pub async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    query: Result<Query<AuthorizationCallback>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(callback) = query.map_err(|_| {
        ApiError(ConnectError::InvalidCallback("malformed callback parameters".to_string()))
    })?;

    let completed = state
        .authorization
        .complete(
            &provider,
            callback.code.as_deref(),
            callback.state.as_deref(),
            callback.error_message().as_deref(),
        )
        .await?;

    if let Some(destination) = &state.post_connect_redirect {
        match url::Url::parse(destination) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("provider", completed.provider.id())
                    .append_pair("status", "connected");
                return Ok(Redirect::to(url.as_str()).into_response());
            }
            Err(e) => warn!("[Gateway] Ignoring invalid post-connect redirect: {}", e),
        }
    }

    Ok(Json(json!({
        "ok": true,
        "provider": completed.provider,
        "clientId": completed.client_id,
        "connected": true,
        "expiresAt": completed.expires_at,
        "offlineAccess": completed.has_refresh_token,
    }))
    .into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientProviderBody {
    pub client_id: Option<String>,
    pub provider: Option<String>,
}

impl ClientProviderBody {
    fn parse(&self) -> ApiResult<(&str, Provider)> {
        let provider: Provider = required(self.provider.as_deref(), "provider")?.parse()?;
        Ok((self.client_id.as_deref().unwrap_or_default(), provider))
    }
}

/// `POST /oauth-refresh {clientId, provider}`
pub async fn oauth_refresh(
    State(state): State<AppState>,
    body: Result<Json<ClientProviderBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body?;
    let (client_id, provider) = body.parse()?;

    let access = state.authorization.refresh(client_id, provider).await?;
    Ok(Json(json!({
        "ok": true,
        "provider": provider,
        "expiresAt": access.expires_at,
    })))
}

/// `POST /oauth-disconnect {clientId, provider}`
pub async fn oauth_disconnect(
    State(state): State<AppState>,
    body: Result<Json<ClientProviderBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body?;
    let (client_id, provider) = body.parse()?;

    let removed = state.authorization.disconnect(client_id, provider).await?;
    Ok(Json(json!({
        "ok": true,
        "provider": provider,
        "removed": removed,
    })))
}

// =============================================================================
// Connections
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionsQuery {
    pub client_id: Option<String>,
    /// Comma separated provider ids to check; defaults to every provider
    pub required: Option<String>,
}

/// `GET /connections?clientId=...&required=ga4,gsc`
pub async fn connections(
    State(detector): State<Arc<DisconnectionDetector>>,
    query: Result<Query<ConnectionsQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let client_id = crate::services::validate_client_id(query.client_id.as_deref().unwrap_or_default())?;

    let status = detector.status(client_id).await?;
    let missing = match query.required.as_deref().filter(|r| !r.trim().is_empty()) {
        Some(required) => {
            let required = required
                .split(',')
                .map(|p| p.trim().parse::<Provider>())
                .collect::<Result<Vec<_>, _>>()?;
            detector.missing_providers(client_id, &required).await?
        }
        None => status.missing.clone(),
    };

    Ok(Json(json!({
        "ok": true,
        "clientId": status.client_id,
        "connected": status.connected,
        "missing": missing,
    })))
}

// =============================================================================
// Provider data
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuery {
    pub client_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub property_id: Option<String>,
    pub site_url: Option<String>,
    pub account_id: Option<String>,
}

impl DataQuery {
    fn params(&self) -> ApiResult<RequestParams> {
        Ok(RequestParams {
            start_date: parse_date(self.start_date.as_deref(), "startDate")?,
            end_date: parse_date(self.end_date.as_deref(), "endDate")?,
            property_id: self.property_id.clone(),
            site_url: self.site_url.clone(),
            account_id: self.account_id.clone(),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataResponse {
    pub ok: bool,
    pub provider: Provider,
    #[serde(flatten)]
    pub result: ProviderResult<ProviderData>,
}

/// `GET /providers/{provider}/data?clientId=...`
pub async fn provider_data(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    query: Result<Query<DataQuery>, QueryRejection>,
) -> ApiResult<Json<DataResponse>> {
    let provider: Provider = provider.parse()?;
    let Query(query) = query?;
    let params = query.params()?;
    let client_id = query.client_id.as_deref().unwrap_or_default();

    refresh_if_needed(&state, client_id, provider).await;
    let result = state.facade.fetch_data(provider, client_id, &params).await?;

    Ok(Json(DataResponse {
        ok: true,
        provider,
        result,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientQuery {
    pub client_id: Option<String>,
}

/// `GET /gsc/sites?clientId=...`
///
/// 404 when the client never connected Search Console.
pub async fn gsc_sites(
    State(state): State<AppState>,
    query: Result<Query<ClientQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let client_id = query.client_id.as_deref().unwrap_or_default();

    refresh_if_needed(&state, client_id, Provider::Gsc).await;
    let result = state.facade.list_sites_connected(client_id).await?;

    Ok(Json(json!({
        "success": true,
        "connected": result.connected(),
        "source": result.source(),
        "sites": result.data(),
    })))
}

/// Caller-side refresh ahead of a data request. Failures only degrade the
/// following fetch, so they are logged and swallowed.
async fn refresh_if_needed(state: &AppState, client_id: &str, provider: Provider) {
    if let Err(e) = state.authorization.ensure_fresh(client_id, provider).await {
        match e {
            ConnectError::InvalidRequest(_) => {}
            other => warn!(provider = %provider, "[Gateway] Token refresh before fetch failed: {}", other),
        }
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> ApiResult<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError(ConnectError::InvalidRequest(format!("{} is required", name))))
}

fn parse_date(value: Option<&str>, name: &str) -> ApiResult<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d").map(Some).map_err(|_| {
            ApiError(ConnectError::InvalidRequest(format!(
                "{} must be YYYY-MM-DD, got {:?}",
                name, v
            )))
        }),
    }
}
