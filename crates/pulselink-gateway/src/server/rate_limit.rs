//! Per-caller rate limiting on the OAuth endpoints.
//!
//! Fixed windows counted per (route prefix, caller) in a DashMap. The caller
//! is the `clientId` query parameter when present, otherwise the peer
//! address, so one tenant cannot exhaust another tenant's budget.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use dashmap::DashMap;
use serde_json::json;
use tracing::warn;

use super::logging_middleware::client_from_query;

/// Bucket count above which expired windows are swept.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitConfig {
    pub fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60),
        }
    }
}

/// Shared limiter state (clone-friendly via Arc).
#[derive(Clone)]
pub struct RateLimiter {
    /// (path prefix, caller) -> (window start, count)
    buckets: Arc<DashMap<(String, String), (Instant, u32)>>,
    rules: Arc<Vec<(String, RateLimitConfig)>>,
}

impl RateLimiter {
    pub fn new(rules: Vec<(String, RateLimitConfig)>) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            rules: Arc::new(rules),
        }
    }

    /// `true` if `caller` is within limits for `path`.
    pub fn check(&self, path: &str, caller: &str) -> bool {
        let Some((prefix, config)) = self.rules.iter().find(|(prefix, _)| path.starts_with(prefix.as_str()))
        else {
            return true;
        };

        if self.buckets.len() > PRUNE_THRESHOLD {
            self.prune();
        }

        let mut entry = self
            .buckets
            .entry((prefix.clone(), caller.to_string()))
            .or_insert_with(|| (Instant::now(), 0));
        let (window_start, count) = entry.value_mut();

        if window_start.elapsed() >= config.window {
            *window_start = Instant::now();
            *count = 1;
            return true;
        }
        if *count >= config.max_requests {
            return false;
        }
        *count += 1;
        true
    }

    /// Drop buckets whose window has already closed.
    fn prune(&self) {
        let rules = self.rules.clone();
        self.buckets.retain(|(prefix, _), (window_start, _)| {
            rules
                .iter()
                .find(|(p, _)| p == prefix)
                .is_some_and(|(_, config)| window_start.elapsed() < config.window)
        });
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

/// Rate-limit key for a request: `clientId` from the query, else the peer IP.
fn caller_key(request: &Request) -> String {
    if let Some(client) = client_from_query(request.uri().query()).filter(|c| !c.is_empty()) {
        return format!("client:{}", client);
    }
    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => format!("ip:{}", addr.ip()),
        None => "anonymous".to_string(),
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let caller = caller_key(&request);
    let path = request.uri().path();
    if !limiter.check(path, &caller) {
        warn!("[Gateway] Rate limit exceeded for {}", path);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "ok": false,
                "code": "rate_limited",
                "message": "Rate limit exceeded. Please try again later.",
            })),
        )
            .into_response();
    }

    next.run(request).await
}

/// Limits for the OAuth endpoints.
pub fn default_oauth_rate_limiter() -> RateLimiter {
    RateLimiter::new(vec![
        ("/oauth-start".to_string(), RateLimitConfig::per_minute(30)),
        ("/callback/".to_string(), RateLimitConfig::per_minute(60)),
        ("/oauth-refresh".to_string(), RateLimitConfig::per_minute(60)),
    ])
}
