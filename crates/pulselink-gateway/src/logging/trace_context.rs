//! Trace context for request correlation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tracing::{info, info_span, warn, Span};

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Short trace id: 6 hex characters (e.g. "a1b2c3").
pub fn generate_trace_id() -> String {
    let counter = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0);

    format!("{:06x}", counter.wrapping_add(timestamp) & 0xFF_FFFF)
}

/// Correlation data for one request.
#[derive(Debug, Clone)]
pub struct TraceContext {
    pub trace_id: String,
    pub method: String,
    /// Path only, never the query string
    pub path: String,
    /// Tenant the request acts for, when known
    pub client_id: Option<String>,
    pub started_at: Instant,
}

impl TraceContext {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            trace_id: generate_trace_id(),
            method: method.to_string(),
            path: path.to_string(),
            client_id: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_client(mut self, client_id: Option<String>) -> Self {
        self.client_id = client_id.filter(|c| !c.is_empty());
        self
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    /// Client id truncated to 12 characters, or "anon".
    pub fn short_client(&self) -> &str {
        match &self.client_id {
            Some(c) => {
                let end = c.char_indices().nth(12).map(|(i, _)| i).unwrap_or(c.len());
                &c[..end]
            }
            None => "anon",
        }
    }
}

/// Span and log-line helpers for a request.
pub struct RequestSpan;

impl RequestSpan {
    /// Span carrying the trace id into every child log line.
    pub fn enter(ctx: &TraceContext) -> Span {
        info_span!(
            "request",
            trace_id = %ctx.trace_id,
            method = %ctx.method,
            path = %ctx.path,
        )
    }

    pub fn log_entry(ctx: &TraceContext) {
        info!(
            trace_id = %ctx.trace_id,
            "→ {} {} client={}",
            ctx.method,
            ctx.path,
            ctx.short_client()
        );
    }

    pub fn log_exit(ctx: &TraceContext, status: u16) {
        let elapsed = ctx.elapsed_ms();
        if status >= 500 {
            warn!(trace_id = %ctx.trace_id, "← {} ({}ms)", status, elapsed);
        } else {
            info!(trace_id = %ctx.trace_id, "← {} ({}ms)", status, elapsed);
        }
    }
}
