//! HTTP error mapping.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pulselink_core::ConnectError;
use serde_json::json;
use tracing::{debug, error};

/// A `ConnectError` on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub ConnectError);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            ConnectError::UnsupportedProvider(_)
            | ConnectError::InvalidCallback(_)
            | ConnectError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ConnectError::CredentialNotFound { .. } => StatusCode::NOT_FOUND,
            ConnectError::UpstreamAuthFailure { .. } | ConnectError::UpstreamDataFailure { .. } => {
                StatusCode::BAD_GATEWAY
            }
            ConnectError::MissingConfiguration(_) | ConnectError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ConnectError> for ApiError {
    fn from(err: ConnectError) -> Self {
        Self(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(ConnectError::Internal(err))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(ConnectError::InvalidRequest(rejection.body_text()))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ConnectError::InvalidRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            match &self.0 {
                ConnectError::MissingConfiguration(what) => {
                    error!("[Gateway] Deployment misconfigured: {} is not set", what)
                }
                ConnectError::Internal(e) => error!("[Gateway] Internal error: {:#}", e),
                other => error!("[Gateway] {}", other),
            }
        } else {
            debug!(code = self.0.code(), "[Gateway] Request rejected: {}", self.0);
        }

        let body = Json(json!({
            "ok": false,
            "code": self.0.code(),
            "message": self.0.public_message(),
        }));
        (status, body).into_response()
    }
}
