//! Gateway services
//!
//! - `AuthorizationService` owns the OAuth lifecycle (start, callback,
//!   refresh, disconnect) and is the only writer of credentials.
//! - `ProviderFacade` reads credentials and returns live or fallback data.

mod authorization;
mod facade;

pub use authorization::{AuthorizationService, CompletedAuthorization, StartedAuthorization};
pub use facade::ProviderFacade;

use pulselink_core::{ConnectError, ConnectResult};

const MAX_CLIENT_ID_LEN: usize = 128;

/// Validate a caller-supplied tenant id and return it trimmed.
pub(crate) fn validate_client_id(client_id: &str) -> ConnectResult<&str> {
    let client_id = client_id.trim();
    if client_id.is_empty() {
        return Err(ConnectError::InvalidRequest("clientId is required".to_string()));
    }
    if client_id.len() > MAX_CLIENT_ID_LEN || client_id.chars().any(char::is_control) {
        return Err(ConnectError::InvalidRequest("clientId is malformed".to_string()));
    }
    Ok(client_id)
}
