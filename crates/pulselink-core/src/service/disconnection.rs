//! Disconnection detector
//!
//! Reports which required providers a client has not connected, in canonical
//! provider order so UI messaging is stable across calls.

use std::sync::Arc;

use tracing::debug;

use crate::domain::Provider;
use crate::repository::{CredentialRepository, RepoResult};

/// Connection summary for one client.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub client_id: String,
    pub connected: Vec<Provider>,
    pub missing: Vec<Provider>,
}

pub struct DisconnectionDetector {
    credentials: Arc<dyn CredentialRepository>,
}

impl DisconnectionDetector {
    pub fn new(credentials: Arc<dyn CredentialRepository>) -> Self {
        Self { credentials }
    }

    /// `required` minus the client's connected providers, canonical order, no duplicates.
    pub async fn missing_providers(
        &self,
        client_id: &str,
        required: &[Provider],
    ) -> RepoResult<Vec<Provider>> {
        let connected = self.credentials.list_connected_providers(client_id).await?;
        let missing = missing_from(required, &connected);
        debug!(
            client_id = %client_id,
            missing = ?missing,
            "[Connections] Computed missing providers"
        );
        Ok(missing)
    }

    /// Connected and missing providers (against the full registry).
    pub async fn status(&self, client_id: &str) -> RepoResult<ConnectionStatus> {
        let mut connected = self.credentials.list_connected_providers(client_id).await?;
        connected.sort();
        connected.dedup();
        let missing = missing_from(&Provider::ALL, &connected);
        Ok(ConnectionStatus {
            client_id: client_id.to_string(),
            connected,
            missing,
        })
    }
}

fn missing_from(required: &[Provider], connected: &[Provider]) -> Vec<Provider> {
    Provider::ALL
        .into_iter()
        .filter(|p| required.contains(p) && !connected.contains(p))
        .collect()
}
