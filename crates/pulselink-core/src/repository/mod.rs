//! Repository traits for data access
//!
//! These traits define the interface for data storage without specifying
//! the implementation (SQLite, in-memory, etc.)

use async_trait::async_trait;

use crate::domain::{AuthorizationState, Credential, CredentialType, Provider};

/// Result type for repository operations
pub type RepoResult<T> = anyhow::Result<T>;

/// Credential repository trait
///
/// Each credential is a separate row per (client, provider, type), so access
/// and refresh tokens have independent lifecycles. Writes upsert on that
/// triple; the last writer wins.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Get a specific credential by (client, provider, type)
    async fn get(
        &self,
        client_id: &str,
        provider: Provider,
        credential_type: CredentialType,
    ) -> RepoResult<Option<Credential>>;

    /// Save a credential (upsert by client_id + provider + credential_type)
    async fn save(&self, credential: &Credential) -> RepoResult<()>;

    /// Save several credentials atomically: either all rows are written or none
    async fn save_all(&self, credentials: &[Credential]) -> RepoResult<()>;

    /// Delete a specific credential by type
    async fn delete(
        &self,
        client_id: &str,
        provider: Provider,
        credential_type: CredentialType,
    ) -> RepoResult<()>;

    /// Delete all credentials for a (client, provider) pair.
    /// Returns the number of rows removed.
    async fn delete_all(&self, client_id: &str, provider: Provider) -> RepoResult<usize>;

    /// Providers for which the client has at least an access token, in canonical order
    async fn list_connected_providers(&self, client_id: &str) -> RepoResult<Vec<Provider>>;

    /// List all credentials for a client
    async fn list_for_client(&self, client_id: &str) -> RepoResult<Vec<Credential>>;
}

/// Pending authorization attempts, keyed by state value.
#[async_trait]
pub trait AuthorizationStateRepository: Send + Sync {
    /// Persist a freshly issued state
    async fn save(&self, state: &AuthorizationState) -> RepoResult<()>;

    /// Remove and return the state if it exists.
    ///
    /// A state is returned at most once; expired states are still returned
    /// so the caller can report expiry rather than "unknown state".
    async fn consume(&self, state: &str) -> RepoResult<Option<AuthorizationState>>;

    /// Delete every expired state. Returns the number removed.
    async fn cleanup_expired(&self) -> RepoResult<usize>;
}
