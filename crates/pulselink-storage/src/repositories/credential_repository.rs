//! SQLite implementation of CredentialRepository with typed rows and encryption.
//!
//! Each credential is stored as a separate row per (client, provider, type).
//! Only the secret value is encrypted; metadata (type, expiry, scope) is plaintext.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use pulselink_core::{credential_binding, Credential, CredentialRepository, CredentialType, Provider};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::crypto::FieldEncryptor;
use crate::database::{from_db_time, to_db_time};
use crate::Database;

/// Raw row data extracted from SQLite before decryption.
struct RawCredentialRow {
    client_id: String,
    service_name: String,
    credential_type: String,
    credential_value: String, // Encrypted
    expires_at: Option<String>,
    token_type: Option<String>,
    scope: Option<String>,
    created_at: String,
    updated_at: String,
}

/// SQLite-backed credential repository with field-level encryption.
///
/// The encrypted value is bound to its (client, provider, type) triple, so
/// a ciphertext moved to another row no longer decrypts.
pub struct SqliteCredentialRepository {
    db: Arc<Mutex<Database>>,
    encryptor: Arc<FieldEncryptor>,
}

impl SqliteCredentialRepository {
    /// Create a new credential repository.
    pub fn new(db: Arc<Mutex<Database>>, encryptor: Arc<FieldEncryptor>) -> Self {
        Self { db, encryptor }
    }

    /// Standard column list for SELECT queries.
    const SELECT_COLUMNS: &'static str =
        "client_id, service_name, credential_type, credential_value, expires_at, token_type, scope, created_at, updated_at";

    /// Extract raw row data from a rusqlite Row.
    fn extract_row(row: &rusqlite::Row) -> rusqlite::Result<RawCredentialRow> {
        Ok(RawCredentialRow {
            client_id: row.get(0)?,
            service_name: row.get(1)?,
            credential_type: row.get(2)?,
            credential_value: row.get(3)?,
            expires_at: row.get(4)?,
            token_type: row.get(5)?,
            scope: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    /// Build a Credential from extracted row data (needs &self for decryption).
    fn build_credential(&self, row: RawCredentialRow) -> Result<Credential> {
        let provider: Provider = row
            .service_name
            .parse()
            .with_context(|| format!("Unknown service in credentials table: {}", row.service_name))?;
        let credential_type = CredentialType::parse(&row.credential_type)
            .ok_or_else(|| anyhow::anyhow!("Unknown credential type: {}", row.credential_type))?;

        let aad = credential_binding(&row.client_id, provider, credential_type);
        let value = self
            .encryptor
            .decrypt(&row.credential_value, &aad)
            .with_context(|| {
                format!(
                    "Failed to decrypt {} {} credential for client {}",
                    provider, credential_type, row.client_id
                )
            })?;

        Ok(Credential {
            client_id: row.client_id,
            provider,
            credential_type,
            value: value.to_string(),
            expires_at: row.expires_at.as_deref().map(from_db_time).transpose()?,
            token_type: row.token_type,
            scope: row.scope,
            created_at: from_db_time(&row.created_at)?,
            updated_at: from_db_time(&row.updated_at)?,
        })
    }

    /// Upsert one credential on an open connection (or transaction).
    fn upsert(&self, conn: &Connection, credential: &Credential) -> Result<()> {
        let encrypted_value = self
            .encryptor
            .encrypt(&credential.value, &credential.binding())
            .context("Failed to encrypt credential value")?;

        conn.execute(
            "INSERT INTO credentials (id, client_id, service_name, credential_type, credential_value, expires_at, token_type, scope, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(client_id, service_name, credential_type) DO UPDATE SET
                credential_value = excluded.credential_value,
                expires_at = excluded.expires_at,
                token_type = excluded.token_type,
                scope = excluded.scope,
                updated_at = excluded.updated_at",
            params![
                Uuid::new_v4().to_string(),
                credential.client_id,
                credential.provider.id(),
                credential.credential_type.as_str(),
                encrypted_value,
                credential.expires_at.as_ref().map(to_db_time),
                credential.token_type,
                credential.scope,
                to_db_time(&credential.created_at),
                to_db_time(&credential.updated_at),
            ],
        )?;

        debug!(
            client_id = %credential.client_id,
            provider = %credential.provider,
            credential_type = %credential.credential_type,
            "[Store] Saved credential"
        );
        Ok(())
    }
}

#[async_trait]
impl CredentialRepository for SqliteCredentialRepository {
    async fn get(
        &self,
        client_id: &str,
        provider: Provider,
        credential_type: CredentialType,
    ) -> Result<Option<Credential>> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM credentials WHERE client_id = ?1 AND service_name = ?2 AND credential_type = ?3",
            Self::SELECT_COLUMNS
        ))?;

        let row = stmt
            .query_row(
                params![client_id, provider.id(), credential_type.as_str()],
                Self::extract_row,
            )
            .optional()?;

        row.map(|raw| self.build_credential(raw)).transpose()
    }

    async fn save(&self, credential: &Credential) -> Result<()> {
        let db = self.db.lock().await;
        self.upsert(db.connection(), credential)
    }

    async fn save_all(&self, credentials: &[Credential]) -> Result<()> {
        let db = self.db.lock().await;
        db.transaction(|conn| {
            for credential in credentials {
                self.upsert(conn, credential)?;
            }
            Ok(())
        })
    }

    async fn delete(
        &self,
        client_id: &str,
        provider: Provider,
        credential_type: CredentialType,
    ) -> Result<()> {
        let db = self.db.lock().await;
        db.connection().execute(
            "DELETE FROM credentials WHERE client_id = ?1 AND service_name = ?2 AND credential_type = ?3",
            params![client_id, provider.id(), credential_type.as_str()],
        )?;
        Ok(())
    }

    async fn delete_all(&self, client_id: &str, provider: Provider) -> Result<usize> {
        let db = self.db.lock().await;
        let deleted = db.connection().execute(
            "DELETE FROM credentials WHERE client_id = ?1 AND service_name = ?2",
            params![client_id, provider.id()],
        )?;
        debug!(
            client_id = %client_id,
            provider = %provider,
            deleted,
            "[Store] Deleted credentials"
        );
        Ok(deleted)
    }

    async fn list_connected_providers(&self, client_id: &str) -> Result<Vec<Provider>> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let mut stmt = conn.prepare(
            "SELECT DISTINCT service_name FROM credentials WHERE client_id = ?1 AND credential_type = ?2",
        )?;
        let names: Vec<String> = stmt
            .query_map(
                params![client_id, CredentialType::AccessToken.as_str()],
                |row| row.get(0),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        // Rows for providers no longer in the registry are ignored
        let mut providers: Vec<Provider> =
            names.iter().filter_map(|name| name.parse().ok()).collect();
        providers.sort();
        Ok(providers)
    }

    async fn list_for_client(&self, client_id: &str) -> Result<Vec<Credential>> {
        let db = self.db.lock().await;
        let conn = db.connection();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM credentials WHERE client_id = ?1 ORDER BY service_name, credential_type",
            Self::SELECT_COLUMNS
        ))?;

        let rows: Vec<_> = stmt
            .query_map(params![client_id], Self::extract_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(|r| self.build_credential(r)).collect()
    }
}
