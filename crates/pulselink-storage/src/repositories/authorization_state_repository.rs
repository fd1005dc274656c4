//! SQLite implementation of AuthorizationStateRepository.
//!
//! A state row lives from the moment an authorization URL is issued until
//! the callback consumes it (or it expires). `consume` selects and deletes
//! under the same database lock, so a state can be redeemed at most once.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use pulselink_core::{short_state, AuthorizationState, AuthorizationStateRepository, Provider};
use rusqlite::{params, OptionalExtension};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::crypto::FieldEncryptor;
use crate::database::{from_db_time, to_db_time};
use crate::Database;

struct RawStateRow {
    state: String,
    client_id: String,
    service_name: String,
    pkce_verifier: String, // Encrypted
    redirect_uri: String,
    created_at: String,
    expires_at: String,
}

pub struct SqliteAuthorizationStateRepository {
    db: Arc<Mutex<Database>>,
    encryptor: Arc<FieldEncryptor>,
}

impl SqliteAuthorizationStateRepository {
    pub fn new(db: Arc<Mutex<Database>>, encryptor: Arc<FieldEncryptor>) -> Self {
        Self { db, encryptor }
    }

    fn build_state(&self, row: RawStateRow) -> Result<AuthorizationState> {
        let provider: Provider = row
            .service_name
            .parse()
            .with_context(|| format!("Unknown service for state: {}", row.service_name))?;
        let verifier = self
            .encryptor
            .decrypt(&row.pkce_verifier, &row.state)
            .context("Failed to decrypt PKCE verifier")?;

        Ok(AuthorizationState {
            pkce_verifier: verifier.to_string(),
            client_id: row.client_id,
            provider,
            redirect_uri: row.redirect_uri,
            created_at: from_db_time(&row.created_at)?,
            expires_at: from_db_time(&row.expires_at)?,
            state: row.state,
        })
    }
}

#[async_trait]
impl AuthorizationStateRepository for SqliteAuthorizationStateRepository {
    async fn save(&self, state: &AuthorizationState) -> Result<()> {
        let encrypted_verifier = self
            .encryptor
            .encrypt(&state.pkce_verifier, &state.state)
            .context("Failed to encrypt PKCE verifier")?;

        let db = self.db.lock().await;
        db.connection().execute(
            "INSERT INTO authorization_states (state, client_id, service_name, pkce_verifier, redirect_uri, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                state.state,
                state.client_id,
                state.provider.id(),
                encrypted_verifier,
                state.redirect_uri,
                to_db_time(&state.created_at),
                to_db_time(&state.expires_at),
            ],
        )?;

        debug!(
            client_id = %state.client_id,
            provider = %state.provider,
            state = %state.short_state(),
            "[OAuth] Stored authorization state"
        );
        Ok(())
    }

    async fn consume(&self, state: &str) -> Result<Option<AuthorizationState>> {
        let db = self.db.lock().await;

        let row = db.transaction(|conn| {
            let row = conn
                .query_row(
                    "SELECT state, client_id, service_name, pkce_verifier, redirect_uri, created_at, expires_at
                     FROM authorization_states WHERE state = ?1",
                    params![state],
                    |row| {
                        Ok(RawStateRow {
                            state: row.get(0)?,
                            client_id: row.get(1)?,
                            service_name: row.get(2)?,
                            pkce_verifier: row.get(3)?,
                            redirect_uri: row.get(4)?,
                            created_at: row.get(5)?,
                            expires_at: row.get(6)?,
                        })
                    },
                )
                .optional()?;

            if row.is_some() {
                // Delete the state (one-time use)
                conn.execute(
                    "DELETE FROM authorization_states WHERE state = ?1",
                    params![state],
                )?;
            }
            Ok(row)
        })?;

        match row {
            Some(raw) => {
                debug!(
                    state = %short_state(state),
                    "[OAuth] Consumed authorization state"
                );
                self.build_state(raw).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn cleanup_expired(&self) -> Result<usize> {
        let db = self.db.lock().await;
        let deleted = db.connection().execute(
            "DELETE FROM authorization_states WHERE expires_at <= ?1",
            params![to_db_time(&Utc::now())],
        )?;
        if deleted > 0 {
            info!("[OAuth] Cleaned up {} expired authorization states", deleted);
        }
        Ok(deleted)
    }
}
