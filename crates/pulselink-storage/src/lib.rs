//! Pulselink Storage Layer
//!
//! SQLite database with field-level encryption for credential values.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    Services                          │
//! ├──────────────────────────────────────────────────────┤
//! │               Repository Traits                      │
//! │ (CredentialRepository, AuthorizationStateRepository) │
//! ├──────────────────────────────────────────────────────┤
//! │            SQLite Implementations                    │
//! ├──────────────────────────────────────────────────────┤
//! │         FieldEncryptor (AES-256-GCM + AAD)           │
//! ├──────────────────────────────────────────────────────┤
//! │          MasterKeyProvider (server-held key)         │
//! ├──────────────────────────────────────────────────────┤
//! │                   Database                           │
//! │                   (SQLite)                           │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use pulselink_storage::{
//!     Database, FieldEncryptor, MasterKeyProvider, SqliteCredentialRepository,
//!     StaticKeyProvider,
//! };
//! use std::sync::Arc;
//! use tokio::sync::Mutex;
//!
//! let key_provider = StaticKeyProvider::from_hex(&master_key_hex)?;
//! let db = Arc::new(Mutex::new(Database::open(&path)?));
//! let master_key = key_provider.master_key()?;
//! let encryptor = Arc::new(FieldEncryptor::new(&master_key)?);
//! let credentials = SqliteCredentialRepository::new(db.clone(), encryptor);
//! ```

pub mod crypto;
mod database;
pub mod keys;
mod repositories;

pub use crypto::{generate_master_key, FieldEncryptor, KEY_SIZE};
pub use database::Database;
pub use keys::{MasterKeyProvider, StaticKeyProvider};
pub use repositories::*;

use pulselink_core::branding;

/// Get the default database path for the current platform.
pub fn default_database_path() -> Option<std::path::PathBuf> {
    dirs::data_local_dir().map(|p| p.join(branding::IDENTIFIER).join(branding::DATABASE_FILE))
}
