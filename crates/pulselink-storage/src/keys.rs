//! Master key provisioning.
//!
//! The credential encryption key is held by the server process and supplied
//! through configuration as 64 hex characters. It is kept in zeroizing
//! buffers and never written to the database.

use anyhow::{Context, Result};
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto::KEY_SIZE;

/// Source of the master encryption key.
pub trait MasterKeyProvider: Send + Sync {
    /// Return the master key.
    fn master_key(&self) -> Result<Zeroizing<[u8; KEY_SIZE]>>;
}

/// Key provider backed by a key loaded once at startup.
pub struct StaticKeyProvider {
    key: Zeroizing<[u8; KEY_SIZE]>,
}

impl StaticKeyProvider {
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self {
            key: Zeroizing::new(key),
        }
    }

    /// Parse a hex-encoded 256-bit key.
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let bytes = Zeroizing::new(
            hex::decode(hex_key.trim()).context("Master key is not valid hex")?,
        );

        if bytes.len() != KEY_SIZE {
            anyhow::bail!(
                "Invalid master key size: expected {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            );
        }

        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        key.copy_from_slice(&bytes);
        debug!("Loaded master key from configuration");
        Ok(Self { key })
    }
}

impl MasterKeyProvider for StaticKeyProvider {
    fn master_key(&self) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
        Ok(Zeroizing::new(*self.key))
    }
}

// Manual Debug so the key bytes never end up in logs.
impl std::fmt::Debug for StaticKeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticKeyProvider")
            .field("key", &"[REDACTED]")
            .finish()
    }
}
