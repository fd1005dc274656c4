//! Field-level encryption for credential values.
//!
//! AES-256-GCM with a random 96-bit nonce per value. Every ciphertext is
//! sealed against associated data naming the row it belongs to, so a value
//! copied into another row (another client, provider or kind) fails to open.
//!
//! Stored format: `v1:` followed by hex(nonce || ciphertext || tag).

use anyhow::{Context, Result};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

/// Size of the encryption key (32 bytes = 256 bits).
pub const KEY_SIZE: usize = 32;

/// Size of the nonce (12 bytes for AES-GCM).
const NONCE_SIZE: usize = 12;

const FORMAT_PREFIX: &str = "v1:";

/// Encryptor for sensitive field data.
pub struct FieldEncryptor {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl FieldEncryptor {
    /// Create a new encryptor with the given master key.
    pub fn new(master_key: &[u8; KEY_SIZE]) -> Result<Self> {
        let unbound_key = UnboundKey::new(&AES_256_GCM, master_key)
            .map_err(|_| anyhow::anyhow!("Failed to create encryption key"))?;

        Ok(Self {
            key: LessSafeKey::new(unbound_key),
            rng: SystemRandom::new(),
        })
    }

    /// Encrypt `plaintext`, binding it to `associated_data`.
    pub fn encrypt(&self, plaintext: &str, associated_data: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| anyhow::anyhow!("Failed to generate nonce"))?;

        let mut sealed = plaintext.as_bytes().to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::from(associated_data.as_bytes()),
                &mut sealed,
            )
            .map_err(|_| anyhow::anyhow!("Encryption failed"))?;

        let mut envelope = Vec::with_capacity(NONCE_SIZE + sealed.len());
        envelope.extend_from_slice(&nonce_bytes);
        envelope.extend_from_slice(&sealed);

        Ok(format!("{}{}", FORMAT_PREFIX, hex::encode(envelope)))
    }

    /// Decrypt a value produced by [`encrypt`](Self::encrypt) with the same
    /// associated data.
    pub fn decrypt(&self, stored: &str, associated_data: &str) -> Result<Zeroizing<String>> {
        let encoded = stored
            .strip_prefix(FORMAT_PREFIX)
            .context("Unknown ciphertext format")?;
        let envelope = hex::decode(encoded).context("Invalid hex encoding")?;

        if envelope.len() < NONCE_SIZE + AES_256_GCM.tag_len() {
            anyhow::bail!("Ciphertext too short");
        }

        let (nonce_bytes, sealed) = envelope.split_at(NONCE_SIZE);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| anyhow::anyhow!("Invalid nonce"))?;

        let mut in_out = Zeroizing::new(sealed.to_vec());
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::from(associated_data.as_bytes()), &mut in_out)
            .map_err(|_| {
                anyhow::anyhow!("Decryption failed - wrong key, wrong row or corrupted data")
            })?;

        let text = std::str::from_utf8(plaintext).context("Decrypted data is not valid UTF-8")?;
        Ok(Zeroizing::new(text.to_string()))
    }
}

/// Generate a random master key.
pub fn generate_master_key() -> Result<[u8; KEY_SIZE]> {
    let rng = SystemRandom::new();
    let mut key = [0u8; KEY_SIZE];
    rng.fill(&mut key)
        .map_err(|_| anyhow::anyhow!("Failed to generate random key"))?;
    Ok(key)
}
