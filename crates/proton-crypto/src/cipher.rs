//! AES-256-GCM sealing of block contents.
//!
//! Every sealed block gets its own freshly generated [`Secret`]; the secret
//! travels next to the block address in a clef, never with the block itself.
//!
//! Wire format of a sealed payload: `nonce (12 bytes) || ciphertext || tag`.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of a block secret in bytes.
pub const SECRET_LENGTH: usize = 32;

/// Length of the AES-GCM nonce prefix in bytes.
pub const NONCE_LENGTH: usize = 12;

/// Errors from sealing and unsealing block contents.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("encryption failed")]
    EncryptFailed,

    #[error("decryption failed: wrong secret or corrupted ciphertext")]
    DecryptFailed,

    #[error("ciphertext too short: must be at least {NONCE_LENGTH} bytes")]
    CiphertextTooShort,
}

/// Symmetric key a single block is sealed under.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret([u8; SECRET_LENGTH]);

impl Secret {
    /// Generate a fresh random secret.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_LENGTH];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// The all-zero placeholder secret, used before a block is sealed.
    pub const fn null() -> Self {
        Self([0u8; SECRET_LENGTH])
    }

    /// Returns `true` for the placeholder secret.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; SECRET_LENGTH]
    }

    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; SECRET_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; SECRET_LENGTH] {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            write!(f, "Secret(null)")
        } else {
            write!(f, "Secret(<redacted>)")
        }
    }
}

/// Seal `plaintext` under `secret` with a random nonce.
pub fn encrypt(secret: &Secret, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
    let cipher = Aes256Gcm::new_from_slice(secret.as_bytes())
        .map_err(|_| CipherError::EncryptFailed)?;

    let mut nonce_bytes = [0u8; NONCE_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CipherError::EncryptFailed)?;

    let mut out = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Open data sealed by [`encrypt`].
///
/// A wrong secret and a tampered ciphertext are indistinguishable; both
/// yield [`CipherError::DecryptFailed`].
pub fn decrypt(secret: &Secret, data: &[u8]) -> Result<Vec<u8>, CipherError> {
    if data.len() < NONCE_LENGTH {
        return Err(CipherError::CiphertextTooShort);
    }

    let (nonce_bytes, ciphertext) = data.split_at(NONCE_LENGTH);
    let cipher = Aes256Gcm::new_from_slice(secret.as_bytes())
        .map_err(|_| CipherError::DecryptFailed)?;

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CipherError::DecryptFailed)
}
