//! Single-use content keys
//!
//! Private asset content is encrypted under a fresh symmetric key with a
//! fixed all-zero nonce. That is only safe because each key encrypts exactly
//! one plaintext, so the key types make reuse unrepresentable:
//!
//! - [`DataKey::generate`] returns a [`FreshDataKey`], the only type that can
//!   encrypt. [`FreshDataKey::encrypt`] consumes it.
//! - Encrypting hands back a [`DataKey`], which can decrypt and be wrapped into
//!   session data but can never encrypt again.
//! - A key recovered from session data is a [`DataKey`] too.
//!
//! Neither type implements `Clone`, and the key bytes are wiped on drop.

use std::fmt;
use std::str::FromStr;

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::CipherError;

/// Size of a content key in bytes (256 bits)
pub const DATA_KEY_SIZE: usize = 32;

/// Symmetric algorithm a content key is used with
///
/// Carried as a string tag inside session data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DataKeyAlgorithm {
    #[default]
    #[serde(rename = "chacha20poly1305")]
    ChaCha20Poly1305,
}

impl DataKeyAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKeyAlgorithm::ChaCha20Poly1305 => "chacha20poly1305",
        }
    }
}

impl fmt::Display for DataKeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported data key algorithm: {0}")]
pub struct UnsupportedAlgorithm(pub String);

impl FromStr for DataKeyAlgorithm {
    type Err = UnsupportedAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chacha20poly1305" => Ok(DataKeyAlgorithm::ChaCha20Poly1305),
            other => Err(UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// A content key that has already encrypted its one plaintext, or was
/// recovered from session data. Decrypt-only.
///
/// The key bytes never leave the crate:
///
/// ```compile_fail
/// use common::crypto::DataKey;
///
/// let (_, key) = DataKey::generate().encrypt(b"content").unwrap();
/// let DataKey { key: raw, .. } = key;
/// ```
pub struct DataKey {
    algorithm: DataKeyAlgorithm,
    key: Zeroizing<[u8; DATA_KEY_SIZE]>,
}

impl fmt::Debug for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataKey({})", self.algorithm)
    }
}

/// A freshly generated content key that has not encrypted anything yet
pub struct FreshDataKey(DataKey);

impl fmt::Debug for FreshDataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FreshDataKey({})", self.0.algorithm)
    }
}

impl DataKey {
    /// Generate a new random content key, one per asset upload
    pub fn generate() -> FreshDataKey {
        Self::generate_for(DataKeyAlgorithm::default())
    }

    pub fn generate_for(algorithm: DataKeyAlgorithm) -> FreshDataKey {
        let mut key = Zeroizing::new([0u8; DATA_KEY_SIZE]);
        getrandom::getrandom(&mut key[..]).expect("failed to generate random bytes");
        FreshDataKey(DataKey { algorithm, key })
    }

    /// Rebuild a decrypt-only key from raw bytes and its algorithm tag
    pub(crate) fn from_parts(
        algorithm: DataKeyAlgorithm,
        bytes: &[u8],
    ) -> Result<Self, CipherError> {
        if bytes.len() != DATA_KEY_SIZE {
            return Err(CipherError::DecryptionFailed);
        }
        let mut key = Zeroizing::new([0u8; DATA_KEY_SIZE]);
        key.copy_from_slice(bytes);
        Ok(DataKey { algorithm, key })
    }

    pub fn algorithm(&self) -> DataKeyAlgorithm {
        self.algorithm
    }

    /// Raw key bytes, only for wrapping into session data
    pub(crate) fn bytes(&self) -> &[u8] {
        self.key.as_slice()
    }

    /// Decrypt content encrypted by this key
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::DecryptionFailed`] if the tag does not verify
    /// (wrong key or altered content).
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        match self.algorithm {
            DataKeyAlgorithm::ChaCha20Poly1305 => {
                let cipher = ChaCha20Poly1305::new(Key::from_slice(self.bytes()));
                cipher
                    .decrypt(&Nonce::default(), ciphertext)
                    .map_err(|_| CipherError::DecryptionFailed)
            }
        }
    }
}

impl FreshDataKey {
    pub fn algorithm(&self) -> DataKeyAlgorithm {
        self.0.algorithm
    }

    /// Encrypt one plaintext, consuming the key
    ///
    /// Output is `ciphertext || tag (16 bytes)` under the all-zero nonce.
    /// Returns the ciphertext and the now decrypt-only key.
    pub fn encrypt(self, plaintext: &[u8]) -> Result<(Vec<u8>, DataKey), CipherError> {
        let ciphertext = match self.0.algorithm {
            DataKeyAlgorithm::ChaCha20Poly1305 => {
                let cipher = ChaCha20Poly1305::new(Key::from_slice(self.0.bytes()));
                cipher
                    .encrypt(&Nonce::default(), plaintext)
                    .map_err(|_| CipherError::EncryptionFailed)?
            }
        };
        Ok((ciphertext, self.0))
    }
}
