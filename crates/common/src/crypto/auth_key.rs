use std::fmt;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

use super::seed::DERIVED_SEED_SIZE;
use super::KeyError;

/// Size of Ed25519 public key in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;
/// Size of Ed25519 signature in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// Public half of an account's signing identity
///
/// The same 32 bytes appear, behind a variant byte and checksum, in the
/// account number. Serialized as hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AuthPublicKey([u8; PUBLIC_KEY_SIZE]);

impl From<[u8; PUBLIC_KEY_SIZE]> for AuthPublicKey {
    fn from(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        AuthPublicKey(bytes)
    }
}

impl TryFrom<&[u8]> for AuthPublicKey {
    type Error = KeyError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(KeyError::InvalidPublicKey(format!(
                "expected {} bytes, got {}",
                PUBLIC_KEY_SIZE,
                bytes.len()
            )));
        }
        let mut buff = [0; PUBLIC_KEY_SIZE];
        buff.copy_from_slice(bytes);
        Ok(buff.into())
    }
}

impl AuthPublicKey {
    /// Parse a public key from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0; PUBLIC_KEY_SIZE];
        hex::decode_to_slice(hex, &mut buff)
            .map_err(|_| KeyError::InvalidPublicKey("hex decode error".to_string()))?;
        Ok(buff.into())
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify an Ed25519 signature on a message.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The public key bytes are not a valid curve point
    /// - The signature does not verify
    pub fn verify(&self, msg: &[u8], signature: &[u8]) -> Result<(), KeyError> {
        let verifying_key = VerifyingKey::from_bytes(&self.0)
            .map_err(|_| KeyError::InvalidPublicKey("not a valid ed25519 point".to_string()))?;
        let signature = ed25519_dalek::Signature::from_slice(signature)
            .map_err(|_| KeyError::InvalidSignature)?;
        verifying_key
            .verify_strict(msg, &signature)
            .map_err(|_| KeyError::InvalidSignature)
    }
}

impl fmt::Display for AuthPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for AuthPublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AuthPublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let hex = String::deserialize(deserializer)?;
        AuthPublicKey::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

/// Deterministic Ed25519 signing identity
///
/// Built once from the signing sub-seed of a root seed; the same seed always
/// yields the same keypair, which is what makes phrase recovery work. The
/// private scalar is wiped on drop.
pub struct AuthKey {
    signing_key: SigningKey,
}

impl fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthKey")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl AuthKey {
    /// Build the signing keypair from a 32-byte seed
    pub fn from_seed(seed: &[u8; DERIVED_SEED_SIZE]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn public_key(&self) -> AuthPublicKey {
        AuthPublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message, returning the 64-byte detached signature
    pub fn sign(&self, msg: &[u8]) -> [u8; SIGNATURE_SIZE] {
        self.signing_key.sign(msg).to_bytes()
    }
}
