//! Key-agreement identity used to wrap content keys for a recipient
//!
//! An X25519 keypair derived from the encryption sub-seed. Payloads are
//! sealed with a NaCl box (X25519 + XSalsa20-Poly1305) between our private
//! key and the counterparty's public key, so the recipient must know the
//! sender's public key to open it and a box addressed to someone else fails
//! authentication.
//!
//! Box format: `nonce (24 bytes) || tag (16 bytes) || ciphertext`. The
//! keypair is long-lived, so every box gets a fresh random nonce.

use std::fmt;

use crypto_box::aead::generic_array::GenericArray;
use crypto_box::aead::Aead;
use crypto_box::SalsaBox;
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroizing;

use super::seed::DERIVED_SEED_SIZE;
use super::{CipherError, KeyError};

/// Size of an X25519 public key in bytes
pub const ENCR_PUBLIC_KEY_SIZE: usize = 32;
/// Size of the box nonce
pub const BOX_NONCE_SIZE: usize = 24;
/// Size of the Poly1305 tag
pub const BOX_TAG_SIZE: usize = 16;

/// Public half of an account's encryption identity
///
/// Published by the owner (see
/// [`EncryptionKeyRegistration`](super::EncryptionKeyRegistration)) so
/// others can wrap content keys for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncrPublicKey([u8; ENCR_PUBLIC_KEY_SIZE]);

impl From<[u8; ENCR_PUBLIC_KEY_SIZE]> for EncrPublicKey {
    fn from(bytes: [u8; ENCR_PUBLIC_KEY_SIZE]) -> Self {
        EncrPublicKey(bytes)
    }
}

impl TryFrom<&[u8]> for EncrPublicKey {
    type Error = KeyError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != ENCR_PUBLIC_KEY_SIZE {
            return Err(KeyError::InvalidPublicKey(format!(
                "encryption key must be {} bytes, got {}",
                ENCR_PUBLIC_KEY_SIZE,
                bytes.len()
            )));
        }
        let mut buff = [0; ENCR_PUBLIC_KEY_SIZE];
        buff.copy_from_slice(bytes);
        Ok(buff.into())
    }
}

impl EncrPublicKey {
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0; ENCR_PUBLIC_KEY_SIZE];
        hex::decode_to_slice(hex, &mut buff)
            .map_err(|_| KeyError::InvalidPublicKey("hex decode error".to_string()))?;
        Ok(buff.into())
    }

    pub fn to_bytes(&self) -> [u8; ENCR_PUBLIC_KEY_SIZE] {
        self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for EncrPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for EncrPublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for EncrPublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let hex = String::deserialize(deserializer)?;
        EncrPublicKey::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

/// Deterministic X25519 key-agreement identity
pub struct EncrKey {
    secret: StaticSecret,
    public: X25519PublicKey,
}

impl fmt::Debug for EncrKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncrKey")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl EncrKey {
    /// Build the keypair from a 32-byte seed; the seed is the private scalar
    pub fn from_seed(seed: &[u8; DERIVED_SEED_SIZE]) -> Self {
        let secret = StaticSecret::from(*seed);
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    pub fn public_key(&self) -> EncrPublicKey {
        EncrPublicKey(self.public.to_bytes())
    }

    fn salsa_box(&self, counterparty: &EncrPublicKey) -> SalsaBox {
        let secret = Zeroizing::new(self.secret.to_bytes());
        SalsaBox::new(
            &crypto_box::PublicKey::from(counterparty.to_bytes()),
            &crypto_box::SecretKey::from(*secret),
        )
    }

    /// Seal a small payload for `recipient`
    ///
    /// Meant for content keys, never for bulk content.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        recipient: &EncrPublicKey,
    ) -> Result<Vec<u8>, CipherError> {
        let mut nonce = [0u8; BOX_NONCE_SIZE];
        getrandom::getrandom(&mut nonce).map_err(|_| CipherError::EncryptionFailed)?;

        let sealed = self
            .salsa_box(recipient)
            .encrypt(&GenericArray::from(nonce), plaintext)
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut out = Vec::with_capacity(BOX_NONCE_SIZE + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Open a payload sealed by `sender` for us
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::DecryptionFailed`] if the box is truncated, was
    /// sealed for someone else, came from a different sender, or was altered.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        sender: &EncrPublicKey,
    ) -> Result<Zeroizing<Vec<u8>>, CipherError> {
        if ciphertext.len() < BOX_NONCE_SIZE + BOX_TAG_SIZE {
            return Err(CipherError::DecryptionFailed);
        }
        let (nonce, sealed) = ciphertext.split_at(BOX_NONCE_SIZE);
        let plaintext = self
            .salsa_box(sender)
            .decrypt(GenericArray::from_slice(nonce), sealed)
            .map_err(|_| CipherError::DecryptionFailed)?;
        Ok(Zeroizing::new(plaintext))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn key(byte: u8) -> EncrKey {
        EncrKey::from_seed(&[byte; DERIVED_SEED_SIZE])
    }

    #[test]
    fn test_from_seed_is_deterministic() {
        assert_eq!(key(1).public_key(), key(1).public_key());
        assert_ne!(key(1).public_key(), key(2).public_key());
    }

    #[test]
    fn test_encrypt_decrypt() {
        let alice = key(1);
        let bob = key(2);
        let payload = [42u8; 32];

        let sealed = alice.encrypt(&payload, &bob.public_key()).unwrap();
        assert_eq!(sealed.len(), BOX_NONCE_SIZE + BOX_TAG_SIZE + payload.len());

        let opened = bob.decrypt(&sealed, &alice.public_key()).unwrap();
        assert_eq!(opened.as_slice(), payload.as_slice());
    }

    #[test]
    fn test_nonce_is_fresh() {
        let alice = key(1);
        let bob = key(2);
        let a = alice.encrypt(b"same", &bob.public_key()).unwrap();
        let b = alice.encrypt(b"same", &bob.public_key()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_decrypt_failures() {
        let alice = key(1);
        let bob = key(2);
        let carol = key(3);
        let mut sealed = alice.encrypt(b"content key", &bob.public_key()).unwrap();

        // not addressed to carol
        assert!(matches!(
            carol.decrypt(&sealed, &alice.public_key()),
            Err(CipherError::DecryptionFailed)
        ));
        // wrong sender key
        assert!(matches!(
            bob.decrypt(&sealed, &carol.public_key()),
            Err(CipherError::DecryptionFailed)
        ));
        // truncated
        assert!(matches!(
            bob.decrypt(&sealed[..30], &alice.public_key()),
            Err(CipherError::DecryptionFailed)
        ));
        // tampered
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(matches!(
            bob.decrypt(&sealed, &alice.public_key()),
            Err(CipherError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_public_key_hex() {
        let public_key = key(5).public_key();
        assert_eq!(
            EncrPublicKey::from_hex(&public_key.to_hex()).unwrap(),
            public_key
        );
        assert!(EncrPublicKey::try_from(&[0u8; 31][..]).is_err());
    }
}
