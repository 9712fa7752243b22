//! Content-key hand-off between owners
//!
//! Session data is how a content key travels: wrapped for exactly one
//! recipient and signed by the sender. It is produced for one recipient and
//! consumed once by that recipient.
//!
//! # Protocol
//!
//! To wrap a key for a recipient the sender:
//! 1. Seals the raw key bytes to the recipient's encryption public key
//!    ([`EncrKey::encrypt`])
//! 2. Signs the sealed bytes with their signing key
//! 3. Separately signs the raw key bytes
//!
//! To unwrap, the recipient:
//! 1. Opens the sealed key using the sender's encryption public key
//! 2. Verifies both signatures against the sender's signing public key
//!
//! The signature over the raw key binds the wrapping to a key the sender
//! actually held; a party that only re-encrypts opaque bytes cannot produce
//! it.
//!
//! On transfer the key itself is never rotated. The current owner unwraps
//! with the previous sender's public keys and wraps again for the next owner.
//!
//! # Wire format
//!
//! ```json
//! {
//!   "enc_data_key": "<hex>",
//!   "enc_data_key_sig": "<hex>",
//!   "data_key_sig": "<hex>",
//!   "data_key_alg": "chacha20poly1305"
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use super::auth_key::{AuthKey, AuthPublicKey};
use super::data_key::{DataKey, DataKeyAlgorithm};
use super::encr_key::{EncrKey, EncrPublicKey};
use super::CipherError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The wrapped key could not be opened with our key and the claimed
    /// sender's public key
    #[error("session data not for the recipient")]
    NotForRecipient,
    /// One of the two signatures did not verify against the sender
    #[error("session data not from the sender")]
    NotFromSender,
    #[error("failed to wrap data key: {0}")]
    Wrap(#[from] CipherError),
    #[error("session data encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// A content key wrapped for one recipient and signed by its sender
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(rename = "enc_data_key")]
    #[serde_as(as = "Hex")]
    encrypted_data_key: Vec<u8>,
    #[serde(rename = "enc_data_key_sig")]
    #[serde_as(as = "Hex")]
    encrypted_data_key_signature: Vec<u8>,
    #[serde(rename = "data_key_sig")]
    #[serde_as(as = "Hex")]
    data_key_signature: Vec<u8>,
    #[serde(rename = "data_key_alg")]
    data_key_algorithm: DataKeyAlgorithm,
}

impl SessionData {
    /// Wrap `key` for the holder of `recipient`
    pub fn wrap(
        auth_key: &AuthKey,
        encr_key: &EncrKey,
        key: &DataKey,
        recipient: &EncrPublicKey,
    ) -> Result<Self, SessionError> {
        let encrypted_data_key = encr_key.encrypt(key.bytes(), recipient)?;
        let encrypted_data_key_signature = auth_key.sign(&encrypted_data_key).to_vec();
        let data_key_signature = auth_key.sign(key.bytes()).to_vec();

        Ok(Self {
            encrypted_data_key,
            encrypted_data_key_signature,
            data_key_signature,
            data_key_algorithm: key.algorithm(),
        })
    }

    /// Recover the content key, checking it came from `sender_auth`
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotForRecipient`] if the key cannot be opened
    /// - [`SessionError::NotFromSender`] if either signature fails against
    ///   `sender_auth`
    pub fn unwrap(
        &self,
        encr_key: &EncrKey,
        sender_encr: &EncrPublicKey,
        sender_auth: &AuthPublicKey,
    ) -> Result<DataKey, SessionError> {
        let raw_key = encr_key
            .decrypt(&self.encrypted_data_key, sender_encr)
            .map_err(|_| {
                tracing::debug!("session data failed to open for this recipient");
                SessionError::NotForRecipient
            })?;

        let wrapped_ok = sender_auth
            .verify(&self.encrypted_data_key, &self.encrypted_data_key_signature)
            .is_ok();
        let raw_ok = sender_auth
            .verify(&raw_key, &self.data_key_signature)
            .is_ok();
        if !(wrapped_ok && raw_ok) {
            tracing::warn!(
                sender = %sender_auth,
                wrapped_ok,
                raw_ok,
                "session data signature check failed"
            );
            return Err(SessionError::NotFromSender);
        }

        DataKey::from_parts(self.data_key_algorithm, &raw_key)
            .map_err(|_| SessionError::NotForRecipient)
    }

    pub fn algorithm(&self) -> DataKeyAlgorithm {
        self.data_key_algorithm
    }

    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::seed::DERIVED_SEED_SIZE;

    struct Party {
        auth: AuthKey,
        encr: EncrKey,
    }

    fn party(byte: u8) -> Party {
        Party {
            auth: AuthKey::from_seed(&[byte; DERIVED_SEED_SIZE]),
            encr: EncrKey::from_seed(&[byte.wrapping_add(100); DERIVED_SEED_SIZE]),
        }
    }

    fn content_key() -> (Vec<u8>, DataKey) {
        DataKey::generate().encrypt(b"private asset content").unwrap()
    }

    #[test]
    fn test_wrap_unwrap() {
        let alice = party(1);
        let bob = party(2);
        let (ciphertext, key) = content_key();

        let session =
            SessionData::wrap(&alice.auth, &alice.encr, &key, &bob.encr.public_key()).unwrap();
        let recovered = session
            .unwrap(&bob.encr, &alice.encr.public_key(), &alice.auth.public_key())
            .unwrap();

        assert_eq!(recovered.bytes(), key.bytes());
        assert_eq!(
            recovered.decrypt(&ciphertext).unwrap(),
            b"private asset content".to_vec()
        );
    }

    #[test]
    fn test_wrong_recipient() {
        let alice = party(1);
        let bob = party(2);
        let carol = party(3);
        let (_, key) = content_key();

        let session =
            SessionData::wrap(&alice.auth, &alice.encr, &key, &bob.encr.public_key()).unwrap();
        assert!(matches!(
            session.unwrap(&carol.encr, &alice.encr.public_key(), &alice.auth.public_key()),
            Err(SessionError::NotForRecipient)
        ));
    }

    #[test]
    fn test_rejects_other_signer() {
        let alice = party(1);
        let bob = party(2);
        let mallory = party(4);
        let (_, key) = content_key();

        let session =
            SessionData::wrap(&alice.auth, &alice.encr, &key, &bob.encr.public_key()).unwrap();

        // decryption itself succeeds, but alice's signatures do not verify
        // against mallory's signing key
        assert!(matches!(
            session.unwrap(&bob.encr, &alice.encr.public_key(), &mallory.auth.public_key()),
            Err(SessionError::NotFromSender)
        ));
    }

    #[test]
    fn test_rejects_rewrapped_opaque_key() {
        let alice = party(1);
        let bob = party(2);
        let mallory = party(4);
        let (_, key) = content_key();

        // mallory encrypts the key to bob under their own encryption key and
        // signs the ciphertext, but reuses alice's signature over the raw key
        let genuine =
            SessionData::wrap(&alice.auth, &alice.encr, &key, &bob.encr.public_key()).unwrap();
        let encrypted = mallory.encr.encrypt(key.bytes(), &bob.encr.public_key()).unwrap();
        let forged = SessionData {
            encrypted_data_key_signature: alice.auth.sign(b"unrelated").to_vec(),
            encrypted_data_key: encrypted,
            data_key_signature: genuine.data_key_signature.clone(),
            data_key_algorithm: genuine.data_key_algorithm,
        };

        assert!(matches!(
            forged.unwrap(&bob.encr, &mallory.encr.public_key(), &alice.auth.public_key()),
            Err(SessionError::NotFromSender)
        ));
    }

    #[test]
    fn test_rejects_tampered_raw_signature() {
        let alice = party(1);
        let bob = party(2);
        let (_, key) = content_key();

        let mut session =
            SessionData::wrap(&alice.auth, &alice.encr, &key, &bob.encr.public_key()).unwrap();
        session.data_key_signature[0] ^= 0x01;
        assert!(matches!(
            session.unwrap(&bob.encr, &alice.encr.public_key(), &alice.auth.public_key()),
            Err(SessionError::NotFromSender)
        ));
    }

    #[test]
    fn test_json_shape() {
        let alice = party(1);
        let bob = party(2);
        let (_, key) = content_key();
        let session =
            SessionData::wrap(&alice.auth, &alice.encr, &key, &bob.encr.public_key()).unwrap();

        let json = session.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 4);
        assert_eq!(object["data_key_alg"], "chacha20poly1305");
        assert_eq!(
            object["enc_data_key"].as_str().unwrap(),
            hex::encode(&session.encrypted_data_key)
        );
        assert_eq!(object["enc_data_key_sig"].as_str().unwrap().len(), 128);
        assert_eq!(object["data_key_sig"].as_str().unwrap().len(), 128);

        let back = SessionData::from_json(&json).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn test_json_rejects_bad_fields() {
        let bad_hex = r#"{"enc_data_key":"zz","enc_data_key_sig":"00",
            "data_key_sig":"00","data_key_alg":"chacha20poly1305"}"#;
        assert!(matches!(
            SessionData::from_json(bad_hex),
            Err(SessionError::Encoding(_))
        ));

        let bad_alg = r#"{"enc_data_key":"00","enc_data_key_sig":"00",
            "data_key_sig":"00","data_key_alg":"rot13"}"#;
        assert!(matches!(
            SessionData::from_json(bad_alg),
            Err(SessionError::Encoding(_))
        ));
    }
}
