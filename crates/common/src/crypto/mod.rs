//! Key material and cryptographic protocols for registry accounts
//!
//! Everything an account can do cryptographically hangs off one 32-byte
//! root seed:
//!
//! - **Seed**: the root seed, its 33-byte master key, the 24-word recovery
//!   phrase and the base58 seed string ([`seed`], [`phrase`])
//! - **Signing**: an Ed25519 keypair derived from the signing sub-seed; its
//!   public key, behind a variant byte and checksum, is the account number
//!   ([`AuthKey`], [`AccountNumber`])
//! - **Key agreement**: an X25519 keypair derived from the encryption
//!   sub-seed, used only to wrap content keys for a recipient ([`EncrKey`])
//! - **Content keys**: single-use ChaCha20-Poly1305 keys encrypting private
//!   asset content ([`DataKey`])
//!
//! # Content Key Hand-off
//!
//! A private asset's content key never travels in plaintext. The owner wraps
//! it into [`SessionData`] for the next holder: encrypted to the recipient's
//! key-agreement key and signed twice (over the encrypted key and the raw
//! key) with the owner's signing key. The recipient checks both signatures
//! against the sender's signing key before trusting the key.
//!
//! # Sub-seed Derivation
//!
//! The two sub-seeds are produced by sealing two reserved counter blocks
//! under the root seed with XSalsa20-Poly1305 and a zero nonce. See
//! [`seed`] for the constants.

pub mod account_number;
pub mod auth_key;
pub mod data_key;
pub mod encr_key;
pub mod phrase;
pub mod request_auth;
pub mod seed;
pub mod session_data;

pub use account_number::AccountNumber;
pub use auth_key::{AuthKey, AuthPublicKey, PUBLIC_KEY_SIZE, SIGNATURE_SIZE};
pub use data_key::{DataKey, DataKeyAlgorithm, FreshDataKey, DATA_KEY_SIZE};
pub use encr_key::{EncrKey, EncrPublicKey};
pub use request_auth::{EncryptionKeyRegistration, RequestAuth};
pub use seed::{RootSeed, SeedError};
pub use session_data::{SessionData, SessionError};

/// Errors from parsing or verifying public identities
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("invalid account number: {0}")]
    InvalidAccountNumber(String),
    #[error("account number checksum mismatch")]
    ChecksumMismatch,
    #[error("unsupported key variant: {0:#04x}")]
    UnsupportedKeyVariant(u64),
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("signature verification failed")]
    InvalidSignature,
}

/// Authenticated encryption failures
///
/// Deliberately carries no detail: a failed tag check looks the same whether
/// the key, the sender or the bytes were wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CipherError {
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("decryption failed")]
    DecryptionFailed,
}
