//! Account numbers
//!
//! An account number is the base58 (Bitcoin alphabet) encoding of
//!
//! ```text
//! [ key variant: varint ][ ed25519 public key: 32 bytes ][ checksum: 4 bytes ]
//! ```
//!
//! where the key variant is `(algorithm << 4) | public_key_bit | testnet_bit`
//! and the checksum is the first four bytes of SHA3-256 over everything
//! before it. The variant plus key (without checksum) are the "account bytes"
//! packed into signed records.

use std::fmt;
use std::str::FromStr;

use serde_with::{DeserializeFromStr, SerializeDisplay};
use sha3::{Digest, Sha3_256};

use super::auth_key::{AuthPublicKey, PUBLIC_KEY_SIZE};
use super::KeyError;
use crate::codec::{decode_varint, encode_varint};
use crate::network::Network;

/// Algorithm id of Ed25519 keys
pub const ED25519_ALGORITHM: u8 = 0x01;
/// Variant bit set on public keys
pub const PUBLIC_KEY_CODE: u8 = 0x01;
/// Variant bit set on testnet keys
pub const TESTNET_CODE: u8 = 0x02;
/// Shift of the algorithm id inside the variant
pub const ALGORITHM_SHIFT: u8 = 4;
/// Size of the trailing checksum
pub const CHECKSUM_SIZE: usize = 4;
/// Size of the account bytes for an Ed25519 key (variant + key)
pub const ACCOUNT_BYTES_SIZE: usize = 1 + PUBLIC_KEY_SIZE;

/// Checksummed public identifier of a signing identity on a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct AccountNumber {
    network: Network,
    public_key: AuthPublicKey,
}

impl AccountNumber {
    pub fn new(public_key: AuthPublicKey, network: Network) -> Self {
        Self {
            network,
            public_key,
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// The raw 32-byte Ed25519 public key
    pub fn public_key(&self) -> AuthPublicKey {
        self.public_key
    }

    /// The key variant byte for this account
    pub fn key_variant(&self) -> u8 {
        let mut variant = (ED25519_ALGORITHM << ALGORITHM_SHIFT) | PUBLIC_KEY_CODE;
        if self.network.is_test() {
            variant |= TESTNET_CODE;
        }
        variant
    }

    /// Variant followed by the public key, as packed into signed records
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(ACCOUNT_BYTES_SIZE);
        encode_varint(&mut bytes, u64::from(self.key_variant()));
        bytes.extend_from_slice(self.public_key.as_bytes());
        bytes
    }

    /// Parse an account number without validating its checksum
    ///
    /// Only strips the trailing checksum bytes. Prefer [`FromStr`], which
    /// rejects mistyped or tampered account numbers; use this only where the
    /// caller checks integrity some other way.
    pub fn parse_unchecked(encoded: &str) -> Result<Self, KeyError> {
        let raw = decode_base58(encoded)?;
        Self::from_account_bytes(&raw[..raw.len() - CHECKSUM_SIZE])
    }

    /// Parse account bytes (variant + key, no checksum)
    pub fn from_account_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let (variant, used) = decode_varint(bytes)
            .map_err(|e| KeyError::InvalidAccountNumber(format!("key variant: {e}")))?;

        if variant & u64::from(PUBLIC_KEY_CODE) == 0 {
            return Err(KeyError::InvalidAccountNumber(
                "not a public key".to_string(),
            ));
        }
        let algorithm = variant >> ALGORITHM_SHIFT;
        if algorithm != u64::from(ED25519_ALGORITHM) {
            return Err(KeyError::UnsupportedKeyVariant(variant));
        }
        let network = Network::from_test_flag(variant & u64::from(TESTNET_CODE) != 0);

        let public_key = AuthPublicKey::try_from(&bytes[used..])?;
        Ok(Self::new(public_key, network))
    }
}

fn decode_base58(encoded: &str) -> Result<Vec<u8>, KeyError> {
    let raw = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| KeyError::InvalidAccountNumber(e.to_string()))?;
    if raw.len() <= CHECKSUM_SIZE {
        return Err(KeyError::InvalidAccountNumber(format!(
            "too short: {} bytes",
            raw.len()
        )));
    }
    Ok(raw)
}

fn checksum(bytes: &[u8]) -> [u8; CHECKSUM_SIZE] {
    let digest = Sha3_256::digest(bytes);
    let mut out = [0u8; CHECKSUM_SIZE];
    out.copy_from_slice(&digest[..CHECKSUM_SIZE]);
    out
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut raw = self.to_bytes();
        let sum = checksum(&raw);
        raw.extend_from_slice(&sum);
        f.write_str(&bs58::encode(raw).into_string())
    }
}

impl FromStr for AccountNumber {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = decode_base58(s)?;
        let (body, sum) = raw.split_at(raw.len() - CHECKSUM_SIZE);
        if checksum(body) != sum {
            return Err(KeyError::ChecksumMismatch);
        }
        Self::from_account_bytes(body)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::AuthKey;

    // testnet account from a public registry example
    const RECEIVER: &str = "eZpG6Wi9SQvpDatEP7QGrx6nvzwd6s6R8DgMKgDbDY1R5bjzb9";
    const RECEIVER_KEY: &str = "5343ff7d8e15926b8e66e63ffee915a9a5993b31ad5e01a80e30b1bf292859b0";

    #[test]
    fn test_parse_known_account() {
        let account: AccountNumber = RECEIVER.parse().unwrap();
        assert_eq!(account.network(), Network::Testnet);
        assert_eq!(account.public_key().to_hex(), RECEIVER_KEY);
        assert_eq!(account.key_variant(), 0x13);
        assert_eq!(account.to_string(), RECEIVER);

        let bytes = account.to_bytes();
        assert_eq!(bytes.len(), ACCOUNT_BYTES_SIZE);
        assert_eq!(bytes[0], 0x13);
        assert_eq!(hex::encode(&bytes[1..]), RECEIVER_KEY);
    }

    #[test]
    fn test_display_parse_roundtrip() {
        let key = AuthKey::from_seed(&[11u8; 32]).public_key();
        for network in [Network::Livenet, Network::Testnet] {
            let account = AccountNumber::new(key, network);
            let encoded = account.to_string();
            let parsed: AccountNumber = encoded.parse().unwrap();
            assert_eq!(parsed, account);
        }

        let live = AccountNumber::new(key, Network::Livenet);
        assert_eq!(live.key_variant(), 0x11);
        assert_ne!(
            live.to_string(),
            AccountNumber::new(key, Network::Testnet).to_string()
        );
    }

    #[test]
    fn test_checksum_is_validated() {
        let mut raw = bs58::decode(RECEIVER).into_vec().unwrap();
        raw[5] ^= 0x40;
        let tampered = bs58::encode(&raw).into_string();

        assert!(matches!(
            tampered.parse::<AccountNumber>(),
            Err(KeyError::ChecksumMismatch)
        ));

        // the unchecked escape hatch only strips the checksum
        let unchecked = AccountNumber::parse_unchecked(&tampered).unwrap();
        assert_ne!(unchecked.public_key().to_hex(), RECEIVER_KEY);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!(
            "".parse::<AccountNumber>(),
            Err(KeyError::InvalidAccountNumber(_))
        ));
        assert!(matches!(
            "0OIl".parse::<AccountNumber>(),
            Err(KeyError::InvalidAccountNumber(_))
        ));

        // private key variant
        let mut raw = vec![0x12];
        raw.extend_from_slice(&[1u8; 32]);
        let sum = checksum(&raw);
        raw.extend_from_slice(&sum);
        assert!(matches!(
            bs58::encode(&raw).into_string().parse::<AccountNumber>(),
            Err(KeyError::InvalidAccountNumber(_))
        ));

        // unknown algorithm
        let mut raw = vec![0x21];
        raw.extend_from_slice(&[1u8; 32]);
        let sum = checksum(&raw);
        raw.extend_from_slice(&sum);
        assert!(matches!(
            bs58::encode(&raw).into_string().parse::<AccountNumber>(),
            Err(KeyError::UnsupportedKeyVariant(0x21))
        ));

        // short key
        let mut raw = vec![0x11];
        raw.extend_from_slice(&[1u8; 31]);
        let sum = checksum(&raw);
        raw.extend_from_slice(&sum);
        assert!(matches!(
            bs58::encode(&raw).into_string().parse::<AccountNumber>(),
            Err(KeyError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_serde_as_string() {
        let account: AccountNumber = RECEIVER.parse().unwrap();
        let json = serde_json::to_string(&account).unwrap();
        assert_eq!(json, format!("\"{RECEIVER}\""));
        let back: AccountNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(back, account);
    }
}
