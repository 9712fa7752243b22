//! Root seed handling and sub-seed derivation
//!
//! A single 32-byte [`RootSeed`] is the only secret an account holder backs up.
//! The signing and encryption sub-seeds are derived from it by sealing two
//! reserved counter blocks with XSalsa20-Poly1305 (NaCl secretbox) under the
//! root seed and an all-zero nonce. Each counter is sealed exactly once per
//! root seed, so the fixed nonce never encrypts two different plaintexts
//! under the same key.
//!
//! The root seed has three serialized forms:
//! - the 33-byte master key: `(version << 1 | test) || seed`
//! - the 24-word recovery phrase of the master key (see [`super::phrase`])
//! - the base58 seed string: `5a fe 01 || network || seed || checksum`

use std::fmt;

use crypto_secretbox::aead::generic_array::GenericArray;
use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::XSalsa20Poly1305;
use sha3::{Digest, Sha3_256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::network::Network;

/// Size of the root seed in bytes
pub const ROOT_SEED_SIZE: usize = 32;
/// Size of the versioned master key in bytes
pub const MASTER_KEY_SIZE: usize = ROOT_SEED_SIZE + 1;
/// Size of a derived sub-seed (16-byte tag + 16-byte sealed counter)
pub const DERIVED_SEED_SIZE: usize = 32;
/// Current seed version
pub const SEED_VERSION: u8 = 1;
/// Largest version that fits the master key tag byte
pub const MAX_SEED_VERSION: u8 = 0x7f;

const SEED_NONCE: [u8; 24] = [0; 24];

// reserved domain-separation counters, never reuse for anything else
const AUTH_SEED_COUNTER: [u8; 16] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0xe7,
];
const ENCR_SEED_COUNTER: [u8; 16] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0xe8,
];

const SEED_STRING_MAGIC: [u8; 3] = [0x5a, 0xfe, 0x01];
const SEED_CHECKSUM_SIZE: usize = 4;
const SEED_STRING_SIZE: usize = SEED_STRING_MAGIC.len() + 1 + ROOT_SEED_SIZE + SEED_CHECKSUM_SIZE;

/// A derived sub-seed, wiped when dropped
pub type DerivedSeed = Zeroizing<[u8; DERIVED_SEED_SIZE]>;

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("malformed master key: expected {MASTER_KEY_SIZE} bytes, got {0}")]
    MalformedKey(usize),
    #[error("invalid word count: expected 24, got {0}")]
    InvalidWordCount(usize),
    #[error("unknown recovery word: {0:?}")]
    UnknownWord(String),
    #[error("recovery phrase decoded to {0} bytes, expected {MASTER_KEY_SIZE}")]
    ShortPayload(usize),
    #[error("unsupported seed version: {0}")]
    UnsupportedVersion(u8),
    #[error("invalid seed string: {0}")]
    InvalidSeedString(String),
    #[error("seed checksum mismatch")]
    ChecksumMismatch,
    #[error("sub-seed derivation failed")]
    Derivation,
}

/// The 32-byte secret all account key material is derived from
///
/// Not `Clone`: an account owns exactly one copy, and it is wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct RootSeed([u8; ROOT_SEED_SIZE]);

impl fmt::Debug for RootSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RootSeed(..)")
    }
}

impl From<[u8; ROOT_SEED_SIZE]> for RootSeed {
    fn from(bytes: [u8; ROOT_SEED_SIZE]) -> Self {
        RootSeed(bytes)
    }
}

impl RootSeed {
    /// Generate a new random root seed using a cryptographically secure RNG
    pub fn generate() -> Self {
        let mut bytes = [0u8; ROOT_SEED_SIZE];
        getrandom::getrandom(&mut bytes).expect("failed to generate random bytes");
        Self(bytes)
    }

    /// Create a root seed from a byte slice
    pub fn from_slice(data: &[u8]) -> Result<Self, SeedError> {
        if data.len() != ROOT_SEED_SIZE {
            return Err(SeedError::InvalidSeedString(format!(
                "root seed must be {} bytes, got {}",
                ROOT_SEED_SIZE,
                data.len()
            )));
        }
        let mut bytes = [0u8; ROOT_SEED_SIZE];
        bytes.copy_from_slice(data);
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; ROOT_SEED_SIZE] {
        &self.0
    }

    /// Derive the seed of the Ed25519 signing keypair
    pub fn derive_auth_seed(&self) -> Result<DerivedSeed, SeedError> {
        self.seal_counter(&AUTH_SEED_COUNTER)
    }

    /// Derive the seed of the X25519 encryption keypair
    pub fn derive_encr_seed(&self) -> Result<DerivedSeed, SeedError> {
        self.seal_counter(&ENCR_SEED_COUNTER)
    }

    fn seal_counter(&self, counter: &[u8; 16]) -> Result<DerivedSeed, SeedError> {
        let cipher = XSalsa20Poly1305::new(GenericArray::from_slice(&self.0));
        let nonce = GenericArray::from(SEED_NONCE);
        let sealed = Zeroizing::new(
            cipher
                .encrypt(&nonce, counter.as_slice())
                .map_err(|_| SeedError::Derivation)?,
        );
        if sealed.len() != DERIVED_SEED_SIZE {
            return Err(SeedError::Derivation);
        }

        let mut out = Zeroizing::new([0u8; DERIVED_SEED_SIZE]);
        out.copy_from_slice(&sealed);
        Ok(out)
    }
}

/// Pack a root seed with its network and version into the 33-byte master key
pub fn encode_master_key(
    seed: &RootSeed,
    network: Network,
    version: u8,
) -> Result<Zeroizing<[u8; MASTER_KEY_SIZE]>, SeedError> {
    if version > MAX_SEED_VERSION {
        return Err(SeedError::UnsupportedVersion(version));
    }

    let mut master_key = Zeroizing::new([0u8; MASTER_KEY_SIZE]);
    master_key[0] = (version << 1) | u8::from(network.is_test());
    master_key[1..].copy_from_slice(seed.as_bytes());
    Ok(master_key)
}

/// Split a master key into its root seed, network and version
///
/// # Errors
///
/// Returns [`SeedError::MalformedKey`] if `bytes` is not exactly 33 bytes.
pub fn decode_master_key(bytes: &[u8]) -> Result<(RootSeed, Network, u8), SeedError> {
    if bytes.len() != MASTER_KEY_SIZE {
        return Err(SeedError::MalformedKey(bytes.len()));
    }

    let tag = bytes[0];
    let network = Network::from_test_flag(tag & 0x01 != 0);
    let version = tag >> 1;
    let seed = RootSeed::from_slice(&bytes[1..])?;
    Ok((seed, network, version))
}

/// Encode a root seed as a base58 seed string
pub fn encode_seed_string(seed: &RootSeed, network: Network) -> String {
    let mut raw = Zeroizing::new(Vec::with_capacity(SEED_STRING_SIZE));
    raw.extend_from_slice(&SEED_STRING_MAGIC);
    raw.push(u8::from(network.is_test()));
    raw.extend_from_slice(seed.as_bytes());
    let checksum = Sha3_256::digest(raw.as_slice());
    raw.extend_from_slice(&checksum[..SEED_CHECKSUM_SIZE]);
    bs58::encode(raw.as_slice()).into_string()
}

/// Decode a base58 seed string into its root seed, network and version
pub fn decode_seed_string(encoded: &str) -> Result<(RootSeed, Network, u8), SeedError> {
    let raw = Zeroizing::new(
        bs58::decode(encoded.trim())
            .into_vec()
            .map_err(|e| SeedError::InvalidSeedString(e.to_string()))?,
    );
    if raw.len() != SEED_STRING_SIZE {
        return Err(SeedError::InvalidSeedString(format!(
            "expected {} bytes, got {}",
            SEED_STRING_SIZE,
            raw.len()
        )));
    }
    if raw[..SEED_STRING_MAGIC.len()] != SEED_STRING_MAGIC {
        return Err(SeedError::InvalidSeedString("bad magic".to_string()));
    }

    let body_len = SEED_STRING_SIZE - SEED_CHECKSUM_SIZE;
    let checksum = Sha3_256::digest(&raw[..body_len]);
    if checksum[..SEED_CHECKSUM_SIZE] != raw[body_len..] {
        return Err(SeedError::ChecksumMismatch);
    }

    let network = match raw[SEED_STRING_MAGIC.len()] {
        0x00 => Network::Livenet,
        0x01 => Network::Testnet,
        other => {
            return Err(SeedError::InvalidSeedString(format!(
                "unknown network byte {other:#04x}"
            )))
        }
    };
    let start = SEED_STRING_MAGIC.len() + 1;
    let seed = RootSeed::from_slice(&raw[start..start + ROOT_SEED_SIZE])?;
    Ok((seed, network, SEED_VERSION))
}

#[cfg(test)]
mod test {
    use super::*;

    const FIXTURE_SEED: &str = "5XEECttxvRBzxzAmuV4oh6T1FcQu4mBg8eWd9wKbf8hweXsfwtJ8sfH";
    const FIXTURE_CORE: &str = "f14a8ce1f3c978fd8671a18c8f9cd63ad1b6182e8c6a14655565448e37d09b72";

    #[test]
    fn test_master_key_roundtrip() {
        for (network, version) in [
            (Network::Livenet, 0),
            (Network::Testnet, 1),
            (Network::Livenet, 5),
            (Network::Testnet, MAX_SEED_VERSION),
        ] {
            let seed = RootSeed::generate();
            let encoded = encode_master_key(&seed, network, version).unwrap();
            let (decoded, decoded_network, decoded_version) = decode_master_key(&*encoded).unwrap();
            assert_eq!(decoded.as_bytes(), seed.as_bytes());
            assert_eq!(decoded_network, network);
            assert_eq!(decoded_version, version);
        }
    }

    #[test]
    fn test_master_key_tag_byte() {
        let seed = RootSeed::from([7u8; ROOT_SEED_SIZE]);
        let live = encode_master_key(&seed, Network::Livenet, 1).unwrap();
        let test = encode_master_key(&seed, Network::Testnet, 1).unwrap();
        assert_eq!(live[0], 0x02);
        assert_eq!(test[0], 0x03);
        assert_eq!(&live[1..], &[7u8; ROOT_SEED_SIZE]);
    }

    #[test]
    fn test_master_key_rejects_wrong_size() {
        assert!(matches!(
            decode_master_key(&[0u8; 32]),
            Err(SeedError::MalformedKey(32))
        ));
        assert!(matches!(
            decode_master_key(&[0u8; 34]),
            Err(SeedError::MalformedKey(34))
        ));
    }

    #[test]
    fn test_master_key_rejects_large_version() {
        let seed = RootSeed::generate();
        assert!(matches!(
            encode_master_key(&seed, Network::Livenet, 0x80),
            Err(SeedError::UnsupportedVersion(0x80))
        ));
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = RootSeed::from([42u8; ROOT_SEED_SIZE]);
        let b = RootSeed::from([42u8; ROOT_SEED_SIZE]);
        assert_eq!(*a.derive_auth_seed().unwrap(), *b.derive_auth_seed().unwrap());
        assert_eq!(*a.derive_encr_seed().unwrap(), *b.derive_encr_seed().unwrap());
    }

    #[test]
    fn test_derived_seeds_are_independent() {
        for _ in 0..1000 {
            let seed = RootSeed::generate();
            let auth = seed.derive_auth_seed().unwrap();
            let encr = seed.derive_encr_seed().unwrap();
            assert_ne!(*auth, *encr);
            assert_ne!(&*auth, seed.as_bytes());
            assert_ne!(&*encr, seed.as_bytes());
        }
    }

    #[test]
    fn test_fixture_derivation() {
        let (seed, network, version) = decode_seed_string(FIXTURE_SEED).unwrap();
        assert_eq!(hex::encode(seed.as_bytes()), FIXTURE_CORE);
        assert_eq!(network, Network::Testnet);
        assert_eq!(version, SEED_VERSION);

        assert_eq!(
            hex::encode(*seed.derive_auth_seed().unwrap()),
            "a446cfaf73a84dccf76d87ecdb2b7bcc453f00e90bce2a5c1323ce22bc5c3286"
        );
        assert_eq!(
            hex::encode(*seed.derive_encr_seed().unwrap()),
            "b0f2fd84aa8168896c86b59b7da6affd453f00e90bce2a5c1323ce22bc5c3289"
        );
    }

    #[test]
    fn test_seed_string_roundtrip() {
        let (seed, network, _) = decode_seed_string(FIXTURE_SEED).unwrap();
        assert_eq!(encode_seed_string(&seed, network), FIXTURE_SEED);

        let fresh = RootSeed::generate();
        let encoded = encode_seed_string(&fresh, Network::Livenet);
        let (decoded, network, _) = decode_seed_string(&encoded).unwrap();
        assert_eq!(decoded.as_bytes(), fresh.as_bytes());
        assert_eq!(network, Network::Livenet);
    }

    #[test]
    fn test_seed_string_rejects_tampering() {
        let (seed, network, _) = decode_seed_string(FIXTURE_SEED).unwrap();
        let mut raw = bs58::decode(encode_seed_string(&seed, network))
            .into_vec()
            .unwrap();
        raw[10] ^= 0x01;
        let tampered = bs58::encode(raw).into_string();
        assert!(matches!(
            decode_seed_string(&tampered),
            Err(SeedError::ChecksumMismatch)
        ));

        assert!(matches!(
            decode_seed_string("not-base58-0OIl"),
            Err(SeedError::InvalidSeedString(_))
        ));
    }
}
