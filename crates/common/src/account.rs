//! Registry accounts
//!
//! An [`Account`] owns one root seed and the two identities derived from it.
//! It can be created fresh or restored from any of the seed's backup forms:
//! the master key, the 24-word recovery phrase or the seed string.

use std::fmt;

use zeroize::Zeroizing;

use crate::crypto::seed::{
    decode_master_key, decode_seed_string, encode_master_key, encode_seed_string,
    MASTER_KEY_SIZE, MAX_SEED_VERSION, SEED_VERSION,
};
use crate::crypto::{
    phrase, AccountNumber, AuthKey, EncrKey, EncryptionKeyRegistration, RootSeed, SeedError,
};
use crate::network::Network;

/// A registry account: root seed, network, seed version and the signing
/// and encryption identities derived from the seed
///
/// Private key material is wiped when the account is dropped.
pub struct Account {
    seed: RootSeed,
    network: Network,
    version: u8,
    auth_key: AuthKey,
    encr_key: EncrKey,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("account_number", &self.account_number().to_string())
            .field("network", &self.network)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl Account {
    /// Create an account from a fresh random root seed
    pub fn new(network: Network) -> Result<Self, SeedError> {
        Self::from_root_seed(RootSeed::generate(), network, SEED_VERSION)
    }

    pub fn from_root_seed(
        seed: RootSeed,
        network: Network,
        version: u8,
    ) -> Result<Self, SeedError> {
        if version > MAX_SEED_VERSION {
            return Err(SeedError::UnsupportedVersion(version));
        }

        let auth_key = AuthKey::from_seed(&*seed.derive_auth_seed()?);
        let encr_key = EncrKey::from_seed(&*seed.derive_encr_seed()?);

        Ok(Self {
            seed,
            network,
            version,
            auth_key,
            encr_key,
        })
    }

    /// Restore from the 33-byte master key; network and version come from
    /// its tag byte
    pub fn from_master_key(master_key: &[u8]) -> Result<Self, SeedError> {
        let (seed, network, version) = decode_master_key(master_key)?;
        Self::from_root_seed(seed, network, version)
    }

    pub fn from_recovery_phrase<S: AsRef<str>>(words: &[S]) -> Result<Self, SeedError> {
        let master_key = phrase::decode_phrase(words)?;
        Self::from_master_key(master_key.as_slice())
    }

    pub fn from_seed_string(encoded: &str) -> Result<Self, SeedError> {
        let (seed, network, version) = decode_seed_string(encoded)?;
        Self::from_root_seed(seed, network, version)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Account number of the signing identity on this account's network
    pub fn account_number(&self) -> AccountNumber {
        AccountNumber::new(self.auth_key.public_key(), self.network)
    }

    pub fn auth_key(&self) -> &AuthKey {
        &self.auth_key
    }

    pub fn encr_key(&self) -> &EncrKey {
        &self.encr_key
    }

    pub fn master_key(&self) -> Result<Zeroizing<[u8; MASTER_KEY_SIZE]>, SeedError> {
        encode_master_key(&self.seed, self.network, self.version)
    }

    pub fn recovery_phrase(&self) -> Result<Vec<&'static str>, SeedError> {
        let master_key = self.master_key()?;
        Ok(phrase::encode_phrase(&master_key))
    }

    pub fn seed_string(&self) -> String {
        encode_seed_string(&self.seed, self.network)
    }

    /// Sign a message with the account's signing key
    pub fn sign(&self, message: &[u8]) -> [u8; crate::crypto::SIGNATURE_SIZE] {
        self.auth_key.sign(message)
    }

    /// Signed publication of this account's encryption public key
    pub fn encryption_key_registration(&self) -> EncryptionKeyRegistration {
        EncryptionKeyRegistration::new(&self.auth_key, self.encr_key.public_key())
    }
}
