use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::seed::{MAX_SEED_VERSION, SEED_VERSION};
use crate::network::Network;

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Client configuration
///
/// ```toml
/// network = "testnet"
/// seed_version = 1
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Ledger new accounts are created on and restored accounts must match
    #[serde(default)]
    pub network: Network,
    /// Version written into the master key of new accounts
    #[serde(default = "default_seed_version")]
    pub seed_version: u8,
}

fn default_seed_version() -> u8 {
    SEED_VERSION
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: Network::default(),
            seed_version: default_seed_version(),
        }
    }
}

impl Config {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    pub fn from_toml(config_toml: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(config_toml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.display().to_string()));
        }
        let config_toml = fs::read_to_string(path)?;
        Self::from_toml(&config_toml)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let config_toml = toml::to_string_pretty(self)?;
        fs::write(path, config_toml)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.seed_version == 0 || self.seed_version > MAX_SEED_VERSION {
            return Err(ConfigError::UnsupportedSeedVersion(self.seed_version));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing config file: {0}")]
    MissingFile(String),

    #[error("unsupported seed version: {0}")]
    UnsupportedSeedVersion(u8),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.network, Network::Livenet);
        assert_eq!(config.seed_version, 1);
    }

    #[test]
    fn test_parse() {
        let config = Config::from_toml("network = \"testnet\"\nseed_version = 1\n").unwrap();
        assert_eq!(config.network, Network::Testnet);

        assert!(matches!(
            Config::from_toml("network = \"regtest\""),
            Err(ConfigError::TomlDe(_))
        ));
        assert!(matches!(
            Config::from_toml("seed_version = 0"),
            Err(ConfigError::UnsupportedSeedVersion(0))
        ));
        assert!(matches!(
            Config::from_toml("seed_version = 200"),
            Err(ConfigError::UnsupportedSeedVersion(200))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::MissingFile(_))
        ));

        let config = Config::new(Network::Testnet);
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }
}
