use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The ledger a key or record belongs to.
///
/// The network is carried in the master key, the seed string and the
/// account number variant byte. It is never derived from seed material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Livenet,
    Testnet,
}

impl Network {
    pub fn is_test(&self) -> bool {
        matches!(self, Network::Testnet)
    }

    pub fn from_test_flag(is_test: bool) -> Self {
        if is_test {
            Network::Testnet
        } else {
            Network::Livenet
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Livenet => write!(f, "livenet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown network: {0}")]
pub struct UnknownNetwork(String);

impl FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "livenet" | "live" | "bitmark" => Ok(Network::Livenet),
            "testnet" | "test" => Ok(Network::Testnet),
            other => Err(UnknownNetwork(other.to_string())),
        }
    }
}
