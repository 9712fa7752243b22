//! # Signed ledger records
//!
//! Records are the statements an account submits to the registry ledger:
//!
//! - [`AssetRecord`]: registers an asset by its fingerprint
//! - [`IssueRecord`]: creates one bitmark (ownership token) of an asset
//! - [`TransferRecord`]: moves a bitmark to a new owner, signed by the
//!   current owner
//! - [`TransferOfferRecord`] / [`CountersignedTransferRecord`]: a two-party
//!   transfer, signed by the owner and countersigned by the receiver
//!
//! Each record is signed over its canonical packing (see [`crate::codec`]):
//!
//! ```text
//! asset:          2 | name | fingerprint | metadata | registrant
//! issue:          3 | asset id | owner | nonce
//! transfer:       4 | link | 0x00 | receiver
//! countersigned:  5 | link | 0x00 | receiver
//! ```
//!
//! Account fields are packed as account bytes (variant + public key). The
//! `0x00` byte marks "no payment". Only the JSON projection, with a hex
//! signature, is ever sent; the ledger re-packs it to verify.
//!
//! Records are built by a [`RecordBuilder`], which also owns the issue nonce
//! counter.

mod asset;
mod builder;
mod issue;
mod offer;
mod transfer;

use std::fmt;
use std::str::FromStr;

use serde_with::{DeserializeFromStr, SerializeDisplay};
use sha3::{Digest, Sha3_512};

pub use asset::AssetRecord;
pub use builder::RecordBuilder;
pub use issue::IssueRecord;
pub use offer::{OfferAction, OfferReply, TransferOffer};
pub use transfer::{CountersignedTransferRecord, TransferOfferRecord, TransferRecord};

use crate::crypto::{AccountNumber, KeyError};

pub const ASSET_TAG: u64 = 2;
pub const ISSUE_TAG: u64 = 3;
pub const TRANSFER_TAG: u64 = 4;
pub const COUNTERSIGNED_TRANSFER_TAG: u64 = 5;

pub const MIN_NAME_LENGTH: usize = 1;
pub const MAX_NAME_LENGTH: usize = 64;
pub const MIN_FINGERPRINT_LENGTH: usize = 1;
pub const MAX_FINGERPRINT_LENGTH: usize = 1024;
pub const MAX_METADATA_LENGTH: usize = 2048;

/// Size of an asset id (SHA3-512 of the fingerprint)
pub const ASSET_ID_SIZE: usize = 64;
/// Size of a transaction id (the link a transfer points back to)
pub const TX_ID_SIZE: usize = 32;

/// Marker packed in transfers: payments are not supported
const NO_PAYMENT: u8 = 0x00;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("invalid length for {field}: {length}")]
    InvalidLength { field: &'static str, length: usize },
    #[error("invalid hex for {field}: {reason}")]
    InvalidHex { field: &'static str, reason: String },
    #[error("invalid account: {0}")]
    InvalidAccount(String),
    #[error("invalid record signature")]
    InvalidSignature,
    #[error("key error: {0}")]
    Key(#[from] KeyError),
}

impl RecordError {
    fn length(field: &'static str, length: usize) -> Self {
        RecordError::InvalidLength { field, length }
    }
}

fn verify_signature(
    signer: &AccountNumber,
    message: &[u8],
    signature: &[u8],
) -> Result<(), RecordError> {
    signer
        .public_key()
        .verify(message, signature)
        .map_err(|e| match e {
            KeyError::InvalidSignature => RecordError::InvalidSignature,
            other => RecordError::Key(other),
        })
}

macro_rules! hex_id {
    ($(#[$meta:meta])* $name:ident, $size:expr, $field:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
        pub struct $name([u8; $size]);

        impl $name {
            pub fn as_bytes(&self) -> &[u8; $size] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl From<[u8; $size]> for $name {
            fn from(bytes: [u8; $size]) -> Self {
                Self(bytes)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = RecordError;

            fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
                let bytes: [u8; $size] = bytes
                    .try_into()
                    .map_err(|_| RecordError::length($field, bytes.len()))?;
                Ok(Self(bytes))
            }
        }

        impl FromStr for $name {
            type Err = RecordError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = hex::decode(s).map_err(|e| RecordError::InvalidHex {
                    field: $field,
                    reason: e.to_string(),
                })?;
                Self::try_from(bytes.as_slice())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }
    };
}

hex_id!(
    /// Identifier of a registered asset: SHA3-512 of its fingerprint
    AssetId,
    ASSET_ID_SIZE,
    "asset id"
);

hex_id!(
    /// Identifier of a ledger transaction; a bitmark's id is the id of its
    /// issue transaction
    TxId,
    TX_ID_SIZE,
    "transaction id"
);

impl AssetId {
    pub fn from_fingerprint(fingerprint: &str) -> Self {
        let digest = Sha3_512::digest(fingerprint.as_bytes());
        let mut bytes = [0u8; ASSET_ID_SIZE];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_asset_id_from_fingerprint() {
        let id = AssetId::from_fingerprint("01abc");
        assert_eq!(
            id.to_hex(),
            "69c7058cd98493d6699bd54008abf5bcfbede7e49ed839b6a510d19a6f3138fe\
             174bf160f1ef44d068e5e80cc6a2fd66afdc585816caa7e3b0d260b6c185c4ac"
        );
        assert_eq!(id.to_string().parse::<AssetId>().unwrap(), id);
    }

    #[test]
    fn test_id_lengths_are_checked() {
        assert_eq!(
            "abcd".parse::<AssetId>(),
            Err(RecordError::InvalidLength {
                field: "asset id",
                length: 2
            })
        );
        assert_eq!(
            hex::encode([0u8; 33]).parse::<TxId>(),
            Err(RecordError::InvalidLength {
                field: "transaction id",
                length: 33
            })
        );
        assert!(matches!(
            "not hex".parse::<TxId>(),
            Err(RecordError::InvalidHex {
                field: "transaction id",
                ..
            })
        ));
        assert!(matches!(
            "abc".parse::<AssetId>(),
            Err(RecordError::InvalidHex { .. })
        ));
        assert!(hex::encode([7u8; 32]).parse::<TxId>().is_ok());
    }

    #[test]
    fn test_ids_serialize_as_hex() {
        let tx_id = TxId::from([0xab; 32]);
        let json = serde_json::to_string(&tx_id).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        assert_eq!(serde_json::from_str::<TxId>(&json).unwrap(), tx_id);
    }
}
