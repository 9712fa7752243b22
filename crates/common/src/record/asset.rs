use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use super::{
    verify_signature, AssetId, RecordError, ASSET_TAG, MAX_FINGERPRINT_LENGTH,
    MAX_METADATA_LENGTH, MAX_NAME_LENGTH, MIN_FINGERPRINT_LENGTH, MIN_NAME_LENGTH,
};
use crate::account::Account;
use crate::codec::Packed;
use crate::crypto::AccountNumber;

/// Separator between keys and values in compacted metadata
const METADATA_SEPARATOR: &str = "\u{0}";

/// Registration of an asset, signed by its registrant
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    name: String,
    fingerprint: String,
    metadata: String,
    registrant: AccountNumber,
    #[serde_as(as = "Hex")]
    signature: Vec<u8>,
}

impl AssetRecord {
    pub(super) fn sign(
        name: &str,
        fingerprint: &str,
        metadata: &BTreeMap<String, String>,
        registrant: &Account,
    ) -> Result<Self, RecordError> {
        let metadata = compact_metadata(metadata);

        let name_length = name.chars().count();
        if !(MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&name_length) {
            return Err(RecordError::length("name", name_length));
        }
        let fingerprint_length = fingerprint.chars().count();
        if !(MIN_FINGERPRINT_LENGTH..=MAX_FINGERPRINT_LENGTH).contains(&fingerprint_length) {
            return Err(RecordError::length("fingerprint", fingerprint_length));
        }
        let metadata_length = metadata.chars().count();
        if metadata_length > MAX_METADATA_LENGTH {
            return Err(RecordError::length("metadata", metadata_length));
        }

        let mut record = Self {
            name: name.to_string(),
            fingerprint: fingerprint.to_string(),
            metadata,
            registrant: registrant.account_number(),
            signature: Vec::new(),
        };
        record.signature = registrant.sign(&record.signing_bytes()).to_vec();
        Ok(record)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// The compacted metadata string as signed
    pub fn metadata(&self) -> &str {
        &self.metadata
    }

    /// The metadata parsed back into key/value pairs
    pub fn metadata_map(&self) -> BTreeMap<String, String> {
        let parts: Vec<&str> = self.metadata.split(METADATA_SEPARATOR).collect();
        parts
            .chunks_exact(2)
            .map(|pair| (pair[0].to_string(), pair[1].to_string()))
            .collect()
    }

    pub fn registrant(&self) -> &AccountNumber {
        &self.registrant
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn id(&self) -> AssetId {
        AssetId::from_fingerprint(&self.fingerprint)
    }

    pub fn signing_bytes(&self) -> Vec<u8> {
        Packed::tagged(ASSET_TAG)
            .string(&self.name)
            .string(&self.fingerprint)
            .string(&self.metadata)
            .bytes(&self.registrant.to_bytes())
            .into_bytes()
    }

    /// Check the signature against the registrant
    pub fn verify(&self) -> Result<(), RecordError> {
        verify_signature(&self.registrant, &self.signing_bytes(), &self.signature)
    }
}

/// Flatten metadata into `key \0 value \0 key \0 value ...`, in key order,
/// skipping pairs with an empty key or value
fn compact_metadata(metadata: &BTreeMap<String, String>) -> String {
    let mut parts = Vec::with_capacity(metadata.len() * 2);
    for (key, value) in metadata {
        if key.is_empty() || value.is_empty() {
            continue;
        }
        parts.push(key.as_str());
        parts.push(value.as_str());
    }
    parts.join(METADATA_SEPARATOR)
}
