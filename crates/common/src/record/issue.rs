use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use super::{verify_signature, AssetId, RecordError, ISSUE_TAG};
use crate::account::Account;
use crate::codec::Packed;
use crate::crypto::AccountNumber;

/// Creation of one bitmark of an asset, signed by the issuer
///
/// The nonce makes otherwise identical issues of the same asset distinct.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    asset: AssetId,
    owner: AccountNumber,
    nonce: u64,
    #[serde_as(as = "Hex")]
    signature: Vec<u8>,
}

impl IssueRecord {
    pub(super) fn sign(asset: AssetId, issuer: &Account, nonce: u64) -> Self {
        let mut record = Self {
            asset,
            owner: issuer.account_number(),
            nonce,
            signature: Vec::new(),
        };
        record.signature = issuer.sign(&record.signing_bytes()).to_vec();
        record
    }

    pub fn asset(&self) -> &AssetId {
        &self.asset
    }

    pub fn owner(&self) -> &AccountNumber {
        &self.owner
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn signing_bytes(&self) -> Vec<u8> {
        Packed::tagged(ISSUE_TAG)
            .bytes(self.asset.as_bytes())
            .bytes(&self.owner.to_bytes())
            .uint(self.nonce)
            .into_bytes()
    }

    /// Check the signature against the issuing owner
    pub fn verify(&self) -> Result<(), RecordError> {
        verify_signature(&self.owner, &self.signing_bytes(), &self.signature)
    }
}
