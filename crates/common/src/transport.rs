//! The registry service as seen by the client
//!
//! The client never talks HTTP itself. Everything it needs from the ledger
//! and the asset store goes through a [`Transport`]: one submission call for
//! anything it sends, and a handful of lookups. Timeouts, retries and
//! endpoint selection are the transport's business.

use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};

use crate::asset_file::Accessibility;
use crate::crypto::{AccountNumber, EncryptionKeyRegistration, RequestAuth, SessionData};
use crate::record::{
    AssetId, AssetRecord, CountersignedTransferRecord, IssueRecord, OfferReply, TransferOffer,
    TransferOfferRecord, TransferRecord, TxId,
};

/// Everything a client can send to the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Submission {
    /// Publish the account's encryption public key
    RegisterEncryptionKey(EncryptionKeyRegistration),
    /// Store asset content, encrypted under a content key unless public
    UploadAsset {
        asset_id: AssetId,
        file_name: String,
        accessibility: Accessibility,
        content: Vec<u8>,
        session_data: Option<SessionData>,
    },
    /// Register an asset (if not yet registered) and issue bitmarks of it
    Issue {
        asset: Option<AssetRecord>,
        issues: Vec<IssueRecord>,
    },
    Transfer(TransferRecord),
    CountersignedTransfer(CountersignedTransferRecord),
    TransferOffer {
        record: TransferOfferRecord,
        bitmark_id: TxId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extra_info: Option<serde_json::Value>,
    },
    CompleteTransferOffer(OfferReply),
    /// Hand the content key of a bitmark to its next holder
    SessionData {
        bitmark_id: TxId,
        receiver: AccountNumber,
        session_data: SessionData,
    },
    /// Grant a renter access to a bitmark's content for some days
    Lease {
        bitmark_id: TxId,
        renter: AccountNumber,
        days: u32,
        session_data: SessionData,
    },
}

impl Submission {
    /// Action and resource the request is authenticated for
    pub fn auth_scope(&self) -> (&'static str, String) {
        match self {
            Submission::RegisterEncryptionKey(registration) => (
                "registerEncryptionKey",
                registration.encryption_pubkey.to_hex(),
            ),
            Submission::UploadAsset { asset_id, .. } => ("uploadAsset", asset_id.to_hex()),
            Submission::Issue { issues, .. } => (
                "issue",
                issues
                    .first()
                    .map(|issue| issue.asset().to_hex())
                    .unwrap_or_default(),
            ),
            Submission::Transfer(record) => ("transfer", record.link().to_hex()),
            Submission::CountersignedTransfer(record) => {
                ("countersignedTransfer", record.link().to_hex())
            }
            Submission::TransferOffer { bitmark_id, .. } => {
                ("transferOffer", bitmark_id.to_hex())
            }
            Submission::CompleteTransferOffer(reply) => {
                ("completeTransferOffer", reply.id.clone())
            }
            Submission::SessionData { bitmark_id, .. } => ("addSessionData", bitmark_id.to_hex()),
            Submission::Lease { bitmark_id, .. } => ("updateLease", bitmark_id.to_hex()),
        }
    }
}

/// What the registry hands back for a submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Transaction ids created, in submission order (bitmark ids for issues)
    #[serde(default)]
    pub tx_ids: Vec<TxId>,
    /// Id of a newly stored transfer offer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_id: Option<String>,
}

/// Current owner of a bitmark and the transaction that made them owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    pub owner: AccountNumber,
    pub head_id: TxId,
}

/// Where a holder finds a bitmark's content and how to decrypt it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAccess {
    pub url: String,
    /// Who wrapped the session data; its signature is checked against them
    pub sender: AccountNumber,
    /// Absent for public assets
    #[serde(default)]
    pub session_data: Option<SessionData>,
}

/// Access granted to a renter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseAccess {
    pub bitmark_id: TxId,
    pub owner: AccountNumber,
    pub url: String,
    pub session_data: SessionData,
    pub days: u32,
}

/// Downloaded asset content, still encrypted for private assets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetContent {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// Synchronous access to the registry service
///
/// Requests made on behalf of an account carry a [`RequestAuth`].
pub trait Transport {
    type Error: Display + Debug;

    fn submit(
        &self,
        auth: &RequestAuth,
        submission: Submission,
    ) -> Result<Receipt, Self::Error>;

    /// Signed encryption key registered for `account`
    fn fetch_encryption_public_key(
        &self,
        account: &AccountNumber,
    ) -> Result<EncryptionKeyRegistration, Self::Error>;

    fn fetch_ownership(&self, bitmark_id: &TxId) -> Result<Ownership, Self::Error>;

    /// Access of the requester to a bitmark they hold
    fn fetch_asset_access(
        &self,
        auth: &RequestAuth,
        bitmark_id: &TxId,
    ) -> Result<AssetAccess, Self::Error>;

    fn fetch_asset_content(&self, url: &str) -> Result<AssetContent, Self::Error>;

    /// Leases granted to the requester
    fn fetch_leases(&self, auth: &RequestAuth) -> Result<Vec<LeaseAccess>, Self::Error>;

    fn fetch_transfer_offer(
        &self,
        auth: &RequestAuth,
        offer_id: &str,
    ) -> Result<TransferOffer, Self::Error>;
}
