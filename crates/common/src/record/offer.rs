use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use super::{CountersignedTransferRecord, RecordError, TransferOfferRecord, TxId};
use crate::account::Account;
use crate::crypto::AccountNumber;

/// How a party closes an open transfer offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferAction {
    /// Receiver countersigns and the transfer goes to the ledger
    Accept,
    /// Receiver declines
    Reject,
    /// Sender withdraws the offer
    Cancel,
}

impl fmt::Display for OfferAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfferAction::Accept => write!(f, "accept"),
            OfferAction::Reject => write!(f, "reject"),
            OfferAction::Cancel => write!(f, "cancel"),
        }
    }
}

/// A transfer offer as held by the registry service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferOffer {
    pub id: String,
    pub bitmark_id: TxId,
    pub from: AccountNumber,
    pub to: AccountNumber,
    pub status: String,
    pub record: TransferOfferRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "txId", default, skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<TxId>,
    pub open: bool,
}

impl TransferOffer {
    /// Countersign the offer as its receiver
    pub fn accept(
        &self,
        receiver: &Account,
    ) -> Result<(OfferReply, CountersignedTransferRecord), RecordError> {
        self.record.verify(&self.from)?;
        let countersigned = self.record.countersign(receiver)?;
        let reply = OfferReply {
            id: self.id.clone(),
            action: OfferAction::Accept,
            countersignature: Some(countersigned.countersignature().to_vec()),
        };
        Ok((reply, countersigned))
    }

    pub fn reject(&self) -> OfferReply {
        OfferReply::closing(&self.id, OfferAction::Reject)
    }

    pub fn cancel(&self) -> OfferReply {
        OfferReply::closing(&self.id, OfferAction::Cancel)
    }
}

/// The body sent to close an offer
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferReply {
    pub id: String,
    pub action: OfferAction,
    #[serde_as(as = "Option<Hex>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countersignature: Option<Vec<u8>>,
}

impl OfferReply {
    fn closing(id: &str, action: OfferAction) -> Self {
        Self {
            id: id.to_string(),
            action,
            countersignature: None,
        }
    }
}
