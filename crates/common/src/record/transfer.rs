use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use super::{
    verify_signature, RecordError, TxId, COUNTERSIGNED_TRANSFER_TAG, NO_PAYMENT, TRANSFER_TAG,
};
use crate::account::Account;
use crate::codec::Packed;
use crate::crypto::AccountNumber;

fn transfer_bytes(tag: u64, link: &TxId, receiver: &AccountNumber) -> Vec<u8> {
    Packed::tagged(tag)
        .bytes(link.as_bytes())
        .byte(NO_PAYMENT)
        .bytes(&receiver.to_bytes())
        .into_bytes()
}

/// Single-signature transfer of a bitmark to `owner`, signed by the current
/// owner
///
/// `link` is the id of the transaction that made the signer the owner. The
/// signer is not part of the record, so verifying needs the current owner's
/// account number from the ledger.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    link: TxId,
    owner: AccountNumber,
    #[serde_as(as = "Hex")]
    signature: Vec<u8>,
}

impl TransferRecord {
    pub(super) fn sign(link: TxId, receiver: AccountNumber, owner: &Account) -> Self {
        let signature = owner
            .sign(&transfer_bytes(TRANSFER_TAG, &link, &receiver))
            .to_vec();
        Self {
            link,
            owner: receiver,
            signature,
        }
    }

    pub fn link(&self) -> &TxId {
        &self.link
    }

    /// The new owner
    pub fn owner(&self) -> &AccountNumber {
        &self.owner
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn signing_bytes(&self) -> Vec<u8> {
        transfer_bytes(TRANSFER_TAG, &self.link, &self.owner)
    }

    pub fn verify(&self, current_owner: &AccountNumber) -> Result<(), RecordError> {
        verify_signature(current_owner, &self.signing_bytes(), &self.signature)
    }
}

/// First half of a two-signature transfer: the owner's offer to `owner`
///
/// Has no effect on the ledger until the receiver countersigns it.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOfferRecord {
    link: TxId,
    owner: AccountNumber,
    #[serde_as(as = "Hex")]
    signature: Vec<u8>,
}

impl TransferOfferRecord {
    pub(super) fn sign(link: TxId, receiver: AccountNumber, sender: &Account) -> Self {
        let signature = sender
            .sign(&transfer_bytes(COUNTERSIGNED_TRANSFER_TAG, &link, &receiver))
            .to_vec();
        Self {
            link,
            owner: receiver,
            signature,
        }
    }

    pub fn link(&self) -> &TxId {
        &self.link
    }

    /// The receiver the offer is addressed to
    pub fn owner(&self) -> &AccountNumber {
        &self.owner
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn signing_bytes(&self) -> Vec<u8> {
        transfer_bytes(COUNTERSIGNED_TRANSFER_TAG, &self.link, &self.owner)
    }

    pub fn verify(&self, sender: &AccountNumber) -> Result<(), RecordError> {
        verify_signature(sender, &self.signing_bytes(), &self.signature)
    }

    /// Accept the offer as its receiver
    ///
    /// # Errors
    ///
    /// [`RecordError::InvalidAccount`] if `receiver` is not the account the
    /// offer names.
    pub fn countersign(
        &self,
        receiver: &Account,
    ) -> Result<CountersignedTransferRecord, RecordError> {
        let account_number = receiver.account_number();
        if account_number != self.owner {
            return Err(RecordError::InvalidAccount(format!(
                "{account_number} is not the receiver of this offer"
            )));
        }

        let countersignature = receiver
            .sign(&countersigning_bytes(&self.signing_bytes(), &self.signature))
            .to_vec();
        Ok(self.with_countersignature(countersignature))
    }

    /// Pair the offer with a countersignature made elsewhere, such as one
    /// sent back in an [`OfferReply`](super::OfferReply)
    ///
    /// Nothing is checked here; call
    /// [`CountersignedTransferRecord::verify`] before trusting the result.
    pub fn with_countersignature(&self, countersignature: Vec<u8>) -> CountersignedTransferRecord {
        CountersignedTransferRecord {
            link: self.link,
            owner: self.owner,
            signature: self.signature.clone(),
            countersignature,
        }
    }
}

fn countersigning_bytes(offer_bytes: &[u8], signature: &[u8]) -> Vec<u8> {
    let mut message = offer_bytes.to_vec();
    message.extend(Packed::default().bytes(signature).into_bytes());
    message
}

/// A transfer offer countersigned by its receiver, ready for submission
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountersignedTransferRecord {
    link: TxId,
    owner: AccountNumber,
    #[serde_as(as = "Hex")]
    signature: Vec<u8>,
    #[serde_as(as = "Hex")]
    countersignature: Vec<u8>,
}

impl CountersignedTransferRecord {
    pub fn link(&self) -> &TxId {
        &self.link
    }

    pub fn owner(&self) -> &AccountNumber {
        &self.owner
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn countersignature(&self) -> &[u8] {
        &self.countersignature
    }

    pub fn signing_bytes(&self) -> Vec<u8> {
        transfer_bytes(COUNTERSIGNED_TRANSFER_TAG, &self.link, &self.owner)
    }

    /// Check the sender's signature and the receiver's countersignature
    pub fn verify(&self, sender: &AccountNumber) -> Result<(), RecordError> {
        let message = self.signing_bytes();
        verify_signature(sender, &message, &self.signature)?;
        verify_signature(
            &self.owner,
            &countersigning_bytes(&message, &self.signature),
            &self.countersignature,
        )
    }
}
