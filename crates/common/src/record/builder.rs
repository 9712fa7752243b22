use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;

use super::{
    AssetId, AssetRecord, IssueRecord, RecordError, TransferOfferRecord, TransferRecord, TxId,
};
use crate::account::Account;
use crate::crypto::AccountNumber;

/// Issue nonces stay distinct for up to this many issues per millisecond
const NONCES_PER_MILLI: u64 = 1000;

/// Builds and signs ledger records
///
/// Owns the issue nonce counter. Clones share the counter, and so does any
/// builder made with [`RecordBuilder::with_counter`] on the same `Arc`, so
/// issues built concurrently from one process never collide.
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    counter: Arc<AtomicU64>,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_counter(counter: Arc<AtomicU64>) -> Self {
        Self { counter }
    }

    /// `unix millis * 1000 + (counter mod 1000)`
    fn next_nonce(&self) -> u64 {
        let count = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        millis * NONCES_PER_MILLI + count % NONCES_PER_MILLI
    }

    /// Register an asset
    ///
    /// Metadata pairs with an empty key or value are dropped; the rest are
    /// signed in key order.
    ///
    /// # Errors
    ///
    /// [`RecordError::InvalidLength`] unless the name is 1 to 64 characters,
    /// the fingerprint 1 to 1024 characters and the compacted metadata at
    /// most 2048 characters.
    pub fn build_asset_record(
        &self,
        name: &str,
        fingerprint: &str,
        metadata: &BTreeMap<String, String>,
        registrant: &Account,
    ) -> Result<AssetRecord, RecordError> {
        let record = AssetRecord::sign(name, fingerprint, metadata, registrant)?;
        tracing::debug!(
            asset_id = %record.id(),
            registrant = %record.registrant(),
            "built asset record"
        );
        Ok(record)
    }

    pub fn build_issue_record(&self, asset_id: &AssetId, issuer: &Account) -> IssueRecord {
        IssueRecord::sign(*asset_id, issuer, self.next_nonce())
    }

    pub fn build_issue_records(
        &self,
        asset_id: &AssetId,
        issuer: &Account,
        quantity: usize,
    ) -> Vec<IssueRecord> {
        tracing::debug!(%asset_id, quantity, "building issue records");
        (0..quantity)
            .map(|_| self.build_issue_record(asset_id, issuer))
            .collect()
    }

    /// Transfer the bitmark whose latest transaction is `link` to `receiver`
    ///
    /// # Errors
    ///
    /// [`RecordError::InvalidAccount`] if `receiver` is on another network.
    pub fn build_transfer_record(
        &self,
        link: &TxId,
        receiver: &AccountNumber,
        owner: &Account,
    ) -> Result<TransferRecord, RecordError> {
        check_same_network(receiver, owner)?;
        Ok(TransferRecord::sign(*link, *receiver, owner))
    }

    /// Offer the bitmark whose latest transaction is `link` to `receiver`,
    /// pending their countersignature
    pub fn build_transfer_offer(
        &self,
        link: &TxId,
        receiver: &AccountNumber,
        sender: &Account,
    ) -> Result<TransferOfferRecord, RecordError> {
        check_same_network(receiver, sender)?;
        Ok(TransferOfferRecord::sign(*link, *receiver, sender))
    }
}

fn check_same_network(receiver: &AccountNumber, signer: &Account) -> Result<(), RecordError> {
    if receiver.network() != signer.network() {
        return Err(RecordError::InvalidAccount(format!(
            "{receiver} is a {} account, signer is on {}",
            receiver.network(),
            signer.network()
        )));
    }
    Ok(())
}
