use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use sha3::{Digest, Sha3_256};

use crate::asset_file::Accessibility;
use crate::crypto::{AccountNumber, EncryptionKeyRegistration, RequestAuth, SessionData};
use crate::record::{
    AssetId, AssetRecord, IssueRecord, OfferAction, OfferReply, TransferOffer,
    TransferOfferRecord, TxId,
};
use crate::transport::{
    AssetAccess, AssetContent, LeaseAccess, Ownership, Receipt, Submission, Transport,
};

const UPLOAD_URL_PREFIX: &str = "memory://assets/";

/// In-memory registry service
///
/// Checks every signature a real registry would: request authentication,
/// encryption key registrations, asset, issue and transfer records. Clones
/// share state, so one instance can back several clients in a test.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<RwLock<MemoryTransportInner>>,
}

#[derive(Debug, Default)]
struct MemoryTransportInner {
    encryption_keys: HashMap<AccountNumber, EncryptionKeyRegistration>,
    assets: HashMap<AssetId, AssetRecord>,
    uploads: HashMap<AssetId, Upload>,
    /// bitmark id -> current state
    bitmarks: HashMap<TxId, Bitmark>,
    /// (bitmark id, holder) -> content key wrapped for the holder
    sessions: HashMap<(TxId, AccountNumber), Session>,
    offers: HashMap<String, TransferOffer>,
    /// renter -> leases granted to them
    leases: HashMap<AccountNumber, Vec<LeaseAccess>>,
    next_offer: u64,
}

#[derive(Debug, Clone)]
struct Upload {
    file_name: String,
    content: Vec<u8>,
    uploader: AccountNumber,
    session_data: Option<SessionData>,
}

#[derive(Debug, Clone, Copy)]
struct Bitmark {
    asset_id: AssetId,
    owner: AccountNumber,
    head_id: TxId,
}

#[derive(Debug, Clone)]
struct Session {
    sender: AccountNumber,
    session_data: SessionData,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryTransportError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("rejected: {0}")]
    Rejected(String),
}

fn rejected(reason: impl Display) -> MemoryTransportError {
    MemoryTransportError::Rejected(reason.to_string())
}

fn not_found(what: impl Display) -> MemoryTransportError {
    MemoryTransportError::NotFound(what.to_string())
}

fn tx_id(signatures: &[&[u8]]) -> TxId {
    let mut hasher = Sha3_256::new();
    for signature in signatures {
        hasher.update(signature);
    }
    let mut id = [0u8; 32];
    id.copy_from_slice(&hasher.finalize());
    TxId::from(id)
}

/// Where uploaded content for `asset_id` is served from
pub fn upload_url(asset_id: &AssetId) -> String {
    format!("{UPLOAD_URL_PREFIX}{asset_id}")
}

fn authenticate(
    auth: &RequestAuth,
    action: &str,
    resource: &str,
) -> Result<AccountNumber, MemoryTransportError> {
    auth.verify(action, resource).map_err(|_| {
        MemoryTransportError::Unauthorized(format!(
            "bad request signature from {} for {action}",
            auth.requester
        ))
    })?;
    Ok(auth.requester)
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer as currently stored, without request authentication
    pub fn offer(&self, offer_id: &str) -> Option<TransferOffer> {
        self.inner.read().offers.get(offer_id).cloned()
    }

    /// Number of content keys held for `bitmark_id`, one per holder
    pub fn session_count(&self, bitmark_id: &TxId) -> usize {
        self.inner
            .read()
            .sessions
            .keys()
            .filter(|(id, _)| id == bitmark_id)
            .count()
    }
}

impl MemoryTransportInner {
    fn bitmark(&self, bitmark_id: &TxId) -> Result<Bitmark, MemoryTransportError> {
        self.bitmarks
            .get(bitmark_id)
            .copied()
            .ok_or_else(|| not_found(format!("bitmark {bitmark_id}")))
    }

    /// Bitmark whose latest transaction is `link`
    fn bitmark_by_head(&self, link: &TxId) -> Result<(TxId, Bitmark), MemoryTransportError> {
        self.bitmarks
            .iter()
            .find(|(_, bitmark)| bitmark.head_id == *link)
            .map(|(id, bitmark)| (*id, *bitmark))
            .ok_or_else(|| rejected(format!("{link} is not the head of any bitmark")))
    }

    fn require_owner(
        &self,
        bitmark_id: &TxId,
        requester: &AccountNumber,
    ) -> Result<Bitmark, MemoryTransportError> {
        let bitmark = self.bitmark(bitmark_id)?;
        if bitmark.owner != *requester {
            return Err(MemoryTransportError::Unauthorized(format!(
                "{requester} does not own bitmark {bitmark_id}"
            )));
        }
        Ok(bitmark)
    }

    fn move_ownership(&mut self, bitmark_id: TxId, owner: AccountNumber, tx_id: TxId) {
        if let Some(bitmark) = self.bitmarks.get_mut(&bitmark_id) {
            bitmark.owner = owner;
            bitmark.head_id = tx_id;
        }
        tracing::debug!(%bitmark_id, %owner, %tx_id, "moved bitmark");
    }

    fn register_encryption_key(
        &mut self,
        requester: AccountNumber,
        registration: EncryptionKeyRegistration,
    ) -> Result<Receipt, MemoryTransportError> {
        registration.verify(&requester).map_err(rejected)?;
        self.encryption_keys.insert(requester, registration);
        Ok(Receipt::default())
    }

    fn upload(
        &mut self,
        requester: AccountNumber,
        asset_id: AssetId,
        file_name: String,
        accessibility: Accessibility,
        content: Vec<u8>,
        session_data: Option<SessionData>,
    ) -> Result<Receipt, MemoryTransportError> {
        if (accessibility == Accessibility::Private) != session_data.is_some() {
            return Err(rejected(format!(
                "{accessibility} upload with session data present: {}",
                session_data.is_some()
            )));
        }
        self.uploads.entry(asset_id).or_insert(Upload {
            file_name,
            content,
            uploader: requester,
            session_data,
        });
        Ok(Receipt::default())
    }

    fn issue(
        &mut self,
        requester: AccountNumber,
        asset: Option<AssetRecord>,
        issues: Vec<IssueRecord>,
    ) -> Result<Receipt, MemoryTransportError> {
        if let Some(asset) = &asset {
            asset.verify().map_err(rejected)?;
        }

        // nothing is registered until the whole batch checks out
        let mut issued = Vec::with_capacity(issues.len());
        for issue in &issues {
            if *issue.owner() != requester {
                return Err(MemoryTransportError::Unauthorized(format!(
                    "{requester} cannot issue for {}",
                    issue.owner()
                )));
            }
            let registered = self.assets.contains_key(issue.asset())
                || asset.as_ref().is_some_and(|asset| asset.id() == *issue.asset());
            if !registered {
                return Err(not_found(format!("asset {}", issue.asset())));
            }
            issue.verify().map_err(rejected)?;

            let bitmark_id = tx_id(&[issue.signature()]);
            if self.bitmarks.contains_key(&bitmark_id)
                || issued.iter().any(|(id, _)| *id == bitmark_id)
            {
                return Err(rejected(format!("duplicate issue {bitmark_id}")));
            }
            issued.push((bitmark_id, *issue.asset()));
        }

        if let Some(asset) = asset {
            self.assets.entry(asset.id()).or_insert(asset);
        }

        let mut tx_ids = Vec::with_capacity(issued.len());
        for (bitmark_id, asset_id) in issued {
            self.bitmarks.insert(
                bitmark_id,
                Bitmark {
                    asset_id,
                    owner: requester,
                    head_id: bitmark_id,
                },
            );

            // the uploader's own content key carries over to what they issue
            let inherited = self
                .uploads
                .get(&asset_id)
                .filter(|upload| upload.uploader == requester)
                .and_then(|upload| upload.session_data.clone());
            if let Some(session_data) = inherited {
                let session = Session {
                    sender: requester,
                    session_data,
                };
                self.sessions.insert((bitmark_id, requester), session);
            }
            tx_ids.push(bitmark_id);
        }
        Ok(Receipt {
            tx_ids,
            offer_id: None,
        })
    }

    fn add_session_data(
        &mut self,
        requester: AccountNumber,
        bitmark_id: TxId,
        receiver: AccountNumber,
        session_data: SessionData,
    ) -> Result<Receipt, MemoryTransportError> {
        self.require_owner(&bitmark_id, &requester)?;
        let session = Session {
            sender: requester,
            session_data,
        };
        self.sessions.insert((bitmark_id, receiver), session);
        Ok(Receipt::default())
    }

    fn create_offer(
        &mut self,
        requester: AccountNumber,
        record: TransferOfferRecord,
        bitmark_id: TxId,
        extra_info: Option<serde_json::Value>,
    ) -> Result<Receipt, MemoryTransportError> {
        let bitmark = self.require_owner(&bitmark_id, &requester)?;
        if bitmark.head_id != *record.link() {
            return Err(rejected(format!("offer does not link to the head of {bitmark_id}")));
        }
        record.verify(&requester).map_err(rejected)?;

        self.next_offer += 1;
        let id = format!("offer-{}", self.next_offer);
        let offer = TransferOffer {
            id: id.clone(),
            bitmark_id,
            from: requester,
            to: *record.owner(),
            status: "open".to_string(),
            record,
            metadata: extra_info,
            created_at: Utc::now(),
            tx_id: None,
            open: true,
        };
        self.offers.insert(id.clone(), offer);
        Ok(Receipt {
            tx_ids: Vec::new(),
            offer_id: Some(id),
        })
    }

    fn complete_offer(
        &mut self,
        requester: AccountNumber,
        reply: OfferReply,
    ) -> Result<Receipt, MemoryTransportError> {
        let offer = self
            .offers
            .get(&reply.id)
            .cloned()
            .ok_or_else(|| not_found(format!("offer {}", reply.id)))?;
        if !offer.open {
            return Err(rejected(format!("offer {} is {}", offer.id, offer.status)));
        }

        let allowed = match reply.action {
            OfferAction::Accept | OfferAction::Reject => offer.to,
            OfferAction::Cancel => offer.from,
        };
        if requester != allowed {
            return Err(MemoryTransportError::Unauthorized(format!(
                "{requester} cannot {} offer {}",
                reply.action, offer.id
            )));
        }

        let (status, tx_ids) = match reply.action {
            OfferAction::Accept => {
                let countersignature = reply
                    .countersignature
                    .ok_or_else(|| rejected("accepting an offer needs a countersignature"))?;
                let record = offer.record.with_countersignature(countersignature);
                let bitmark = self.bitmark(&offer.bitmark_id)?;
                if bitmark.head_id != *record.link() || bitmark.owner != offer.from {
                    return Err(rejected(format!("offer {} is stale", offer.id)));
                }
                record.verify(&offer.from).map_err(rejected)?;

                let id = tx_id(&[record.signature(), record.countersignature()]);
                self.move_ownership(offer.bitmark_id, offer.to, id);
                ("accepted", vec![id])
            }
            OfferAction::Reject => ("rejected", Vec::new()),
            OfferAction::Cancel => ("canceled", Vec::new()),
        };

        if let Some(stored) = self.offers.get_mut(&offer.id) {
            stored.status = status.to_string();
            stored.open = false;
            stored.tx_id = tx_ids.first().copied();
        }
        Ok(Receipt {
            tx_ids,
            offer_id: None,
        })
    }

    fn lease(
        &mut self,
        requester: AccountNumber,
        bitmark_id: TxId,
        renter: AccountNumber,
        days: u32,
        session_data: SessionData,
    ) -> Result<Receipt, MemoryTransportError> {
        let bitmark = self.require_owner(&bitmark_id, &requester)?;
        let lease = LeaseAccess {
            bitmark_id,
            owner: requester,
            url: upload_url(&bitmark.asset_id),
            session_data,
            days,
        };
        self.leases.entry(renter).or_default().push(lease);
        Ok(Receipt::default())
    }
}

impl Transport for MemoryTransport {
    type Error = MemoryTransportError;

    fn submit(
        &self,
        auth: &RequestAuth,
        submission: Submission,
    ) -> Result<Receipt, Self::Error> {
        let (action, resource) = submission.auth_scope();
        let requester = authenticate(auth, action, &resource)?;
        tracing::trace!(%requester, action, "memory transport submission");

        let mut inner = self.inner.write();
        match submission {
            Submission::RegisterEncryptionKey(registration) => {
                inner.register_encryption_key(requester, registration)
            }
            Submission::UploadAsset {
                asset_id,
                file_name,
                accessibility,
                content,
                session_data,
            } => inner.upload(
                requester,
                asset_id,
                file_name,
                accessibility,
                content,
                session_data,
            ),
            Submission::Issue { asset, issues } => inner.issue(requester, asset, issues),
            Submission::Transfer(record) => {
                let (bitmark_id, bitmark) = inner.bitmark_by_head(record.link())?;
                if bitmark.owner != requester {
                    return Err(MemoryTransportError::Unauthorized(format!(
                        "{requester} does not own bitmark {bitmark_id}"
                    )));
                }
                record.verify(&bitmark.owner).map_err(rejected)?;
                let id = tx_id(&[record.signature()]);
                inner.move_ownership(bitmark_id, *record.owner(), id);
                Ok(Receipt {
                    tx_ids: vec![id],
                    offer_id: None,
                })
            }
            Submission::CountersignedTransfer(record) => {
                let (bitmark_id, bitmark) = inner.bitmark_by_head(record.link())?;
                record.verify(&bitmark.owner).map_err(rejected)?;
                let id = tx_id(&[record.signature(), record.countersignature()]);
                inner.move_ownership(bitmark_id, *record.owner(), id);
                Ok(Receipt {
                    tx_ids: vec![id],
                    offer_id: None,
                })
            }
            Submission::TransferOffer {
                record,
                bitmark_id,
                extra_info,
            } => inner.create_offer(requester, record, bitmark_id, extra_info),
            Submission::CompleteTransferOffer(reply) => inner.complete_offer(requester, reply),
            Submission::SessionData {
                bitmark_id,
                receiver,
                session_data,
            } => inner.add_session_data(requester, bitmark_id, receiver, session_data),
            Submission::Lease {
                bitmark_id,
                renter,
                days,
                session_data,
            } => inner.lease(requester, bitmark_id, renter, days, session_data),
        }
    }

    fn fetch_encryption_public_key(
        &self,
        account: &AccountNumber,
    ) -> Result<EncryptionKeyRegistration, Self::Error> {
        self.inner
            .read()
            .encryption_keys
            .get(account)
            .cloned()
            .ok_or_else(|| not_found(format!("encryption key of {account}")))
    }

    fn fetch_ownership(&self, bitmark_id: &TxId) -> Result<Ownership, Self::Error> {
        let bitmark = self.inner.read().bitmark(bitmark_id)?;
        Ok(Ownership {
            owner: bitmark.owner,
            head_id: bitmark.head_id,
        })
    }

    fn fetch_asset_access(
        &self,
        auth: &RequestAuth,
        bitmark_id: &TxId,
    ) -> Result<AssetAccess, Self::Error> {
        let requester = authenticate(auth, "downloadAsset", &bitmark_id.to_hex())?;
        let inner = self.inner.read();
        let bitmark = inner.bitmark(bitmark_id)?;
        let upload = inner
            .uploads
            .get(&bitmark.asset_id)
            .ok_or_else(|| not_found(format!("content of asset {}", bitmark.asset_id)))?;
        let url = upload_url(&bitmark.asset_id);

        if upload.session_data.is_none() {
            return Ok(AssetAccess {
                url,
                sender: upload.uploader,
                session_data: None,
            });
        }
        let session = inner
            .sessions
            .get(&(*bitmark_id, requester))
            .ok_or_else(|| {
                MemoryTransportError::Unauthorized(format!(
                    "no content key for {requester} on bitmark {bitmark_id}"
                ))
            })?;
        Ok(AssetAccess {
            url,
            sender: session.sender,
            session_data: Some(session.session_data.clone()),
        })
    }

    fn fetch_asset_content(&self, url: &str) -> Result<AssetContent, Self::Error> {
        let asset_id = url
            .strip_prefix(UPLOAD_URL_PREFIX)
            .and_then(|id| AssetId::from_str(id).ok())
            .ok_or_else(|| not_found(url))?;
        let inner = self.inner.read();
        let upload = inner.uploads.get(&asset_id).ok_or_else(|| not_found(url))?;
        Ok(AssetContent {
            file_name: upload.file_name.clone(),
            content: upload.content.clone(),
        })
    }

    fn fetch_leases(&self, auth: &RequestAuth) -> Result<Vec<LeaseAccess>, Self::Error> {
        let requester = authenticate(auth, "listLeases", &auth.requester.to_string())?;
        Ok(self
            .inner
            .read()
            .leases
            .get(&requester)
            .cloned()
            .unwrap_or_default())
    }

    fn fetch_transfer_offer(
        &self,
        auth: &RequestAuth,
        offer_id: &str,
    ) -> Result<TransferOffer, Self::Error> {
        let requester = authenticate(auth, "getTransferOffer", offer_id)?;
        let offer = self
            .offer(offer_id)
            .ok_or_else(|| not_found(format!("offer {offer_id}")))?;
        if requester != offer.from && requester != offer.to {
            return Err(MemoryTransportError::Unauthorized(format!(
                "{requester} is not a party to offer {offer_id}"
            )));
        }
        Ok(offer)
    }
}
