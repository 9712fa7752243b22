//! # Registry client
//!
//! [`Client`] composes accounts, records and session data into the flows an
//! asset holder runs against the registry: creating accounts, issuing,
//! transferring, renting and downloading. All I/O goes through a
//! [`Transport`].
//!
//! ## Content key hand-off
//!
//! Private content is encrypted once, at upload, under a fresh content key
//! that is wrapped for the issuer. From then on every holder who passes the
//! bitmark on (or rents it out) unwraps the key from the session data they
//! received and wraps it again for the next party. The key itself never
//! changes and never leaves the client unwrapped.
//!
//! Counterparty encryption keys are fetched from the registry as signed
//! registrations and checked against the counterparty's account number
//! before anything is wrapped for them.

use std::collections::BTreeMap;
use std::fmt::{Debug, Display};

use crate::account::Account;
use crate::asset_file::{Accessibility, AssetFile};
use crate::config::Config;
use crate::crypto::{
    AccountNumber, CipherError, DataKey, EncrPublicKey, KeyError, RequestAuth, RootSeed,
    SeedError, SessionData, SessionError,
};
use crate::network::Network;
use crate::record::{
    AssetId, AssetRecord, CountersignedTransferRecord, IssueRecord, OfferReply, RecordBuilder,
    RecordError, TransferOffer, TransferOfferRecord, TxId,
};
use crate::transport::{AssetContent, LeaseAccess, Receipt, Submission, Transport};

#[derive(Debug, thiserror::Error)]
pub enum ClientError<E: Display + Debug> {
    #[error("transport error: {0}")]
    Transport(E),
    #[error("{account} is not the owner of bitmark {bitmark_id}")]
    NotOwner {
        account: AccountNumber,
        bitmark_id: TxId,
    },
    #[error("{found} account used with a {expected} client")]
    NetworkMismatch { expected: Network, found: Network },
    #[error("public assets cannot be rented")]
    PublicAsset,
    #[error("registry returned no transaction id")]
    EmptyReceipt,
    #[error("seed error: {0}")]
    Seed(#[from] SeedError),
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),
    #[error("session data error: {0}")]
    Session(#[from] SessionError),
    #[error("record error: {0}")]
    Record(#[from] RecordError),
}

/// Name and metadata to register an asset under
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetInfo {
    pub name: String,
    pub metadata: BTreeMap<String, String>,
}

pub struct Client<T: Transport> {
    transport: T,
    network: Network,
    seed_version: u8,
    builder: RecordBuilder,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T, network: Network) -> Self {
        Self::from_config(transport, &Config::new(network))
    }

    pub fn from_config(transport: T, config: &Config) -> Self {
        Self {
            transport,
            network: config.network,
            seed_version: config.seed_version,
            builder: RecordBuilder::new(),
        }
    }

    /// Use `builder`, and its issue nonce counter, for every record
    pub fn with_builder(mut self, builder: RecordBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn builder(&self) -> &RecordBuilder {
        &self.builder
    }

    /// Create an account and register its encryption key
    pub fn create_account(&self) -> Result<Account, ClientError<T::Error>> {
        let account =
            Account::from_root_seed(RootSeed::generate(), self.network, self.seed_version)?;
        let registration = account.encryption_key_registration();
        self.submit(&account, Submission::RegisterEncryptionKey(registration))?;
        tracing::info!(
            account = %account.account_number(),
            network = %self.network,
            "created account"
        );
        Ok(account)
    }

    pub fn restore_account_from_seed_string(
        &self,
        seed: &str,
    ) -> Result<Account, ClientError<T::Error>> {
        self.check_network(Account::from_seed_string(seed)?)
    }

    pub fn restore_account_from_phrase<S: AsRef<str>>(
        &self,
        words: &[S],
    ) -> Result<Account, ClientError<T::Error>> {
        self.check_network(Account::from_recovery_phrase(words)?)
    }

    fn check_network(&self, account: Account) -> Result<Account, ClientError<T::Error>> {
        if account.network() != self.network {
            return Err(ClientError::NetworkMismatch {
                expected: self.network,
                found: account.network(),
            });
        }
        tracing::debug!(account = %account.account_number(), "restored account");
        Ok(account)
    }

    /// Upload `file` and issue `quantity` bitmarks of it
    ///
    /// Pass `info` to register the asset in the same submission. Private
    /// content is encrypted under a fresh content key wrapped for `account`.
    /// Returns the new bitmark ids.
    pub fn issue_by_asset_file(
        &self,
        account: &Account,
        file: &AssetFile,
        quantity: usize,
        info: Option<&AssetInfo>,
    ) -> Result<Vec<TxId>, ClientError<T::Error>> {
        let asset = info
            .map(|info| {
                self.builder
                    .build_asset_record(&info.name, &file.fingerprint, &info.metadata, account)
            })
            .transpose()?;
        let asset_id = file.id();
        let issues = self.builder.build_issue_records(&asset_id, account, quantity);

        let (content, session_data) = match file.accessibility {
            Accessibility::Public => (file.content.clone(), None),
            Accessibility::Private => {
                let (ciphertext, key) = DataKey::generate().encrypt(&file.content)?;
                let session_data = SessionData::wrap(
                    account.auth_key(),
                    account.encr_key(),
                    &key,
                    &account.encr_key().public_key(),
                )?;
                (ciphertext, Some(session_data))
            }
        };
        self.submit(
            account,
            Submission::UploadAsset {
                asset_id,
                file_name: file.name.clone(),
                accessibility: file.accessibility,
                content,
                session_data,
            },
        )?;

        let bitmark_ids = self.submit_issues(account, asset, issues)?;
        tracing::info!(%asset_id, count = bitmark_ids.len(), "issued bitmarks from asset file");
        Ok(bitmark_ids)
    }

    /// Issue more bitmarks of an already registered asset
    pub fn issue_by_asset_id(
        &self,
        account: &Account,
        asset_id: &AssetId,
        quantity: usize,
    ) -> Result<Vec<TxId>, ClientError<T::Error>> {
        let issues = self.builder.build_issue_records(asset_id, account, quantity);
        let bitmark_ids = self.submit_issues(account, None, issues)?;
        tracing::info!(%asset_id, count = bitmark_ids.len(), "issued bitmarks");
        Ok(bitmark_ids)
    }

    fn submit_issues(
        &self,
        account: &Account,
        asset: Option<AssetRecord>,
        issues: Vec<IssueRecord>,
    ) -> Result<Vec<TxId>, ClientError<T::Error>> {
        let expected = issues.len();
        let receipt = self.submit(account, Submission::Issue { asset, issues })?;
        if receipt.tx_ids.len() < expected {
            return Err(ClientError::EmptyReceipt);
        }
        Ok(receipt.tx_ids)
    }

    /// Transfer a bitmark `account` owns to `receiver`
    ///
    /// For private assets the content key is handed to the receiver first.
    pub fn transfer(
        &self,
        account: &Account,
        bitmark_id: &TxId,
        receiver: &AccountNumber,
    ) -> Result<TxId, ClientError<T::Error>> {
        let head_id = self.check_owner(account, bitmark_id)?;
        let record = self
            .builder
            .build_transfer_record(&head_id, receiver, account)?;
        self.hand_over_content_key(account, bitmark_id, receiver)?;

        let tx_id = self.submit_single(account, Submission::Transfer(record))?;
        tracing::info!(%bitmark_id, %receiver, %tx_id, "transferred bitmark");
        Ok(tx_id)
    }

    /// Prepare a two-signature transfer of a bitmark `sender` owns
    ///
    /// The receiver gets the content key right away; ownership only moves
    /// once they countersign.
    pub fn sign_transfer_offer(
        &self,
        sender: &Account,
        bitmark_id: &TxId,
        receiver: &AccountNumber,
    ) -> Result<TransferOfferRecord, ClientError<T::Error>> {
        let head_id = self.check_owner(sender, bitmark_id)?;
        let record = self
            .builder
            .build_transfer_offer(&head_id, receiver, sender)?;
        self.hand_over_content_key(sender, bitmark_id, receiver)?;
        Ok(record)
    }

    /// Store a signed offer with the registry, returning the offer id
    pub fn submit_transfer_offer(
        &self,
        sender: &Account,
        bitmark_id: &TxId,
        record: TransferOfferRecord,
        extra_info: Option<serde_json::Value>,
    ) -> Result<String, ClientError<T::Error>> {
        let receipt = self.submit(
            sender,
            Submission::TransferOffer {
                record,
                bitmark_id: *bitmark_id,
                extra_info,
            },
        )?;
        let offer_id = receipt.offer_id.ok_or(ClientError::EmptyReceipt)?;
        tracing::info!(%bitmark_id, %offer_id, "submitted transfer offer");
        Ok(offer_id)
    }

    pub fn get_transfer_offer(
        &self,
        account: &Account,
        offer_id: &str,
    ) -> Result<TransferOffer, ClientError<T::Error>> {
        let auth = self.request_auth(account, "getTransferOffer", offer_id);
        self.transport
            .fetch_transfer_offer(&auth, offer_id)
            .map_err(ClientError::Transport)
    }

    /// Accept, reject or cancel an offer
    ///
    /// Returns the transfer transaction id when the offer was accepted.
    pub fn complete_transfer_offer(
        &self,
        account: &Account,
        reply: OfferReply,
    ) -> Result<Option<TxId>, ClientError<T::Error>> {
        let offer_id = reply.id.clone();
        let action = reply.action;
        let receipt = self.submit(account, Submission::CompleteTransferOffer(reply))?;
        tracing::info!(%offer_id, %action, "completed transfer offer");
        Ok(receipt.tx_ids.first().copied())
    }

    /// Fetch an offer addressed to `receiver`, countersign it and accept it
    pub fn accept_transfer_offer(
        &self,
        receiver: &Account,
        offer_id: &str,
    ) -> Result<TxId, ClientError<T::Error>> {
        let offer = self.get_transfer_offer(receiver, offer_id)?;
        let (reply, _) = offer.accept(receiver)?;
        self.complete_transfer_offer(receiver, reply)?
            .ok_or(ClientError::EmptyReceipt)
    }

    /// Countersign an offer record directly and submit the transfer
    pub fn countersign_transfer(
        &self,
        receiver: &Account,
        offer: &TransferOfferRecord,
    ) -> Result<TxId, ClientError<T::Error>> {
        let record = offer.countersign(receiver)?;
        self.submit_countersigned_transfer(receiver, record)
    }

    pub fn submit_countersigned_transfer(
        &self,
        account: &Account,
        record: CountersignedTransferRecord,
    ) -> Result<TxId, ClientError<T::Error>> {
        let tx_id = self.submit_single(account, Submission::CountersignedTransfer(record))?;
        tracing::info!(%tx_id, "submitted countersigned transfer");
        Ok(tx_id)
    }

    /// Download a bitmark's content, decrypting it for private assets
    pub fn download_asset(
        &self,
        account: &Account,
        bitmark_id: &TxId,
    ) -> Result<AssetContent, ClientError<T::Error>> {
        let auth = self.request_auth(account, "downloadAsset", &bitmark_id.to_hex());
        let access = self
            .transport
            .fetch_asset_access(&auth, bitmark_id)
            .map_err(ClientError::Transport)?;
        let mut content = self
            .transport
            .fetch_asset_content(&access.url)
            .map_err(ClientError::Transport)?;

        if let Some(session_data) = &access.session_data {
            let key = self.unwrap_session(account, session_data, &access.sender)?;
            content.content = key.decrypt(&content.content)?;
        }
        tracing::debug!(%bitmark_id, size = content.content.len(), "downloaded asset");
        Ok(content)
    }

    /// Let `renter` read a private bitmark's content for `days`
    pub fn rent_bitmark(
        &self,
        lessor: &Account,
        bitmark_id: &TxId,
        renter: &AccountNumber,
        days: u32,
    ) -> Result<(), ClientError<T::Error>> {
        let auth = self.request_auth(lessor, "downloadAsset", &bitmark_id.to_hex());
        let access = self
            .transport
            .fetch_asset_access(&auth, bitmark_id)
            .map_err(ClientError::Transport)?;
        let session_data = access.session_data.ok_or(ClientError::PublicAsset)?;

        let key = self.unwrap_session(lessor, &session_data, &access.sender)?;
        let session_data = self.wrap_for(lessor, &key, renter)?;
        self.submit(
            lessor,
            Submission::Lease {
                bitmark_id: *bitmark_id,
                renter: *renter,
                days,
                session_data,
            },
        )?;
        tracing::info!(%bitmark_id, %renter, days, "rented bitmark");
        Ok(())
    }

    pub fn list_leases(&self, renter: &Account) -> Result<Vec<LeaseAccess>, ClientError<T::Error>> {
        let auth = self.request_auth(renter, "listLeases", &renter.account_number().to_string());
        self.transport
            .fetch_leases(&auth)
            .map_err(ClientError::Transport)
    }

    pub fn download_asset_by_lease(
        &self,
        renter: &Account,
        lease: &LeaseAccess,
    ) -> Result<AssetContent, ClientError<T::Error>> {
        let mut content = self
            .transport
            .fetch_asset_content(&lease.url)
            .map_err(ClientError::Transport)?;
        let key = self.unwrap_session(renter, &lease.session_data, &lease.owner)?;
        content.content = key.decrypt(&content.content)?;
        Ok(content)
    }

    fn check_owner(
        &self,
        account: &Account,
        bitmark_id: &TxId,
    ) -> Result<TxId, ClientError<T::Error>> {
        let ownership = self
            .transport
            .fetch_ownership(bitmark_id)
            .map_err(ClientError::Transport)?;
        let account_number = account.account_number();
        if ownership.owner != account_number {
            tracing::warn!(
                %bitmark_id,
                account = %account_number,
                owner = %ownership.owner,
                "not the bitmark owner"
            );
            return Err(ClientError::NotOwner {
                account: account_number,
                bitmark_id: *bitmark_id,
            });
        }
        Ok(ownership.head_id)
    }

    /// Rewrap a private bitmark's content key for `receiver`. No-op for
    /// public assets.
    fn hand_over_content_key(
        &self,
        account: &Account,
        bitmark_id: &TxId,
        receiver: &AccountNumber,
    ) -> Result<(), ClientError<T::Error>> {
        let auth = self.request_auth(account, "downloadAsset", &bitmark_id.to_hex());
        let access = self
            .transport
            .fetch_asset_access(&auth, bitmark_id)
            .map_err(ClientError::Transport)?;
        let Some(session_data) = access.session_data else {
            return Ok(());
        };

        let key = self.unwrap_session(account, &session_data, &access.sender)?;
        let session_data = self.wrap_for(account, &key, receiver)?;
        self.submit(
            account,
            Submission::SessionData {
                bitmark_id: *bitmark_id,
                receiver: *receiver,
                session_data,
            },
        )?;
        tracing::debug!(%bitmark_id, %receiver, "handed over content key");
        Ok(())
    }

    fn unwrap_session(
        &self,
        account: &Account,
        session_data: &SessionData,
        sender: &AccountNumber,
    ) -> Result<DataKey, ClientError<T::Error>> {
        let sender_encr = if *sender == account.account_number() {
            account.encr_key().public_key()
        } else {
            self.encryption_key_of(sender)?
        };
        Ok(session_data.unwrap(account.encr_key(), &sender_encr, &sender.public_key())?)
    }

    fn wrap_for(
        &self,
        account: &Account,
        key: &DataKey,
        receiver: &AccountNumber,
    ) -> Result<SessionData, ClientError<T::Error>> {
        let recipient = self.encryption_key_of(receiver)?;
        Ok(SessionData::wrap(
            account.auth_key(),
            account.encr_key(),
            key,
            &recipient,
        )?)
    }

    /// Registered encryption key of `account`, checked against its signature
    fn encryption_key_of(
        &self,
        account: &AccountNumber,
    ) -> Result<EncrPublicKey, ClientError<T::Error>> {
        let registration = self
            .transport
            .fetch_encryption_public_key(account)
            .map_err(ClientError::Transport)?;
        registration.verify(account).map_err(|e| {
            tracing::warn!(%account, "encryption key registration failed verification");
            e
        })?;
        Ok(registration.encryption_pubkey)
    }

    fn request_auth(&self, account: &Account, action: &str, resource: &str) -> RequestAuth {
        RequestAuth::sign(account.auth_key(), account.account_number(), action, resource)
    }

    fn submit(
        &self,
        account: &Account,
        submission: Submission,
    ) -> Result<Receipt, ClientError<T::Error>> {
        let (action, resource) = submission.auth_scope();
        let auth = self.request_auth(account, action, &resource);
        self.transport
            .submit(&auth, submission)
            .map_err(ClientError::Transport)
    }

    fn submit_single(
        &self,
        account: &Account,
        submission: Submission,
    ) -> Result<TxId, ClientError<T::Error>> {
        let receipt = self.submit(account, submission)?;
        receipt
            .tx_ids
            .first()
            .copied()
            .ok_or(ClientError::EmptyReceipt)
    }
}
