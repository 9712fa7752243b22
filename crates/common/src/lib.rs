/**
 * Accounts: a root seed with its derived
 *  signing and encryption keys, and every
 *  serialized form of the seed.
 */
pub mod account;
/**
 * Asset content to register, with its
 *  fingerprint and accessibility.
 */
pub mod asset_file;
/**
 * High-level registry flows over a
 *  pluggable transport.
 */
pub mod client;
/**
 * Varint encoding and the packed byte layout
 *  records are signed over.
 */
pub mod codec;
/**
 * Client configuration, loaded from TOML.
 */
pub mod config;
/**
 * Cryptographic types and operations.
 *  - Seed derivation, signing and key agreement keys
 *  - Content keys and their hand-off between accounts
 */
pub mod crypto;
pub mod network;
/**
 * Ledger records: assets, issues, transfers
 *  and two-signature transfer offers.
 */
pub mod record;
/**
 * In-memory registry for exercising the client.
 */
pub mod testkit;
/**
 * The client's view of the registry service.
 */
pub mod transport;

pub mod prelude {
    pub use crate::account::Account;
    pub use crate::asset_file::{Accessibility, AssetFile};
    pub use crate::client::{AssetInfo, Client, ClientError};
    pub use crate::config::Config;
    pub use crate::crypto::{AccountNumber, DataKey, RootSeed, SessionData};
    pub use crate::network::Network;
    pub use crate::record::{AssetId, RecordBuilder, TransferOffer, TxId};
    pub use crate::transport::Transport;
}
