//! Shared helpers for registry client integration tests
#![allow(dead_code)]

use std::collections::BTreeMap;

use ::common::prelude::*;
use ::common::testkit::MemoryTransport;

pub type TestClient = Client<MemoryTransport>;

pub const FIXTURE_SEED_STRING: &str = "5XEECttxvRBzxzAmuV4oh6T1FcQu4mBg8eWd9wKbf8hweXsfwtJ8sfH";
pub const FIXTURE_ACCOUNT: &str = "e1pFRPqPhY2gpgJTpCiwXDnVeouY9EjHY6STtKwdN6Z4bp4sog";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A testnet client over a fresh in-memory registry
///
/// The returned transport shares state with the client's, for inspection.
pub fn setup() -> (TestClient, MemoryTransport) {
    init_tracing();
    let registry = MemoryTransport::new();
    (Client::new(registry.clone(), Network::Testnet), registry)
}

pub fn asset_info(name: &str) -> AssetInfo {
    AssetInfo {
        name: name.to_string(),
        metadata: BTreeMap::from([("source".to_string(), "integration test".to_string())]),
    }
}

pub fn private_file(name: &str, content: &[u8]) -> AssetFile {
    AssetFile::new(name, content.to_vec(), Accessibility::Private)
}

pub fn public_file(name: &str, content: &[u8]) -> AssetFile {
    AssetFile::new(name, content.to_vec(), Accessibility::Public)
}

/// Where the in-memory registry serves `file`'s uploaded content
pub fn content_url(file: &AssetFile) -> String {
    ::common::testkit::upload_url(&file.id())
}

/// Register `file` and issue a single bitmark of it to `account`
pub fn issue_one(client: &TestClient, account: &Account, file: &AssetFile) -> TxId {
    let bitmark_ids = client
        .issue_by_asset_file(account, file, 1, Some(&asset_info(&file.name)))
        .unwrap();
    assert_eq!(bitmark_ids.len(), 1);
    bitmark_ids[0]
}
