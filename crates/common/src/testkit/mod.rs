/// In-process registry for client integration tests
///
/// [`MemoryTransport`] stands in for the registry service. It keeps the
/// ledger, uploaded content, session data, offers and leases in memory and
/// enforces the same signatures and ownership rules, so client flows can be
/// exercised end to end without a network.
///
/// # Example
///
/// ```rust,ignore
/// use common::prelude::*;
/// use common::testkit::MemoryTransport;
///
/// let registry = MemoryTransport::new();
/// let client = Client::new(registry.clone(), Network::Testnet);
///
/// let alice = client.create_account()?;
/// let bob = client.create_account()?;
///
/// let file = AssetFile::new("song.flac", content, Accessibility::Private);
/// let info = AssetInfo { name: "song".into(), ..Default::default() };
/// let bitmark_ids = client.issue_by_asset_file(&alice, &file, 1, Some(&info))?;
///
/// client.transfer(&alice, &bitmark_ids[0], &bob.account_number())?;
/// let downloaded = client.download_asset(&bob, &bitmark_ids[0])?;
/// ```
mod memory;

pub use memory::{upload_url, MemoryTransport, MemoryTransportError};
