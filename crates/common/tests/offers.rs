//! Integration tests for two-signature transfers

mod common;

use ::common::prelude::*;
use ::common::record::OfferAction;
use ::common::testkit::MemoryTransportError;

#[test]
fn test_offer_accepted_by_receiver() {
    let (client, registry) = common::setup();
    let alice = client.create_account().unwrap();
    let bob = client.create_account().unwrap();

    let file = common::private_file("deed.pdf", b"lot 42");
    let bitmark_id = common::issue_one(&client, &alice, &file);

    let record = client
        .sign_transfer_offer(&alice, &bitmark_id, &bob.account_number())
        .unwrap();
    let extra_info = serde_json::json!({ "price": "1 BTC" });
    let offer_id = client
        .submit_transfer_offer(&alice, &bitmark_id, record, Some(extra_info.clone()))
        .unwrap();

    // nothing moves until bob countersigns
    let ownership = registry.fetch_ownership(&bitmark_id).unwrap();
    assert_eq!(ownership.owner, alice.account_number());

    let offer = client.get_transfer_offer(&bob, &offer_id).unwrap();
    assert!(offer.open);
    assert_eq!(offer.from, alice.account_number());
    assert_eq!(offer.to, bob.account_number());
    assert_eq!(offer.bitmark_id, bitmark_id);
    assert_eq!(offer.metadata, Some(extra_info));

    let tx_id = client.accept_transfer_offer(&bob, &offer_id).unwrap();
    let ownership = registry.fetch_ownership(&bitmark_id).unwrap();
    assert_eq!(ownership.owner, bob.account_number());
    assert_eq!(ownership.head_id, tx_id);

    let closed = registry.offer(&offer_id).unwrap();
    assert!(!closed.open);
    assert_eq!(closed.status, "accepted");
    assert_eq!(closed.tx_id, Some(tx_id));

    let downloaded = client.download_asset(&bob, &bitmark_id).unwrap();
    assert_eq!(downloaded.content, file.content);

    // closed offers cannot be accepted twice
    assert!(matches!(
        client.accept_transfer_offer(&bob, &offer_id),
        Err(ClientError::Transport(MemoryTransportError::Rejected(_)))
    ));
}

#[test]
fn test_offer_rejected_and_cancelled() {
    let (client, registry) = common::setup();
    let alice = client.create_account().unwrap();
    let bob = client.create_account().unwrap();

    let file = common::public_file("ticket.txt", b"row 1 seat 1");
    let bitmark_id = common::issue_one(&client, &alice, &file);

    let record = client
        .sign_transfer_offer(&alice, &bitmark_id, &bob.account_number())
        .unwrap();
    let offer_id = client
        .submit_transfer_offer(&alice, &bitmark_id, record, None)
        .unwrap();
    let offer = client.get_transfer_offer(&bob, &offer_id).unwrap();

    let tx_id = client.complete_transfer_offer(&bob, offer.reject()).unwrap();
    assert_eq!(tx_id, None);
    assert_eq!(registry.offer(&offer_id).unwrap().status, "rejected");

    let record = client
        .sign_transfer_offer(&alice, &bitmark_id, &bob.account_number())
        .unwrap();
    let offer_id = client
        .submit_transfer_offer(&alice, &bitmark_id, record, None)
        .unwrap();
    let offer = client.get_transfer_offer(&alice, &offer_id).unwrap();

    // only the sender may withdraw
    assert!(matches!(
        client.complete_transfer_offer(&bob, offer.cancel()),
        Err(ClientError::Transport(MemoryTransportError::Unauthorized(_)))
    ));
    let reply = offer.cancel();
    assert_eq!(reply.action, OfferAction::Cancel);
    client.complete_transfer_offer(&alice, reply).unwrap();
    assert_eq!(registry.offer(&offer_id).unwrap().status, "canceled");

    let ownership = registry.fetch_ownership(&bitmark_id).unwrap();
    assert_eq!(ownership.owner, alice.account_number());
}

#[test]
fn test_offer_hidden_from_third_parties() {
    let (client, _) = common::setup();
    let alice = client.create_account().unwrap();
    let bob = client.create_account().unwrap();
    let carol = client.create_account().unwrap();

    let file = common::public_file("letter.txt", b"for bob only");
    let bitmark_id = common::issue_one(&client, &alice, &file);
    let record = client
        .sign_transfer_offer(&alice, &bitmark_id, &bob.account_number())
        .unwrap();
    let offer_id = client
        .submit_transfer_offer(&alice, &bitmark_id, record, None)
        .unwrap();

    assert!(matches!(
        client.get_transfer_offer(&carol, &offer_id),
        Err(ClientError::Transport(MemoryTransportError::Unauthorized(_)))
    ));
}

#[test]
fn test_countersign_directly() {
    let (client, registry) = common::setup();
    let alice = client.create_account().unwrap();
    let bob = client.create_account().unwrap();
    let carol = client.create_account().unwrap();

    let file = common::private_file("key.pem", b"-----BEGIN-----");
    let bitmark_id = common::issue_one(&client, &alice, &file);
    let record = client
        .sign_transfer_offer(&alice, &bitmark_id, &bob.account_number())
        .unwrap();

    assert!(matches!(
        client.countersign_transfer(&carol, &record),
        Err(ClientError::Record(_))
    ));

    let tx_id = client.countersign_transfer(&bob, &record).unwrap();
    let ownership = registry.fetch_ownership(&bitmark_id).unwrap();
    assert_eq!(ownership.owner, bob.account_number());
    assert_eq!(ownership.head_id, tx_id);

    let downloaded = client.download_asset(&bob, &bitmark_id).unwrap();
    assert_eq!(downloaded.content, file.content);
}
