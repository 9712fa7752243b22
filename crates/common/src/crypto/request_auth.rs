//! Signed statements an account makes to the registry service outside of
//! ledger records: per-request authentication and publication of its
//! encryption public key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};

use super::account_number::AccountNumber;
use super::auth_key::AuthKey;
use super::encr_key::EncrPublicKey;
use super::KeyError;

const PART_SEPARATOR: &str = "|";

/// Authentication attached to a service request
///
/// The signed message is `action | resource | account number | unix millis`.
/// The service rebuilds it from the request and the three fields here.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestAuth {
    pub requester: AccountNumber,
    pub timestamp: i64,
    #[serde_as(as = "Hex")]
    pub signature: Vec<u8>,
}

impl RequestAuth {
    /// Sign `action` on `resource` as of now
    pub fn sign(
        auth_key: &AuthKey,
        requester: AccountNumber,
        action: &str,
        resource: &str,
    ) -> Self {
        Self::sign_at(auth_key, requester, action, resource, Utc::now())
    }

    pub fn sign_at(
        auth_key: &AuthKey,
        requester: AccountNumber,
        action: &str,
        resource: &str,
        at: DateTime<Utc>,
    ) -> Self {
        let timestamp = at.timestamp_millis();
        let message = request_message(action, resource, &requester, timestamp);
        Self {
            requester,
            timestamp,
            signature: auth_key.sign(message.as_bytes()).to_vec(),
        }
    }

    /// Check the signature for the given action and resource
    pub fn verify(&self, action: &str, resource: &str) -> Result<(), KeyError> {
        let message = request_message(action, resource, &self.requester, self.timestamp);
        self.requester
            .public_key()
            .verify(message.as_bytes(), &self.signature)
    }

    /// Header name/value pairs as sent by the HTTP transport
    pub fn headers(&self) -> [(&'static str, String); 3] {
        [
            ("requester", self.requester.to_string()),
            ("timestamp", self.timestamp.to_string()),
            ("signature", hex::encode(&self.signature)),
        ]
    }
}

fn request_message(
    action: &str,
    resource: &str,
    requester: &AccountNumber,
    timestamp: i64,
) -> String {
    [
        action.to_string(),
        resource.to_string(),
        requester.to_string(),
        timestamp.to_string(),
    ]
    .join(PART_SEPARATOR)
}

/// An account's encryption public key, signed by its signing key
///
/// Senders fetch this to wrap content keys for the account. The signature
/// covers the raw 32 public key bytes, so a recipient key served by the
/// registry can be checked against the account number it is filed under.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionKeyRegistration {
    pub encryption_pubkey: EncrPublicKey,
    #[serde_as(as = "Hex")]
    pub signature: Vec<u8>,
}

impl EncryptionKeyRegistration {
    pub fn new(auth_key: &AuthKey, encryption_pubkey: EncrPublicKey) -> Self {
        let signature = auth_key.sign(&encryption_pubkey.to_bytes()).to_vec();
        Self {
            encryption_pubkey,
            signature,
        }
    }

    /// Check the registration was signed by `owner`
    pub fn verify(&self, owner: &AccountNumber) -> Result<(), KeyError> {
        owner
            .public_key()
            .verify(&self.encryption_pubkey.to_bytes(), &self.signature)
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;
    use crate::crypto::EncrKey;
    use crate::network::Network;

    fn signer(byte: u8) -> (AuthKey, AccountNumber) {
        let key = AuthKey::from_seed(&[byte; 32]);
        let account = AccountNumber::new(key.public_key(), Network::Testnet);
        (key, account)
    }

    #[test]
    fn test_request_auth() {
        let (key, account) = signer(1);
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let auth = RequestAuth::sign_at(&key, account, "uploadAsset", "bitmark-id", at);

        assert_eq!(auth.timestamp, 1_700_000_000_123);
        let message = format!("uploadAsset|bitmark-id|{account}|1700000000123");
        assert!(key
            .public_key()
            .verify(message.as_bytes(), &auth.signature)
            .is_ok());

        assert!(auth.verify("uploadAsset", "bitmark-id").is_ok());
        assert!(matches!(
            auth.verify("downloadAsset", "bitmark-id"),
            Err(KeyError::InvalidSignature)
        ));
    }

    #[test]
    fn test_request_auth_headers() {
        let (key, account) = signer(2);
        let auth = RequestAuth::sign(&key, account, "updateLease", "lease");
        let headers = auth.headers();
        assert_eq!(headers[0], ("requester", account.to_string()));
        assert_eq!(headers[1].1, auth.timestamp.to_string());
        assert_eq!(headers[2].1.len(), 128);
    }

    #[test]
    fn test_encryption_key_registration() {
        let (key, account) = signer(3);
        let (_, other) = signer(4);
        let encr = EncrKey::from_seed(&[7u8; 32]);

        let registration = EncryptionKeyRegistration::new(&key, encr.public_key());
        assert!(registration.verify(&account).is_ok());
        assert!(registration.verify(&other).is_err());

        let json = serde_json::to_value(&registration).unwrap();
        assert_eq!(json["encryption_pubkey"], encr.public_key().to_hex());
        let back: EncryptionKeyRegistration = serde_json::from_value(json).unwrap();
        assert_eq!(back, registration);
    }
}
