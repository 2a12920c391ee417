//! Transit secrets engine: named keys, encrypt and decrypt.

use super::join;
use crate::{
    client::VaultClient,
    codec::{LeasedResponse, epoch_or_timestamp},
    error::{VaultError, VaultResult},
    request::VaultRequest,
    transport::Method,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use zeroize::{Zeroize, Zeroizing};

/// One version of a transit key.
///
/// Symmetric keys report only a creation time (epoch seconds); asymmetric
/// keys report an object with the public key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "KeyVersionWire")]
pub struct KeyVersion {
    /// When the version was created
    pub creation_time: DateTime<Utc>,
    /// Public key of asymmetric versions
    pub public_key: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeyVersionWire {
    Created(#[serde(with = "epoch_or_timestamp")] DateTime<Utc>),
    Detailed {
        #[serde(with = "epoch_or_timestamp")]
        creation_time: DateTime<Utc>,
        #[serde(default)]
        public_key: Option<String>,
    },
}

impl From<KeyVersionWire> for KeyVersion {
    fn from(wire: KeyVersionWire) -> Self {
        match wire {
            KeyVersionWire::Created(creation_time) => Self {
                creation_time,
                public_key: None,
            },
            KeyVersionWire::Detailed {
                creation_time,
                public_key,
            } => Self {
                creation_time,
                public_key: public_key.filter(|k| !k.is_empty()),
            },
        }
    }
}

/// A named transit key.
#[derive(Debug, Clone, Deserialize)]
pub struct TransitKey {
    /// Key name
    pub name: String,
    /// Key algorithm, e.g. `aes256-gcm96`
    #[serde(rename = "type")]
    pub key_type: String,
    /// Newest version
    #[serde(default)]
    pub latest_version: u32,
    /// Oldest version allowed to decrypt
    #[serde(default)]
    pub min_decryption_version: u32,
    /// Whether the key may be deleted
    #[serde(default)]
    pub deletion_allowed: bool,
    /// Whether the key may be exported
    #[serde(default)]
    pub exportable: bool,
    /// Versions keyed by version number
    #[serde(default)]
    pub keys: BTreeMap<String, KeyVersion>,
}

#[derive(Serialize)]
struct EncryptBody {
    plaintext: String,
}

#[derive(Deserialize)]
struct Ciphertext {
    ciphertext: String,
}

#[derive(Serialize)]
struct DecryptBody<'b> {
    ciphertext: &'b str,
}

#[derive(Deserialize)]
struct Plaintext {
    plaintext: String,
}

/// Transit engine mounted at `mount`.
#[derive(Debug, Clone)]
pub struct Transit<'a> {
    client: &'a VaultClient,
    mount: String,
}

impl<'a> Transit<'a> {
    pub(crate) fn new(client: &'a VaultClient, mount: impl Into<String>) -> Self {
        Self {
            client,
            mount: mount.into(),
        }
    }

    /// Read the key `name`.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotFound`] for unknown keys; any error of the call.
    pub async fn read_key(&self, name: &str) -> VaultResult<TransitKey> {
        let request = VaultRequest::<LeasedResponse<TransitKey>>::leased(
            Method::Get,
            join(&[self.mount.as_str(), "keys", name]),
        )
        .with_operation("transit.read_key");
        self.client.execute(request).await?.into_data()
    }

    /// Encrypt `plaintext` with key `name`, returning `vault:vN:...` ciphertext.
    ///
    /// # Errors
    ///
    /// Any error of the call.
    pub async fn encrypt(&self, name: &str, plaintext: &[u8]) -> VaultResult<String> {
        let body = Zeroizing::new(EncryptBody {
            plaintext: STANDARD.encode(plaintext),
        });
        let request = VaultRequest::<LeasedResponse<Ciphertext>>::leased(
            Method::Post,
            join(&[self.mount.as_str(), "encrypt", name]),
        )
        .with_operation("transit.encrypt")
        .with_body(&*body)?;
        Ok(self.client.execute(request).await?.into_data()?.ciphertext)
    }

    /// Decrypt `ciphertext` with key `name`.
    ///
    /// # Errors
    ///
    /// Any error of the call; a decode error when the plaintext is not base64.
    pub async fn decrypt(&self, name: &str, ciphertext: &str) -> VaultResult<Zeroizing<Vec<u8>>> {
        let request = VaultRequest::<LeasedResponse<Plaintext>>::leased(
            Method::Post,
            join(&[self.mount.as_str(), "decrypt", name]),
        )
        .with_operation("transit.decrypt")
        .with_body(&DecryptBody { ciphertext })?;
        let response = self.client.execute(request).await?;
        let (status, body) = (response.status, response.body.clone());
        let plaintext = Zeroizing::new(response.into_data()?.plaintext);
        STANDARD
            .decode(plaintext.as_bytes())
            .map(Zeroizing::new)
            .map_err(|e| VaultError::decode(status, &body, serde::de::Error::custom(e)))
    }
}

impl Zeroize for EncryptBody {
    fn zeroize(&mut self) {
        self.plaintext.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_versions_both_forms() {
        let key: TransitKey = serde_json::from_value(json!({
            "name": "orders",
            "type": "ed25519",
            "latest_version": 2,
            "keys": {
                "1": 1_700_000_000,
                "2": {"creation_time": "2024-03-01T10:00:00Z", "public_key": "MCowBQYDK2VwAyEA", "name": "ed25519"}
            }
        }))
        .unwrap();
        assert_eq!(key.keys["1"].creation_time.timestamp(), 1_700_000_000);
        assert!(key.keys["1"].public_key.is_none());
        assert_eq!(key.keys["2"].public_key.as_deref(), Some("MCowBQYDK2VwAyEA"));
        assert_eq!(key.key_type, "ed25519");
    }

    #[test]
    fn test_encrypt_body_is_base64() {
        let body = serde_json::to_value(EncryptBody {
            plaintext: STANDARD.encode(b"hello"),
        })
        .unwrap();
        assert_eq!(body, json!({"plaintext": "aGVsbG8="}));
    }
}
