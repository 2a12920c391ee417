//! PKI secrets engine.

use super::join;
use crate::{
    client::VaultClient,
    codec::{LeasedResponse, comma_list, option_duration, option_epoch_or_timestamp},
    error::VaultResult,
    request::VaultRequest,
    transport::Method,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

/// Parameters of `:mount/issue/:role`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IssueRequest {
    /// Certificate CN
    pub common_name: String,
    /// DNS subject alternative names
    #[serde(with = "comma_list", skip_serializing_if = "Vec::is_empty")]
    pub alt_names: Vec<String>,
    /// IP subject alternative names
    #[serde(with = "comma_list", skip_serializing_if = "Vec::is_empty")]
    pub ip_sans: Vec<String>,
    /// Requested lifetime
    #[serde(with = "option_duration", skip_serializing_if = "Option::is_none")]
    pub ttl: Option<Duration>,
    /// `pem`, `der` or `pem_bundle`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl IssueRequest {
    /// Request a certificate for `common_name`.
    #[must_use]
    pub fn new(common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            ..Default::default()
        }
    }
}

/// A certificate issued together with its private key.
#[derive(Clone, Deserialize)]
pub struct IssuedCertificate {
    /// Leaf certificate
    pub certificate: String,
    /// Issuing CA certificate
    #[serde(default)]
    pub issuing_ca: String,
    /// Full chain
    #[serde(default)]
    pub ca_chain: Vec<String>,
    /// Private key of the leaf
    pub private_key: String,
    /// Key algorithm
    #[serde(default)]
    pub private_key_type: String,
    /// Serial number, colon-separated hex
    #[serde(default)]
    pub serial_number: String,
    /// Expiry, epoch seconds on the wire
    #[serde(default, with = "option_epoch_or_timestamp")]
    pub expiration: Option<DateTime<Utc>>,
}

impl fmt::Debug for IssuedCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedCertificate")
            .field("serial_number", &self.serial_number)
            .field("private_key_type", &self.private_key_type)
            .field("private_key", &"[REDACTED]")
            .field("expiration", &self.expiration)
            .finish_non_exhaustive()
    }
}

/// PKI engine mounted at `mount`.
#[derive(Debug, Clone)]
pub struct Pki<'a> {
    client: &'a VaultClient,
    mount: String,
}

impl<'a> Pki<'a> {
    pub(crate) fn new(client: &'a VaultClient, mount: impl Into<String>) -> Self {
        Self {
            client,
            mount: mount.into(),
        }
    }

    /// CA certificate in PEM form, served as plain text.
    ///
    /// # Errors
    ///
    /// Any error of the call.
    pub async fn ca_pem(&self) -> VaultResult<Vec<u8>> {
        let request = VaultRequest::raw(Method::Get, join(&[self.mount.as_str(), "ca", "pem"]))
            .with_operation("pki.ca_pem")
            .unauthenticated();
        Ok(self.client.execute(request).await?.into_result())
    }

    /// Issue a certificate under `role`.
    ///
    /// # Errors
    ///
    /// Any error of the call; a 400 when the role rejects the request.
    pub async fn issue(&self, role: &str, params: &IssueRequest) -> VaultResult<IssuedCertificate> {
        let request = VaultRequest::<LeasedResponse<IssuedCertificate>>::leased(
            Method::Post,
            join(&[self.mount.as_str(), "issue", role]),
        )
        .with_operation("pki.issue")
        .with_body(params)?;
        self.client.execute(request).await?.into_data()
    }
}
