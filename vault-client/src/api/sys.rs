//! System backend: health, response wrapping and leases.

use crate::{
    client::VaultClient,
    codec::{LeasedResponse, WrapInfo, duration, option_duration, option_epoch_or_timestamp},
    error::VaultResult,
    request::VaultRequest,
    transport::Method,
};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Statuses `sys/health` uses to report node state.
///
/// 200 active, 429 standby, 472 DR secondary, 473 performance standby,
/// 501 not initialized, 503 sealed.
pub const HEALTH_STATUSES: &[u16] = &[200, 429, 472, 473, 501, 503];

/// Body of `sys/health`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthStatus {
    /// Whether the server is initialized
    #[serde(default)]
    pub initialized: bool,
    /// Whether the server is sealed
    #[serde(default)]
    pub sealed: bool,
    /// Whether the node is a standby
    #[serde(default)]
    pub standby: bool,
    /// Whether the node is a performance standby
    #[serde(default)]
    pub performance_standby: bool,
    /// Server clock, epoch seconds
    #[serde(default, with = "option_epoch_or_timestamp")]
    pub server_time_utc: Option<DateTime<Utc>>,
    /// Server version
    #[serde(default)]
    pub version: String,
    /// Cluster name
    #[serde(default)]
    pub cluster_name: Option<String>,
    /// Cluster id
    #[serde(default)]
    pub cluster_id: Option<String>,
}

/// Body of `sys/wrapping/lookup`.
#[derive(Debug, Clone, Deserialize)]
pub struct WrapLookup {
    /// Path whose response was wrapped
    #[serde(default)]
    pub creation_path: String,
    /// When the wrapping token was created
    #[serde(default, with = "option_epoch_or_timestamp")]
    pub creation_time: Option<DateTime<Utc>>,
    /// TTL the wrapping token was created with
    #[serde(with = "duration")]
    pub creation_ttl: Duration,
}

/// Result of a lease renewal.
#[derive(Debug, Clone, Deserialize)]
pub struct LeaseRenewal {
    /// Renewed lease
    pub lease_id: String,
    /// New lease duration
    #[serde(with = "duration")]
    pub lease_duration: Duration,
    /// Whether it can be renewed again
    #[serde(default)]
    pub renewable: bool,
}

#[derive(Serialize)]
struct TokenBody<'b> {
    token: &'b str,
}

#[derive(Serialize)]
struct LeaseBody<'b> {
    lease_id: &'b str,
    #[serde(with = "option_duration", skip_serializing_if = "Option::is_none")]
    increment: Option<Duration>,
}

/// The `sys/` backend.
#[derive(Debug, Clone, Copy)]
pub struct Sys<'a> {
    client: &'a VaultClient,
}

impl<'a> Sys<'a> {
    pub(crate) const fn new(client: &'a VaultClient) -> Self {
        Self { client }
    }

    /// Node health as a bare status code, probed with HEAD.
    ///
    /// Every status in [`HEALTH_STATUSES`] is a successful answer.
    ///
    /// # Errors
    ///
    /// Connection failures and statuses outside [`HEALTH_STATUSES`].
    pub async fn health(&self) -> VaultResult<u16> {
        let request = VaultRequest::empty(Method::Head, "sys/health")
            .with_operation("sys.health")
            .expect_status(HEALTH_STATUSES)
            .unauthenticated();
        Ok(self.client.execute(request).await?.status)
    }

    /// Node health with the full status body.
    ///
    /// # Errors
    ///
    /// Connection failures, statuses outside [`HEALTH_STATUSES`], decode errors.
    pub async fn health_status(&self) -> VaultResult<HealthStatus> {
        let request = VaultRequest::<HealthStatus>::json(Method::Get, "sys/health")
            .with_operation("sys.health")
            .expect_status(HEALTH_STATUSES)
            .unauthenticated();
        Ok(self.client.execute(request).await?.into_result())
    }

    /// Wrap `data` in a new wrapping token valid for `ttl`.
    ///
    /// # Errors
    ///
    /// Any error of the call.
    pub async fn wrap<B: Serialize + ?Sized>(&self, data: &B, ttl: Duration) -> VaultResult<WrapInfo> {
        let request = VaultRequest::<LeasedResponse<Value>>::leased(Method::Post, "sys/wrapping/wrap")
            .with_operation("sys.wrapping.wrap")
            .with_wrap_ttl(ttl)
            .with_body(data)?;
        self.client.execute(request).await?.into_wrap_info()
    }

    /// Inspect a wrapping token without consuming it.
    ///
    /// # Errors
    ///
    /// A 400 service error for unknown or expired tokens.
    pub async fn wrapping_lookup(&self, wrapping_token: &SecretString) -> VaultResult<WrapLookup> {
        let request = VaultRequest::<LeasedResponse<WrapLookup>>::leased(Method::Post, "sys/wrapping/lookup")
            .with_operation("sys.wrapping.lookup")
            .with_body(&TokenBody {
                token: wrapping_token.expose_secret(),
            })?
            .unauthenticated();
        self.client.execute(request).await?.into_data()
    }

    /// Extend a lease by `increment`, or by its default TTL.
    ///
    /// # Errors
    ///
    /// Any error of the call.
    pub async fn renew_lease(&self, lease_id: &str, increment: Option<Duration>) -> VaultResult<LeaseRenewal> {
        let request = VaultRequest::<LeasedResponse<Value>>::leased(Method::Put, "sys/leases/renew")
            .with_operation("sys.leases.renew")
            .with_body(&LeaseBody { lease_id, increment })?;
        let envelope = self.client.execute(request).await?.into_result();
        Ok(LeaseRenewal {
            lease_id: envelope.lease_id.clone(),
            lease_duration: envelope.lease_ttl(),
            renewable: envelope.renewable,
        })
    }

    /// Revoke a lease immediately.
    ///
    /// # Errors
    ///
    /// Any error of the call.
    pub async fn revoke_lease(&self, lease_id: &str) -> VaultResult<()> {
        let request = VaultRequest::empty(Method::Put, "sys/leases/revoke")
            .with_operation("sys.leases.revoke")
            .with_body(&LeaseBody {
                lease_id,
                increment: None,
            })?;
        self.client.execute(request).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_health_body() {
        let health: HealthStatus = serde_json::from_value(json!({
            "initialized": true,
            "sealed": false,
            "standby": true,
            "performance_standby": false,
            "server_time_utc": 1_700_000_000,
            "version": "1.15.2",
            "cluster_name": "vault-cluster-1"
        }))
        .unwrap();
        assert!(health.standby);
        assert_eq!(health.server_time_utc.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_wrap_lookup_ttl_in_seconds() {
        let lookup: WrapLookup = serde_json::from_value(json!({
            "creation_path": "auth/approle/role/app/secret-id",
            "creation_time": "2024-03-01T10:00:00Z",
            "creation_ttl": 300
        }))
        .unwrap();
        assert_eq!(lookup.creation_ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_lease_body_omits_missing_increment() {
        let body = serde_json::to_value(LeaseBody {
            lease_id: "database/creds/app/abc",
            increment: None,
        })
        .unwrap();
        assert_eq!(body, json!({"lease_id": "database/creds/app/abc"}));

        let body = serde_json::to_value(LeaseBody {
            lease_id: "x",
            increment: Some(Duration::from_secs(3600)),
        })
        .unwrap();
        assert_eq!(body["increment"], "1h");
    }
}
