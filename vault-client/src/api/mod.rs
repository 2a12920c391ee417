//! Typed accessors for Vault endpoints.
//!
//! Accessors borrow a [`VaultClient`](crate::VaultClient) and a mount path;
//! they build [`VaultRequest`](crate::VaultRequest)s and hand them to the
//! client, which resolves the token and executes them.

pub mod auth;
pub mod kv;
pub mod pki;
pub mod sys;
pub mod transit;

pub use auth::{AppRole, Kubernetes, SecretIdInfo, SecretIdRequest, SecretIdResponse, Token, TokenCreateRequest, TokenLookup, UserPass};
pub use kv::{KvSecret, KvV1, KvV2, VersionMetadata};
pub use pki::{IssueRequest, IssuedCertificate, Pki};
pub use sys::{HealthStatus, LeaseRenewal, Sys, WrapLookup};
pub use transit::{KeyVersion, Transit, TransitKey};

use serde::Deserialize;

/// `data` of a LIST response.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct KeyList {
    #[serde(default)]
    pub keys: Vec<String>,
}

/// Join path segments, dropping empty ones and stray slashes.
pub(crate) fn join(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join() {
        assert_eq!(join(&["secret", "foo"]), "secret/foo");
        assert_eq!(join(&["/secret/", "", "/foo/bar/"]), "secret/foo/bar");
        assert_eq!(join(&["kv", "metadata", ""]), "kv/metadata");
    }
}
