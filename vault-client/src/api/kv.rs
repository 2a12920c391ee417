//! Key/value secrets engines, versions 1 and 2.

use super::{KeyList, join};
use crate::{
    client::VaultClient,
    codec::{LeasedResponse, option_epoch_or_timestamp},
    error::VaultResult,
    request::VaultRequest,
    transport::Method,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashMap;

/// KV version 1 engine mounted at `mount`.
#[derive(Debug, Clone)]
pub struct KvV1<'a> {
    client: &'a VaultClient,
    mount: String,
}

impl<'a> KvV1<'a> {
    pub(crate) fn new(client: &'a VaultClient, mount: impl Into<String>) -> Self {
        Self {
            client,
            mount: mount.into(),
        }
    }

    /// Read the secret at `path`.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotFound`](crate::VaultError::NotFound) when nothing is
    /// stored there; any error of the call.
    pub async fn read<T: DeserializeOwned>(&self, path: &str) -> VaultResult<T> {
        let request = VaultRequest::<LeasedResponse<T>>::leased(Method::Get, join(&[self.mount.as_str(), path]))
            .with_operation("kv1.read");
        self.client.execute(request).await?.into_data()
    }

    /// Replace the secret at `path` with `data`.
    ///
    /// # Errors
    ///
    /// Any error of the call.
    pub async fn write<B: Serialize + ?Sized>(&self, path: &str, data: &B) -> VaultResult<()> {
        let request = VaultRequest::empty(Method::Put, join(&[self.mount.as_str(), path]))
            .with_operation("kv1.write")
            .with_body(data)?;
        self.client.execute(request).await.map(|_| ())
    }

    /// Keys directly under `path`; folders end with `/`.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotFound`](crate::VaultError::NotFound) when nothing
    /// is stored under `path`.
    pub async fn list(&self, path: &str) -> VaultResult<Vec<String>> {
        let request = VaultRequest::<LeasedResponse<KeyList>>::leased(Method::List, join(&[self.mount.as_str(), path]))
            .with_operation("kv1.list");
        Ok(self.client.execute(request).await?.into_data()?.keys)
    }

    /// Delete the secret at `path`.
    ///
    /// # Errors
    ///
    /// Any error of the call.
    pub async fn delete(&self, path: &str) -> VaultResult<()> {
        let request = VaultRequest::empty(Method::Delete, join(&[self.mount.as_str(), path]))
            .with_operation("kv1.delete");
        self.client.execute(request).await.map(|_| ())
    }
}

/// Metadata of one KV v2 secret version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMetadata {
    /// Version number
    #[serde(default)]
    pub version: u64,
    /// When the version was written
    #[serde(default, with = "option_epoch_or_timestamp")]
    pub created_time: Option<DateTime<Utc>>,
    /// When the version was soft-deleted, if it was
    #[serde(default, with = "option_epoch_or_timestamp")]
    pub deletion_time: Option<DateTime<Utc>>,
    /// Whether the version was destroyed
    #[serde(default)]
    pub destroyed: bool,
    /// User metadata of the secret
    #[serde(default)]
    pub custom_metadata: Option<HashMap<String, String>>,
}

/// A KV v2 secret version with its metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct KvSecret<T> {
    /// Secret payload
    pub data: T,
    /// Version metadata
    pub metadata: VersionMetadata,
}

#[derive(Serialize)]
struct DataBody<'b, B: ?Sized> {
    data: &'b B,
}

/// KV version 2 engine mounted at `mount`.
#[derive(Debug, Clone)]
pub struct KvV2<'a> {
    client: &'a VaultClient,
    mount: String,
}

impl<'a> KvV2<'a> {
    pub(crate) fn new(client: &'a VaultClient, mount: impl Into<String>) -> Self {
        Self {
            client,
            mount: mount.into(),
        }
    }

    /// Read `path`, the latest version unless `version` is given.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotFound`](crate::VaultError::NotFound) for unknown
    /// paths or versions; any error of the call.
    pub async fn read<T: DeserializeOwned>(&self, path: &str, version: Option<u64>) -> VaultResult<KvSecret<T>> {
        let mut request =
            VaultRequest::<LeasedResponse<KvSecret<T>>>::leased(Method::Get, join(&[self.mount.as_str(), "data", path]))
                .with_operation("kv2.read");
        if let Some(version) = version {
            request = request.with_query("version", version.to_string());
        }
        self.client.execute(request).await?.into_data()
    }

    /// Write a new version of `path`.
    ///
    /// # Errors
    ///
    /// Any error of the call.
    pub async fn write<B: Serialize + ?Sized>(&self, path: &str, data: &B) -> VaultResult<VersionMetadata> {
        let request =
            VaultRequest::<LeasedResponse<VersionMetadata>>::leased(Method::Post, join(&[self.mount.as_str(), "data", path]))
                .with_operation("kv2.write")
                .with_body(&DataBody { data })?;
        self.client.execute(request).await?.into_data()
    }

    /// Keys directly under `path`.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotFound`](crate::VaultError::NotFound) when nothing
    /// is stored under `path`.
    pub async fn list(&self, path: &str) -> VaultResult<Vec<String>> {
        let request =
            VaultRequest::<LeasedResponse<KeyList>>::leased(Method::List, join(&[self.mount.as_str(), "metadata", path]))
                .with_operation("kv2.list");
        Ok(self.client.execute(request).await?.into_data()?.keys)
    }

    /// Soft-delete the latest version of `path`.
    ///
    /// # Errors
    ///
    /// Any error of the call.
    pub async fn delete(&self, path: &str) -> VaultResult<()> {
        let request = VaultRequest::empty(Method::Delete, join(&[self.mount.as_str(), "data", path]))
            .with_operation("kv2.delete");
        self.client.execute(request).await.map(|_| ())
    }
}
