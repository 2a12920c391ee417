//! Response-wrapping resolver.
//!
//! A wrapping token can be exchanged exactly once. The resolver guarantees
//! that a process never tries twice: the first request for a token starts
//! the unwrap, every other request for the same token (concurrent or later)
//! awaits that same computation, and the outcome is kept for the configured
//! retention window whether it succeeded or failed.

use crate::{
    codec::{self, AuthInfo, LeasedResponse},
    error::{VaultError, VaultResult},
    executor::RequestExecutor,
    masking::Confidentiality,
    request::VaultRequest,
    transport::Method,
};
use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, instrument};

const UNWRAP_PATH: &str = "sys/wrapping/unwrap";

const INVALID_WRAPPING_TOKEN: &str = "wrapping token is not valid or does not exist; \
    it has either expired (consider a longer wrap TTL), or was already consumed by \
    somebody else, which may mean the wrapping token has been stolen";

type SharedUnwrap = Shared<BoxFuture<'static, VaultResult<SecretString>>>;

struct CacheEntry {
    computation: SharedUnwrap,
    expires_at: Instant,
}

/// Exchanges wrapping tokens for the values they protect, at most once each.
pub struct WrappingResolver {
    executor: Arc<RequestExecutor>,
    ttl: Duration,
    confidentiality: Confidentiality,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl std::fmt::Debug for WrappingResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WrappingResolver")
            .field("ttl", &self.ttl)
            .field("confidentiality", &self.confidentiality)
            .finish_non_exhaustive()
    }
}

/// Payload of a wrapped AppRole secret id.
#[derive(Debug, Clone, Deserialize)]
pub struct SecretIdPayload {
    /// The secret id
    pub secret_id: String,
}

/// Payload of a wrapped userpass password.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordPayload {
    /// The password
    pub password: String,
}

/// Extract the client token from an unwrapped `auth` block.
#[allow(clippy::needless_pass_by_value, clippy::missing_const_for_fn)]
#[must_use]
pub fn client_token(auth: AuthInfo) -> Option<String> {
    Some(auth.client_token).filter(|t| !t.is_empty())
}

/// Extract the secret id from an unwrapped secret-id response.
#[allow(clippy::needless_pass_by_value)]
#[must_use]
pub fn secret_id(payload: SecretIdPayload) -> Option<String> {
    Some(payload.secret_id).filter(|s| !s.is_empty())
}

/// Extract the password from an unwrapped KV payload.
#[allow(clippy::needless_pass_by_value)]
#[must_use]
pub fn password(payload: PasswordPayload) -> Option<String> {
    Some(payload.password).filter(|p| !p.is_empty())
}

impl WrappingResolver {
    /// Create a resolver keeping outcomes for `ttl`.
    #[must_use]
    pub fn new(executor: Arc<RequestExecutor>, ttl: Duration) -> Self {
        Self {
            executor,
            ttl,
            confidentiality: Confidentiality::High,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Set how much of unwrapped values may be logged.
    #[must_use]
    pub const fn with_confidentiality(mut self, level: Confidentiality) -> Self {
        self.confidentiality = level;
        self
    }

    /// Retention window of cached outcomes.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Unwrap `wrapping_token`, decode the payload as `S` and pull one value
    /// out of it with `extract`.
    ///
    /// The payload is the `auth` section when present, `data` otherwise.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Wrapping`] when Vault rejects the token (400)
    /// - [`VaultError::Decode`] when the payload does not match `S` or
    ///   `extract` finds nothing
    /// - any other error of the unwrap call, status preserved
    #[instrument(level = "debug", skip_all)]
    pub async fn unwrap<S>(
        &self,
        wrapping_token: &SecretString,
        extract: fn(S) -> Option<String>,
    ) -> VaultResult<SecretString>
    where
        S: DeserializeOwned + Send + 'static,
    {
        let computation = {
            let mut entries = self.entries.lock().await;
            let now = Instant::now();
            entries.retain(|_, entry| entry.expires_at > now);

            let key = wrapping_token.expose_secret();
            if let Some(entry) = entries.get(key) {
                debug!("Joining existing unwrap");
                entry.computation.clone()
            } else {
                let computation = fetch(
                    Arc::clone(&self.executor),
                    wrapping_token.clone(),
                    extract,
                    self.confidentiality,
                )
                .boxed()
                .shared();
                entries.insert(
                    key.to_string(),
                    CacheEntry {
                        computation: computation.clone(),
                        expires_at: now + self.ttl,
                    },
                );
                computation
            }
        };

        computation.await
    }

    /// Number of live cache entries.
    pub async fn cached(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }
}

async fn fetch<S>(
    executor: Arc<RequestExecutor>,
    wrapping_token: SecretString,
    extract: fn(S) -> Option<String>,
    confidentiality: Confidentiality,
) -> VaultResult<SecretString>
where
    S: DeserializeOwned,
{
    let request = VaultRequest::<LeasedResponse<Value, Value>>::leased(Method::Post, UNWRAP_PATH)
        .with_operation("sys.wrapping.unwrap")
        .with_token(wrapping_token.clone());

    let response = executor.execute(&request).await.map_err(|e| {
        if e.status() == Some(400) {
            VaultError::Wrapping {
                message: INVALID_WRAPPING_TOKEN.to_string(),
                errors: e.errors(),
            }
        } else {
            e
        }
    })?;

    let status = response.status;
    let body = response.body.clone();
    let envelope = response.into_result();
    let payload = envelope
        .auth
        .or(envelope.data)
        .ok_or_else(|| codec::missing_field(status, "data"))?;
    let shape: S =
        serde_json::from_value(payload).map_err(|e| VaultError::decode(status, &body, e))?;
    let value = extract(shape).ok_or_else(|| codec::missing_field(status, "unwrapped value"))?;

    debug!(
        wrapping_token = %confidentiality.mask(wrapping_token.expose_secret()),
        value = %confidentiality.mask(&value),
        "Unwrapped value"
    );
    Ok(SecretString::from(value))
}
