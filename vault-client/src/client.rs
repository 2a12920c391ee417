//! Vault client facade.

use crate::{
    api::{AppRole, Kubernetes, KvV1, KvV2, Pki, Sys, Token, Transit, UserPass},
    auth::{self, RequestContext, TokenProvider},
    config::VaultConfig,
    error::{VaultError, VaultResult},
    executor::RequestExecutor,
    request::{VaultRequest, VaultResponse},
    transport::{ReqwestTransport, Transport, TransportError},
    wrapping::WrappingResolver,
};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info};
use vault_common::{HttpConfig, RetryPolicy, build_http_client};

/// Entry point: resolves tokens, executes requests and hands out typed
/// engine accessors.
#[derive(Clone)]
pub struct VaultClient {
    executor: Arc<RequestExecutor>,
    resolver: Arc<WrappingResolver>,
    provider: Option<Arc<dyn TokenProvider>>,
}

impl std::fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultClient")
            .field("executor", &self.executor)
            .field("authenticated", &self.provider.is_some())
            .finish_non_exhaustive()
    }
}

impl VaultClient {
    /// Create a client talking HTTP through reqwest.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidConfig`] for a bad configuration or an unreadable
    /// CA file; a transport error when the HTTP client cannot be built.
    pub fn new(config: VaultConfig) -> VaultResult<Self> {
        let mut http_config = HttpConfig::default()
            .with_timeout(config.timeout)
            .with_connect_timeout(config.connect_timeout)
            .with_skip_verify(config.skip_verify);
        if let Some(path) = &config.ca_cert {
            let pem = std::fs::read(path).map_err(|e| {
                let path = path.display();
                VaultError::invalid_config(format!("cannot read CA certificate {path}: {e}"))
            })?;
            http_config = http_config.with_ca_bundle(pem);
        }
        let http = build_http_client(&http_config)
            .map_err(|e| VaultError::Transport(TransportError::Other(Arc::new(e))))?;
        Self::with_transport(config, Arc::new(ReqwestTransport::new(http)))
    }

    /// Create a client on top of any [`Transport`].
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidConfig`] for a bad configuration.
    pub fn with_transport(config: VaultConfig, transport: Arc<dyn Transport>) -> VaultResult<Self> {
        config.validate()?;
        let executor = Arc::new(
            RequestExecutor::new(config.base_url()?, transport)
                .with_namespace(config.namespace.clone())
                .with_timeout(config.timeout),
        );
        let resolver = Arc::new(
            WrappingResolver::new(Arc::clone(&executor), config.unwrap_cache_ttl)
                .with_confidentiality(config.log_confidentiality),
        );
        let provider = auth::provider_for(&config.auth, &executor, &resolver, config.renew_grace_period);

        info!(
            addr = %config.addr,
            namespace = config.namespace.as_deref().unwrap_or(""),
            authenticated = provider.is_some(),
            "Vault client created"
        );
        Ok(Self {
            executor,
            resolver,
            provider,
        })
    }

    /// Replace the token provider.
    #[must_use]
    pub fn with_token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// The underlying executor.
    #[must_use]
    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    /// The shared unwrap resolver.
    #[must_use]
    pub fn resolver(&self) -> &Arc<WrappingResolver> {
        &self.resolver
    }

    /// Execute `request`, attaching a token from the provider when the
    /// request needs one and carries none.
    ///
    /// # Errors
    ///
    /// [`VaultError::Authentication`] when a token is needed and no provider
    /// is configured; otherwise any error of the provider or the call.
    pub async fn execute<T>(&self, request: VaultRequest<T>) -> VaultResult<VaultResponse<T>> {
        let request = if request.requires_token() {
            let provider = self.provider.as_ref().ok_or_else(|| {
                VaultError::auth_failed(format!("{} needs a token and no authentication is configured", request.operation()))
            })?;
            let ctx = RequestContext {
                operation: request.operation(),
                path: request.path(),
            };
            let token = provider.token(&ctx).await?;
            request.with_token(token)
        } else {
            request
        };
        self.executor.execute(&request).await
    }

    /// [`execute`](Self::execute) under `policy`, retrying transient failures.
    ///
    /// # Errors
    ///
    /// The first non-retryable error, or the last one once retries run out.
    pub async fn execute_with_retry<T>(
        &self,
        request: &VaultRequest<T>,
        policy: &RetryPolicy,
    ) -> VaultResult<VaultResponse<T>> {
        policy.execute(|| self.execute(request.clone())).await
    }

    /// Unwrap `wrapping_token` through the shared resolver and extract one
    /// value from the payload decoded as `S`.
    ///
    /// # Errors
    ///
    /// See [`WrappingResolver::unwrap`].
    pub async fn unwrap<S>(&self, wrapping_token: &SecretString, extract: fn(S) -> Option<String>) -> VaultResult<SecretString>
    where
        S: DeserializeOwned + Send + 'static,
    {
        debug!("Resolving wrapping token");
        self.resolver.unwrap(wrapping_token, extract).await
    }

    /// KV version 1 engine at `mount`.
    #[must_use]
    pub fn kv1(&self, mount: &str) -> KvV1<'_> {
        KvV1::new(self, mount)
    }

    /// KV version 2 engine at `mount`.
    #[must_use]
    pub fn kv2(&self, mount: &str) -> KvV2<'_> {
        KvV2::new(self, mount)
    }

    /// The system backend.
    #[must_use]
    pub const fn sys(&self) -> Sys<'_> {
        Sys::new(self)
    }

    /// The token auth method.
    #[must_use]
    pub const fn token(&self) -> Token<'_> {
        Token::new(self)
    }

    /// AppRole auth method at `mount`.
    #[must_use]
    pub fn approle(&self, mount: &str) -> AppRole<'_> {
        AppRole::new(self, mount)
    }

    /// Userpass auth method at `mount`.
    #[must_use]
    pub fn userpass(&self, mount: &str) -> UserPass<'_> {
        UserPass::new(self, mount)
    }

    /// Kubernetes auth method at `mount`.
    #[must_use]
    pub fn kubernetes(&self, mount: &str) -> Kubernetes<'_> {
        Kubernetes::new(self, mount)
    }

    /// PKI engine at `mount`.
    #[must_use]
    pub fn pki(&self, mount: &str) -> Pki<'_> {
        Pki::new(self, mount)
    }

    /// Transit engine at `mount`.
    #[must_use]
    pub fn transit(&self, mount: &str) -> Transit<'_> {
        Transit::new(self, mount)
    }
}
