//! Authentication token providers.
//!
//! A [`TokenProvider`] hands the client a token for each authenticated call.
//! Providers that need Vault (login, unwrap) hold the [`RequestExecutor`]
//! themselves; the executor never knows about providers.

use crate::{
    api::auth as endpoints,
    config::{AuthConfig, Credential},
    error::{VaultError, VaultResult},
    executor::RequestExecutor,
    wrapping::{self, WrappingResolver},
};
use async_trait::async_trait;
use futures::future::BoxFuture;
use secrecy::SecretString;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, info, instrument, warn};
use zeroize::Zeroizing;

/// The call a token is being requested for.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    /// Operation name of the call
    pub operation: &'a str,
    /// API path of the call
    pub path: &'a str,
}

/// Supplies client tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Token to authorize the call described by `ctx`.
    async fn token(&self, ctx: &RequestContext<'_>) -> VaultResult<SecretString>;
}

/// Always returns the same token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: SecretString,
}

impl StaticTokenProvider {
    /// Create a provider for `token`.
    #[must_use]
    pub const fn new(token: SecretString) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self, _ctx: &RequestContext<'_>) -> VaultResult<SecretString> {
        Ok(self.token.clone())
    }
}

/// Resolves the client token protected by one wrapping token.
#[derive(Debug)]
pub struct UnwrappingTokenProvider {
    resolver: Arc<WrappingResolver>,
    wrapping_token: SecretString,
}

impl UnwrappingTokenProvider {
    /// Create a provider unwrapping `wrapping_token` through `resolver`.
    #[must_use]
    pub const fn new(resolver: Arc<WrappingResolver>, wrapping_token: SecretString) -> Self {
        Self {
            resolver,
            wrapping_token,
        }
    }
}

#[async_trait]
impl TokenProvider for UnwrappingTokenProvider {
    async fn token(&self, _ctx: &RequestContext<'_>) -> VaultResult<SecretString> {
        self.resolver
            .unwrap(&self.wrapping_token, wrapping::client_token)
            .await
    }
}

type TokenFn =
    dyn Fn(&RequestContext<'_>) -> BoxFuture<'static, VaultResult<SecretString>> + Send + Sync;

/// Adapts a closure into a provider.
pub struct FnTokenProvider {
    f: Box<TokenFn>,
}

impl FnTokenProvider {
    /// Wrap `f`.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&RequestContext<'_>) -> BoxFuture<'static, VaultResult<SecretString>>
            + Send
            + Sync
            + 'static,
    {
        Self { f: Box::new(f) }
    }
}

impl std::fmt::Debug for FnTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTokenProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenProvider for FnTokenProvider {
    async fn token(&self, ctx: &RequestContext<'_>) -> VaultResult<SecretString> {
        (self.f)(ctx).await
    }
}

/// Credentials a login-based provider authenticates with.
#[derive(Debug, Clone)]
pub enum LoginMethod {
    /// AppRole role id + secret id
    AppRole {
        /// Auth mount path
        mount: String,
        /// Role id
        role_id: String,
        /// Secret id, possibly wrapped
        secret_id: Credential,
    },
    /// Username + password
    UserPass {
        /// Auth mount path
        mount: String,
        /// User name
        username: String,
        /// Password, possibly wrapped
        password: Credential,
    },
    /// Kubernetes service account JWT read from a file at each login
    Kubernetes {
        /// Auth mount path
        mount: String,
        /// Vault role
        role: String,
        /// Path of the service account JWT
        jwt_path: PathBuf,
    },
}

impl LoginMethod {
    fn name(&self) -> &'static str {
        match self {
            Self::AppRole { .. } => "approle",
            Self::UserPass { .. } => "userpass",
            Self::Kubernetes { .. } => "kubernetes",
        }
    }
}

#[derive(Clone)]
struct CachedToken {
    token: SecretString,
    // None for tokens without TTL
    expires_at: Option<Instant>,
    refresh_at: Option<Instant>,
    renewable: bool,
}

impl CachedToken {
    /// The grace window is capped at half the TTL, so a token shorter than
    /// the grace period is still reused for the first half of its life.
    fn from_auth(auth: &crate::codec::AuthInfo, grace: Duration) -> VaultResult<Self> {
        if auth.client_token.is_empty() {
            return Err(VaultError::auth_failed("login response carried no client token"));
        }
        let ttl = auth.ttl();
        let now = Instant::now();
        let expires_at = (!ttl.is_zero()).then(|| now + ttl);
        Ok(Self {
            token: SecretString::from(auth.client_token.clone()),
            expires_at,
            refresh_at: expires_at.map(|exp| exp - grace.min(ttl / 2)),
            renewable: auth.renewable,
        })
    }

    fn fresh_at(&self, now: Instant) -> bool {
        self.refresh_at.is_none_or(|at| now < at)
    }

    fn outlives(&self, other: &Self) -> bool {
        match (self.expires_at, other.expires_at) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(mine), Some(theirs)) => mine > theirs,
        }
    }

    fn alive_at(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|exp| exp > now)
    }
}

/// Logs in with role credentials and keeps the resulting token fresh.
///
/// The token is reused until it enters the grace window before expiry. It is
/// then renewed when renewable, or replaced by a new login when it is not or
/// when renewal no longer pushes its expiry out. The state lock is
/// held across the login so concurrent callers wait for one login instead of
/// issuing their own.
pub struct LoginTokenProvider {
    executor: Arc<RequestExecutor>,
    resolver: Arc<WrappingResolver>,
    method: LoginMethod,
    grace_period: Duration,
    state: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for LoginTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginTokenProvider")
            .field("method", &self.method.name())
            .field("grace_period", &self.grace_period)
            .finish_non_exhaustive()
    }
}

impl LoginTokenProvider {
    /// Create a provider logging in with `method`.
    #[must_use]
    pub fn new(
        executor: Arc<RequestExecutor>,
        resolver: Arc<WrappingResolver>,
        method: LoginMethod,
        grace_period: Duration,
    ) -> Self {
        Self {
            executor,
            resolver,
            method,
            grace_period,
            state: Mutex::new(None),
        }
    }

    async fn credential(&self, credential: &Credential, kind: &str) -> VaultResult<SecretString> {
        match (credential, kind) {
            (Credential::Plain(value), _) => Ok(value.clone()),
            (Credential::Wrapped(wrapping_token), "secret_id") => {
                self.resolver.unwrap(wrapping_token, wrapping::secret_id).await
            }
            (Credential::Wrapped(wrapping_token), _) => {
                self.resolver.unwrap(wrapping_token, wrapping::password).await
            }
        }
    }

    #[instrument(skip(self), fields(method = self.method.name()))]
    async fn login(&self) -> VaultResult<CachedToken> {
        let request = match &self.method {
            LoginMethod::AppRole {
                mount,
                role_id,
                secret_id,
            } => {
                let secret_id = self.credential(secret_id, "secret_id").await?;
                endpoints::approle_login(mount, role_id, &secret_id)?
            }
            LoginMethod::UserPass {
                mount,
                username,
                password,
            } => {
                let password = self.credential(password, "password").await?;
                endpoints::userpass_login(mount, username, &password)?
            }
            LoginMethod::Kubernetes {
                mount,
                role,
                jwt_path,
            } => {
                let jwt = tokio::fs::read_to_string(jwt_path)
                    .await
                    .map(Zeroizing::new)
                    .map_err(|e| {
                        VaultError::auth_failed(format!(
                            "cannot read service account token {}: {e}",
                            jwt_path.display()
                        ))
                    })?;
                endpoints::kubernetes_login(mount, role, &SecretString::from(jwt.trim().to_string()))?
            }
        };

        let auth = self.executor.execute(&request).await?.into_auth()?;
        let cached = CachedToken::from_auth(&auth, self.grace_period)?;
        info!(ttl_secs = auth.lease_duration, renewable = auth.renewable, "Logged in to Vault");
        Ok(cached)
    }

    async fn renew(&self, current: &CachedToken) -> VaultResult<CachedToken> {
        let request = endpoints::token_renew_self(None)?.with_token(current.token.clone());
        let auth = self.executor.execute(&request).await?.into_auth()?;
        // renew-self answers with the same token
        let mut renewed = CachedToken::from_auth(&auth, self.grace_period)?;
        renewed.token = current.token.clone();
        debug!(ttl_secs = auth.lease_duration, "Renewed Vault token");
        Ok(renewed)
    }
}

#[async_trait]
impl TokenProvider for LoginTokenProvider {
    async fn token(&self, _ctx: &RequestContext<'_>) -> VaultResult<SecretString> {
        let mut state = self.state.lock().await;
        let now = Instant::now();

        if let Some(cached) = state.as_ref() {
            if cached.fresh_at(now) {
                return Ok(cached.token.clone());
            }
            if cached.renewable && cached.alive_at(now) {
                match self.renew(cached).await {
                    Ok(renewed) if renewed.outlives(cached) => {
                        let token = renewed.token.clone();
                        *state = Some(renewed);
                        return Ok(token);
                    }
                    // the token reached its max TTL
                    Ok(_) => debug!("Renewal did not extend the token, logging in again"),
                    Err(e) => warn!(error = %e, "Token renewal failed, logging in again"),
                }
            }
        }

        let fresh = self.login().await?;
        let token = fresh.token.clone();
        *state = Some(fresh);
        Ok(token)
    }
}

/// Build the provider described by `auth`, `None` for [`AuthConfig::None`].
#[must_use]
pub fn provider_for(
    auth: &AuthConfig,
    executor: &Arc<RequestExecutor>,
    resolver: &Arc<WrappingResolver>,
    grace_period: Duration,
) -> Option<Arc<dyn TokenProvider>> {
    let login = |method| -> Arc<dyn TokenProvider> {
        Arc::new(LoginTokenProvider::new(
            Arc::clone(executor),
            Arc::clone(resolver),
            method,
            grace_period,
        ))
    };

    match auth {
        AuthConfig::None => None,
        AuthConfig::Token(token) => Some(Arc::new(StaticTokenProvider::new(token.clone()))),
        AuthConfig::WrappedToken(wrapping_token) => Some(Arc::new(UnwrappingTokenProvider::new(
            Arc::clone(resolver),
            wrapping_token.clone(),
        ))),
        AuthConfig::AppRole {
            mount,
            role_id,
            secret_id,
        } => Some(login(LoginMethod::AppRole {
            mount: mount.clone(),
            role_id: role_id.clone(),
            secret_id: secret_id.clone(),
        })),
        AuthConfig::UserPass {
            mount,
            username,
            password,
        } => Some(login(LoginMethod::UserPass {
            mount: mount.clone(),
            username: username.clone(),
            password: password.clone(),
        })),
        AuthConfig::Kubernetes {
            mount,
            role,
            jwt_path,
        } => Some(login(LoginMethod::Kubernetes {
            mount: mount.clone(),
            role: role.clone(),
            jwt_path: jwt_path.clone(),
        })),
    }
}
