//! Vault client configuration.

use crate::{
    error::{VaultError, VaultResult},
    masking::Confidentiality,
};
use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};
use url::Url;

/// Default mount of the Kubernetes service account token.
pub const KUBERNETES_JWT_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// A credential supplied either directly or as a wrapping token protecting it.
#[derive(Debug, Clone)]
pub enum Credential {
    /// The credential itself
    Plain(SecretString),
    /// A wrapping token whose unwrapped payload holds the credential
    Wrapped(SecretString),
}

/// How the client obtains its token.
#[derive(Debug, Clone, Default)]
pub enum AuthConfig {
    /// No authentication; only unauthenticated calls can be made
    #[default]
    None,
    /// Fixed client token
    Token(SecretString),
    /// Wrapping token protecting a client token
    WrappedToken(SecretString),
    /// AppRole login
    AppRole {
        /// Auth mount path
        mount: String,
        /// Role id
        role_id: String,
        /// Secret id
        secret_id: Credential,
    },
    /// Userpass login
    UserPass {
        /// Auth mount path
        mount: String,
        /// User name
        username: String,
        /// Password
        password: Credential,
    },
    /// Kubernetes service-account login
    Kubernetes {
        /// Auth mount path
        mount: String,
        /// Vault role bound to the service account
        role: String,
        /// Path of the service account JWT
        jwt_path: PathBuf,
    },
}

/// Vault client configuration.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Vault server address
    pub addr: String,
    /// Default namespace sent with every request
    pub namespace: Option<String>,
    /// Authentication method
    pub auth: AuthConfig,
    /// Default request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// PEM bundle of extra CA certificates to trust
    pub ca_cert: Option<PathBuf>,
    /// Skip server certificate verification
    pub skip_verify: bool,
    /// Renew (or log in again) this long before a login token expires
    pub renew_grace_period: Duration,
    /// Retention of unwrap results, keyed by wrapping token
    pub unwrap_cache_ttl: Duration,
    /// How much of unwrapped values may be logged
    pub log_confidentiality: Confidentiality,
}

/// Address used when none is configured.
pub const DEFAULT_ADDR: &str = "http://127.0.0.1:8200";

impl Default for VaultConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ADDR, AuthConfig::None)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl VaultConfig {
    /// Create a new configuration for `addr` with the given authentication.
    ///
    /// Nothing is read from the environment; see [`VaultConfig::from_env`].
    #[must_use]
    pub fn new(addr: impl Into<String>, auth: AuthConfig) -> Self {
        Self {
            addr: addr.into(),
            namespace: None,
            auth,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            ca_cert: None,
            skip_verify: false,
            renew_grace_period: Duration::from_secs(60),
            unwrap_cache_ttl: Duration::from_secs(3600),
            log_confidentiality: Confidentiality::High,
        }
    }

    /// Configuration from the standard Vault variables: `VAULT_ADDR`,
    /// `VAULT_TOKEN`, `VAULT_NAMESPACE`, `VAULT_CACERT` and `VAULT_SKIP_VERIFY`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(env_var)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let auth = lookup("VAULT_TOKEN")
            .map_or(AuthConfig::None, |t| AuthConfig::Token(SecretString::from(t)));
        let addr = lookup("VAULT_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let mut config = Self::new(addr, auth);
        config.namespace = lookup("VAULT_NAMESPACE");
        config.ca_cert = lookup("VAULT_CACERT").map(PathBuf::from);
        config.skip_verify = lookup("VAULT_SKIP_VERIFY")
            .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "t" | "true"));
        config
    }

    /// Set the default namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Trust the CA certificates in the PEM file at `path`.
    #[must_use]
    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert = Some(path.into());
        self
    }

    /// Skip server certificate verification.
    #[must_use]
    pub const fn with_skip_verify(mut self, skip: bool) -> Self {
        self.skip_verify = skip;
        self
    }

    /// Set the renewal grace period.
    #[must_use]
    pub const fn with_renew_grace_period(mut self, grace_period: Duration) -> Self {
        self.renew_grace_period = grace_period;
        self
    }

    /// Set the unwrap cache retention.
    #[must_use]
    pub const fn with_unwrap_cache_ttl(mut self, ttl: Duration) -> Self {
        self.unwrap_cache_ttl = ttl;
        self
    }

    /// Set the log confidentiality tolerance.
    #[must_use]
    pub const fn with_log_confidentiality(mut self, level: Confidentiality) -> Self {
        self.log_confidentiality = level;
        self
    }

    /// Parsed server address.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidConfig`] for malformed or non-HTTP addresses.
    pub fn base_url(&self) -> VaultResult<Url> {
        let url = Url::parse(self.addr.trim())
            .map_err(|e| VaultError::invalid_config(format!("invalid Vault address {:?}: {e}", self.addr)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(VaultError::invalid_config(format!(
                "unsupported scheme {other:?} in Vault address"
            ))),
        }
    }

    /// Check the configuration for obvious mistakes.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> VaultResult<()> {
        self.base_url()?;
        if self.timeout.is_zero() {
            return Err(VaultError::invalid_config("timeout must be greater than zero"));
        }
        match &self.auth {
            AuthConfig::AppRole { mount, role_id, .. } if mount.is_empty() || role_id.is_empty() => {
                Err(VaultError::invalid_config("approle requires a mount and a role id"))
            }
            AuthConfig::UserPass { mount, username, .. } if mount.is_empty() || username.is_empty() => {
                Err(VaultError::invalid_config("userpass requires a mount and a username"))
            }
            AuthConfig::Kubernetes { mount, role, .. } if mount.is_empty() || role.is_empty() => {
                Err(VaultError::invalid_config("kubernetes requires a mount and a role"))
            }
            _ => Ok(()),
        }
    }
}
