//! HTTP client building for Vault.
//!
//! Vault answers from a standby node with a redirect to the active node, so
//! redirects are followed, but only within the origin of the first request:
//! the token travels in `X-Vault-Token`, which reqwest does not strip on a
//! cross-host hop.

use reqwest::{Certificate, Client, ClientBuilder, Url, redirect};
use std::time::Duration;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("vault-client-rust/", env!("CARGO_PKG_VERSION"));

const MAX_REDIRECTS: usize = 10;

/// Connection settings for a Vault server.
#[derive(Clone, Default)]
pub struct HttpConfig {
    /// Overall request timeout
    pub timeout: Option<Duration>,
    /// Connect timeout
    pub connect_timeout: Option<Duration>,
    /// Extra trust roots, a PEM bundle (`VAULT_CACERT`)
    pub ca_bundle: Option<Vec<u8>>,
    /// Accept any server certificate (`VAULT_SKIP_VERIFY`)
    pub skip_verify: bool,
}

impl std::fmt::Debug for HttpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConfig")
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("ca_bundle", &self.ca_bundle.as_ref().map(Vec::len))
            .field("skip_verify", &self.skip_verify)
            .finish()
    }
}

impl HttpConfig {
    /// Set the overall request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Trust the certificates of a PEM bundle in addition to the web roots.
    #[must_use]
    pub fn with_ca_bundle(mut self, pem: Vec<u8>) -> Self {
        self.ca_bundle = Some(pem);
        self
    }

    /// Disable server certificate verification.
    #[must_use]
    pub const fn with_skip_verify(mut self, skip: bool) -> Self {
        self.skip_verify = skip;
        self
    }
}

fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

fn redirect_policy() -> redirect::Policy {
    redirect::Policy::custom(|attempt| {
        let hops = attempt.previous().len();
        let same = attempt
            .previous()
            .first()
            .is_none_or(|origin| same_origin(origin, attempt.url()));
        if hops > MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if same {
            attempt.follow()
        } else {
            attempt.stop()
        }
    })
}

/// Build the rustls-backed client used to talk to Vault.
///
/// # Errors
///
/// Returns an error if the CA bundle cannot be parsed or the TLS backend
/// fails to initialise.
///
/// # Examples
///
/// ```
/// use vault_common::{HttpConfig, build_http_client};
/// use std::time::Duration;
///
/// let config = HttpConfig::default().with_timeout(Duration::from_secs(60));
/// let client = build_http_client(&config).expect("Failed to build client");
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let mut builder = ClientBuilder::new()
        .use_rustls_tls()
        .user_agent(USER_AGENT)
        .redirect(redirect_policy())
        .danger_accept_invalid_certs(config.skip_verify);
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(timeout) = config.connect_timeout {
        builder = builder.connect_timeout(timeout);
    }
    if let Some(pem) = &config.ca_bundle {
        for certificate in Certificate::from_pem_bundle(pem)? {
            builder = builder.add_root_certificate(certificate);
        }
    }
    builder.build()
}
