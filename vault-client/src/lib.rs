//! Typed HTTP client for HashiCorp Vault.
//!
//! Calls are described by [`VaultRequest`] values and run by a
//! [`RequestExecutor`] over a pluggable [`Transport`]. [`VaultClient`] adds
//! token resolution through a [`TokenProvider`] and typed accessors for the
//! common engines and auth methods. Wrapping tokens are exchanged through a
//! [`WrappingResolver`] that unwraps each token at most once per process.
//!
//! ```no_run
//! use secrecy::SecretString;
//! use std::collections::HashMap;
//! use vault_client::{AuthConfig, VaultClient, VaultConfig};
//!
//! # async fn run() -> vault_client::VaultResult<()> {
//! let config = VaultConfig::new(
//!     "http://127.0.0.1:8200",
//!     AuthConfig::Token(SecretString::from("s.root".to_string())),
//! );
//! let client = VaultClient::new(config)?;
//! client.kv1("secret").write("foo", &HashMap::from([("bar", "baz")])).await?;
//! let secret: HashMap<String, String> = client.kv1("secret").read("foo").await?;
//! assert_eq!(secret["bar"], "baz");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod auth;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod executor;
pub mod masking;
pub mod request;
pub mod transport;
pub mod wrapping;

pub use auth::{
    FnTokenProvider, LoginMethod, LoginTokenProvider, RequestContext, StaticTokenProvider, TokenProvider,
    UnwrappingTokenProvider,
};
pub use client::VaultClient;
pub use codec::{AuthInfo, LeasedResponse, WrapInfo};
pub use config::{AuthConfig, Credential, VaultConfig};
pub use error::{ConnectionErrorKind, NotFoundExt, VaultError, VaultResult};
pub use executor::RequestExecutor;
pub use masking::Confidentiality;
pub use request::{ResultKind, VaultRequest, VaultResponse};
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport, TransportError};
pub use wrapping::WrappingResolver;
