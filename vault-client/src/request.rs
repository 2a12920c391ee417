//! Request descriptors and responses.
//!
//! A [`VaultRequest`] describes one call completely. The way its body is
//! turned into a typed result is fixed when it is constructed: each
//! constructor binds a [`ResultKind`] and the matching decoder, so the
//! executor never needs to know which engine it is talking to.

use crate::{
    codec::{self, LeasedResponse},
    error::VaultResult,
    transport::{HttpResponse, Method},
};
use secrecy::SecretString;
use serde::{Serialize, de::DeserializeOwned};
use std::{fmt, time::Duration};
use zeroize::Zeroizing;

/// How a response body becomes a typed result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    /// Standard envelope with `data` / `auth` / `wrap_info`
    Leased,
    /// Body decoded directly into the target type
    Json,
    /// Body returned as opaque bytes
    Raw,
    /// Body ignored; only the status matters
    Empty,
}

type Decoder<T> = fn(&HttpResponse) -> VaultResult<T>;

impl ResultKind {
    /// Statuses accepted unless the request overrides them. Kinds that decode
    /// a body do not accept 204, which carries none.
    #[must_use]
    pub const fn default_expected(self) -> &'static [u16] {
        match self {
            Self::Leased | Self::Json => &[200],
            Self::Raw | Self::Empty => &[200, 204],
        }
    }
}

/// Immutable description of one Vault API call.
pub struct VaultRequest<T> {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    operation: String,
    headers: Vec<(String, String)>,
    body: Option<Zeroizing<Vec<u8>>>,
    namespace: Option<String>,
    wrap_ttl: Option<Duration>,
    token: Option<SecretString>,
    timeout: Option<Duration>,
    expected: Vec<u16>,
    authenticated: bool,
    kind: ResultKind,
    decode: Decoder<T>,
}

// derive(Clone) would demand T: Clone
impl<T> Clone for VaultRequest<T> {
    fn clone(&self) -> Self {
        Self {
            method: self.method,
            path: self.path.clone(),
            query: self.query.clone(),
            operation: self.operation.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            namespace: self.namespace.clone(),
            wrap_ttl: self.wrap_ttl,
            token: self.token.clone(),
            timeout: self.timeout,
            expected: self.expected.clone(),
            authenticated: self.authenticated,
            kind: self.kind,
            decode: self.decode,
        }
    }
}

fn no_body(_: &HttpResponse) -> VaultResult<()> {
    Ok(())
}

fn raw_body(response: &HttpResponse) -> VaultResult<Vec<u8>> {
    Ok(response.body.clone())
}

impl VaultRequest<()> {
    /// Request whose body is ignored.
    #[must_use]
    pub fn empty(method: Method, path: impl Into<String>) -> Self {
        Self::with_decoder(method, path, ResultKind::Empty, no_body)
    }
}

impl VaultRequest<Vec<u8>> {
    /// Request whose body is passed through as bytes.
    #[must_use]
    pub fn raw(method: Method, path: impl Into<String>) -> Self {
        Self::with_decoder(method, path, ResultKind::Raw, raw_body)
    }
}

impl<T: DeserializeOwned> VaultRequest<T> {
    /// Request whose body decodes directly into `T`.
    #[must_use]
    pub fn json(method: Method, path: impl Into<String>) -> Self {
        Self::with_decoder(method, path, ResultKind::Json, codec::decode_json::<T>)
    }
}

impl<D: DeserializeOwned, A: DeserializeOwned> VaultRequest<LeasedResponse<D, A>> {
    /// Request whose body is a leased envelope.
    #[must_use]
    pub fn leased(method: Method, path: impl Into<String>) -> Self {
        Self::with_decoder(method, path, ResultKind::Leased, codec::decode_leased::<D, A>)
    }
}

impl<T> VaultRequest<T> {
    fn with_decoder(
        method: Method,
        path: impl Into<String>,
        kind: ResultKind,
        decode: Decoder<T>,
    ) -> Self {
        let path = path.into().trim_start_matches('/').to_string();
        Self {
            operation: format!("{method} {path}"),
            method,
            path,
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            namespace: None,
            wrap_ttl: None,
            token: None,
            timeout: None,
            expected: kind.default_expected().to_vec(),
            authenticated: true,
            kind,
            decode,
        }
    }

    /// Name the operation for tracing.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = operation.into();
        self
    }

    /// Serialize `body` as the JSON request body.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Encode`](crate::VaultError::Encode) when `body` cannot be serialized.
    pub fn with_body<B: Serialize + ?Sized>(mut self, body: &B) -> VaultResult<Self> {
        self.body = Some(Zeroizing::new(codec::encode_body(body)?));
        Ok(self)
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Add a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Target a Vault namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Ask Vault to wrap the response for `ttl`.
    #[must_use]
    pub const fn with_wrap_ttl(mut self, ttl: Duration) -> Self {
        self.wrap_ttl = Some(ttl);
        self
    }

    /// Authorize the call with this token instead of the client's provider.
    #[must_use]
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    /// Override the default timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replace the set of expected status codes.
    #[must_use]
    pub fn expect_status(mut self, statuses: &[u16]) -> Self {
        self.expected = statuses.to_vec();
        self
    }

    /// Mark the call as not needing a client token (login, health).
    #[must_use]
    pub const fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }

    /// HTTP verb.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Path relative to `/v1/`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters.
    #[must_use]
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Operation name used in traces.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Extra headers.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Serialized body.
    #[must_use]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_ref().map(|b| b.as_slice())
    }

    /// Namespace override.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Wrap TTL, when the response should be wrapped.
    #[must_use]
    pub const fn wrap_ttl(&self) -> Option<Duration> {
        self.wrap_ttl
    }

    /// Explicit token, when set.
    #[must_use]
    pub const fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    /// Timeout override.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether a client token must be resolved before dispatch.
    #[must_use]
    pub const fn requires_token(&self) -> bool {
        self.authenticated && self.token.is_none()
    }

    /// Result extraction strategy.
    #[must_use]
    pub const fn kind(&self) -> ResultKind {
        self.kind
    }

    /// Whether `status` counts as success.
    #[must_use]
    pub fn expects(&self, status: u16) -> bool {
        self.expected.contains(&status)
    }

    /// Whether the response bypasses status classification and decoding:
    /// raw requests answered with a non-JSON body.
    #[must_use]
    pub fn is_passthrough(&self, response: &HttpResponse) -> bool {
        self.kind == ResultKind::Raw && !response.is_json()
    }

    pub(crate) fn decode(&self, response: &HttpResponse) -> VaultResult<T> {
        (self.decode)(response)
    }
}

impl<T> fmt::Debug for VaultRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("operation", &self.operation)
            .field("namespace", &self.namespace)
            .field("wrap_ttl", &self.wrap_ttl)
            .field("kind", &self.kind)
            .field("expected", &self.expected)
            .field("has_body", &self.body.is_some())
            .field("has_token", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

/// Outcome of a successful call.
#[derive(Debug, Clone)]
pub struct VaultResponse<T> {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Vec<(String, String)>,
    /// Raw body bytes
    pub body: Vec<u8>,
    /// Decoded result
    pub result: T,
    passthrough: bool,
}

impl<T> VaultResponse<T> {
    pub(crate) fn new(response: HttpResponse, result: T, passthrough: bool) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            body: response.body,
            result,
            passthrough,
        }
    }

    /// Whether the body was passed through without JSON decoding.
    #[must_use]
    pub const fn is_raw_passthrough(&self) -> bool {
        self.passthrough
    }

    /// Take the decoded result.
    #[must_use]
    pub fn into_result(self) -> T {
        self.result
    }
}

impl<D, A> VaultResponse<LeasedResponse<D, A>> {
    /// Take the `data` section.
    ///
    /// # Errors
    ///
    /// Returns a decode error when the envelope carries no `data`.
    pub fn into_data(self) -> VaultResult<D> {
        let status = self.status;
        self.result
            .data
            .ok_or_else(|| codec::missing_field(status, "data"))
    }

    /// Take the `auth` section.
    ///
    /// # Errors
    ///
    /// Returns a decode error when the envelope carries no `auth`.
    pub fn into_auth(self) -> VaultResult<A> {
        let status = self.status;
        self.result
            .auth
            .ok_or_else(|| codec::missing_field(status, "auth"))
    }

    /// Take the `wrap_info` section.
    ///
    /// # Errors
    ///
    /// Returns a decode error when the response was not wrapped.
    pub fn into_wrap_info(self) -> VaultResult<codec::WrapInfo> {
        let status = self.status;
        self.result
            .wrap_info
            .ok_or_else(|| codec::missing_field(status, "wrap_info"))
    }
}
