//! Request executor: runs one [`VaultRequest`] to completion.
//!
//! One call to [`RequestExecutor::execute`] is exactly one transport
//! exchange. There is no retry here; see `vault_common::RetryPolicy` for the
//! opt-in variant.

use crate::{
    codec,
    error::{ConnectionErrorKind, VaultError, VaultResult},
    request::{VaultRequest, VaultResponse},
    transport::{HttpRequest, Transport, TransportError},
};
use secrecy::ExposeSecret;
use std::{sync::Arc, time::Duration};
use tracing::{Span, debug, instrument};
use url::Url;

/// Header carrying the client token.
pub const TOKEN_HEADER: &str = "X-Vault-Token";
/// Header selecting the namespace.
pub const NAMESPACE_HEADER: &str = "X-Vault-Namespace";
/// Header requesting response wrapping.
pub const WRAP_TTL_HEADER: &str = "X-Vault-Wrap-TTL";
/// Header marking API requests (CSRF guard on the server).
pub const REQUEST_HEADER: &str = "X-Vault-Request";

/// Executes request descriptors against one Vault server.
pub struct RequestExecutor {
    base_url: Url,
    transport: Arc<dyn Transport>,
    namespace: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("base_url", &self.base_url.as_str())
            .field("namespace", &self.namespace)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    /// Create an executor for `base_url`.
    #[must_use]
    pub fn new(mut base_url: Url, transport: Arc<dyn Transport>) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            transport,
            namespace: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Namespace used when a request does not name one.
    #[must_use]
    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }

    /// Timeout used when a request does not set one.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Absolute URL of an API path.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidConfig`] when the path cannot be joined.
    pub fn url_for(&self, path: &str, query: &[(String, String)]) -> VaultResult<Url> {
        let mut url = self
            .base_url
            .join(&format!("v1/{}", path.trim_start_matches('/')))
            .map_err(|e| VaultError::invalid_config(format!("invalid request path {path:?}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    fn build(&self, request: &VaultRequest<impl Sized>) -> VaultResult<HttpRequest> {
        let url = self.url_for(request.path(), request.query())?;

        let mut headers = request.headers().to_vec();
        headers.push((REQUEST_HEADER.to_string(), "true".to_string()));
        if let Some(namespace) = request.namespace().or(self.namespace.as_deref()) {
            headers.push((NAMESPACE_HEADER.to_string(), namespace.to_string()));
        }
        if let Some(ttl) = request.wrap_ttl() {
            headers.push((WRAP_TTL_HEADER.to_string(), codec::format_duration(ttl)));
        }
        if let Some(token) = request.token() {
            headers.push((TOKEN_HEADER.to_string(), token.expose_secret().to_string()));
        }
        if request.body().is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        Ok(HttpRequest {
            method: request.method(),
            url: url.into(),
            headers,
            body: request.body().map(<[u8]>::to_vec),
            timeout: request.timeout().unwrap_or(self.timeout),
        })
    }

    /// Execute one request.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Connection`] when the transport could not complete
    /// - [`VaultError::NotFound`] / [`VaultError::Service`] for unexpected statuses
    /// - [`VaultError::Decode`] when the body does not match the expected shape
    #[instrument(
        level = "debug",
        skip_all,
        fields(operation = %request.operation(), method = %request.method(), path = %request.path(), status)
    )]
    pub async fn execute<T>(&self, request: &VaultRequest<T>) -> VaultResult<VaultResponse<T>> {
        let http_request = self.build(request)?;
        let timeout = http_request.timeout;

        let response = match tokio::time::timeout(timeout, self.transport.send(http_request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(classify_transport(err)),
            Err(_) => return Err(classify_transport(TransportError::TimedOut(timeout))),
        };
        Span::current().record("status", response.status);

        let passthrough = request.is_passthrough(&response);
        if !request.expects(response.status) && !passthrough {
            let mut errors = codec::parse_errors(&response.body);
            if errors.is_empty() {
                errors.push(canonical_reason(response.status));
            }
            debug!(status = response.status, "Vault returned an unexpected status");
            return Err(VaultError::from_status(response.status, request.path(), errors));
        }

        let result = request.decode(&response)?;
        debug!(status = response.status, passthrough, "Vault call complete");
        Ok(VaultResponse::new(response, result, passthrough))
    }
}

fn classify_transport(err: TransportError) -> VaultError {
    match err {
        TransportError::ConnectionClosed(message) => VaultError::Connection {
            kind: ConnectionErrorKind::Closed,
            message,
        },
        TransportError::Unreachable(message) => VaultError::Connection {
            kind: ConnectionErrorKind::Refused,
            message,
        },
        TransportError::TimedOut(after) => VaultError::Connection {
            kind: ConnectionErrorKind::TimedOut,
            message: format!("no response within {after:?}"),
        },
        other @ TransportError::Other(_) => VaultError::Transport(other),
    }
}

fn canonical_reason(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map_or_else(|| format!("HTTP {status}"), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codec::LeasedResponse,
        request::ResultKind,
        transport::{HttpResponse, Method},
    };
    use async_trait::async_trait;
    use secrecy::SecretString;
    use serde_json::json;
    use std::{
        collections::HashMap,
        sync::Mutex,
    };

    /// Transport answering every call with one canned outcome.
    struct Canned {
        outcome: Result<HttpResponse, TransportError>,
        delay: Duration,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Canned {
        fn ok(status: u16, body: serde_json::Value) -> Arc<Self> {
            Arc::new(Self {
                outcome: Ok(HttpResponse {
                    status,
                    headers: vec![("content-type".into(), "application/json".into())],
                    body: if body.is_null() { vec![] } else { body.to_string().into_bytes() },
                }),
                delay: Duration::ZERO,
                seen: Mutex::new(vec![]),
            })
        }

        fn failing(err: TransportError) -> Arc<Self> {
            Arc::new(Self {
                outcome: Err(err),
                delay: Duration::ZERO,
                seen: Mutex::new(vec![]),
            })
        }

        fn last(&self) -> HttpRequest {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl Transport for Canned {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            tokio::time::sleep(self.delay).await;
            self.outcome.clone()
        }
    }

    fn executor(transport: Arc<Canned>) -> RequestExecutor {
        RequestExecutor::new(Url::parse("http://vault:8200").unwrap(), transport)
    }

    #[test]
    fn test_url_for() {
        let exec = executor(Canned::ok(200, json!({})));
        let url = exec.url_for("/secret/foo", &[]).unwrap();
        assert_eq!(url.as_str(), "http://vault:8200/v1/secret/foo");

        let url = exec
            .url_for("secret/data/foo", &[("version".into(), "2".into())])
            .unwrap();
        assert_eq!(url.as_str(), "http://vault:8200/v1/secret/data/foo?version=2");
    }

    #[test]
    fn test_url_keeps_base_path_prefix() {
        let exec = RequestExecutor::new(
            Url::parse("https://proxy.example.com/vault").unwrap(),
            Canned::ok(200, json!({})),
        );
        let url = exec.url_for("sys/health", &[]).unwrap();
        assert_eq!(url.as_str(), "https://proxy.example.com/vault/v1/sys/health");
    }

    #[tokio::test]
    async fn test_headers_are_merged() {
        let transport = Canned::ok(200, json!({"data": {}}));
        let exec = executor(transport.clone()).with_namespace(Some("root-ns".into()));

        let request = VaultRequest::<LeasedResponse<serde_json::Value>>::leased(Method::Post, "sys/wrapping/wrap")
            .with_body(&json!({"a": 1}))
            .unwrap()
            .with_wrap_ttl(Duration::from_secs(120))
            .with_token(SecretString::from("s.token".to_string()));
        exec.execute(&request).await.unwrap();

        let sent = transport.last();
        assert_eq!(sent.header(TOKEN_HEADER), Some("s.token"));
        assert_eq!(sent.header(NAMESPACE_HEADER), Some("root-ns"));
        assert_eq!(sent.header(WRAP_TTL_HEADER), Some("2m"));
        assert_eq!(sent.header(REQUEST_HEADER), Some("true"));
        assert_eq!(sent.header("content-type"), Some("application/json"));
        assert_eq!(sent.body.as_deref(), Some(br#"{"a":1}"#.as_slice()));
    }

    #[tokio::test]
    async fn test_request_namespace_overrides_default() {
        let transport = Canned::ok(204, serde_json::Value::Null);
        let exec = executor(transport.clone()).with_namespace(Some("root-ns".into()));

        let request = VaultRequest::empty(Method::Delete, "kv/a").with_namespace("child");
        exec.execute(&request).await.unwrap();

        assert_eq!(transport.last().header(NAMESPACE_HEADER), Some("child"));
        assert_eq!(transport.last().header(TOKEN_HEADER), None);
    }

    #[tokio::test]
    async fn test_unexpected_status_uses_error_envelope() {
        let exec = executor(Canned::ok(403, json!({"errors": ["permission denied"]})));
        let request = VaultRequest::<serde_json::Value>::json(Method::Get, "secret/foo");

        let err = exec.execute(&request).await.unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.errors(), vec!["permission denied".to_string()]);
    }

    #[tokio::test]
    async fn test_no_content_on_decoding_request_is_unexpected() {
        let exec = executor(Canned::ok(204, serde_json::Value::Null));
        let request = VaultRequest::<serde_json::Value>::json(Method::Get, "secret/foo");

        let err = exec.execute(&request).await.unwrap_err();
        assert!(matches!(err, VaultError::Service { status: 204, .. }));
    }

    #[tokio::test]
    async fn test_not_found_without_body_uses_reason_phrase() {
        let exec = executor(Canned::ok(404, serde_json::Value::Null));
        let request = VaultRequest::<serde_json::Value>::json(Method::Get, "secret/missing");

        let err = exec.execute(&request).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(&err, VaultError::NotFound { errors, .. } if errors == &["Not Found".to_string()]));
    }

    #[tokio::test]
    async fn test_expected_status_decodes() {
        let exec = executor(Canned::ok(200, json!({"data": {"bar": "baz"}})));
        let request =
            VaultRequest::<LeasedResponse<HashMap<String, String>>>::leased(Method::Get, "secret/foo");

        let response = exec.execute(&request).await.unwrap();
        assert_eq!(response.status, 200);
        assert!(!response.is_raw_passthrough());
        assert_eq!(response.into_data().unwrap()["bar"], "baz");
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let transport = Arc::new(Canned {
            outcome: Ok(HttpResponse {
                status: 200,
                headers: vec![],
                body: b"<html>".to_vec(),
            }),
            delay: Duration::ZERO,
            seen: Mutex::new(vec![]),
        });
        let request = VaultRequest::<serde_json::Value>::json(Method::Get, "secret/foo");

        let err = executor(transport).execute(&request).await.unwrap_err();
        assert!(matches!(err, VaultError::Decode { status: 200, ref body, .. } if body == "<html>"));
    }

    #[tokio::test]
    async fn test_transport_errors_are_classified() {
        let request = VaultRequest::empty(Method::Get, "sys/health");

        let err = executor(Canned::failing(TransportError::ConnectionClosed("eof".into())))
            .execute(&request)
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Connection { kind: ConnectionErrorKind::Closed, .. }));
        assert_eq!(err.status(), None);

        let err = executor(Canned::failing(TransportError::Unreachable("refused".into())))
            .execute(&request)
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Connection { kind: ConnectionErrorKind::Refused, .. }));

        let other = TransportError::Other(Arc::new(std::io::Error::other("tls")));
        let err = executor(Canned::failing(other)).execute(&request).await.unwrap_err();
        assert!(matches!(err, VaultError::Transport(TransportError::Other(_))));
    }

    #[tokio::test]
    async fn test_slow_transport_times_out() {
        let transport = Arc::new(Canned {
            outcome: Ok(HttpResponse::default()),
            delay: Duration::from_secs(5),
            seen: Mutex::new(vec![]),
        });
        let request = VaultRequest::empty(Method::Get, "sys/health").with_timeout(Duration::from_millis(20));

        let err = executor(transport).execute(&request).await.unwrap_err();
        assert!(matches!(err, VaultError::Connection { kind: ConnectionErrorKind::TimedOut, .. }));
    }

    #[tokio::test]
    async fn test_raw_passthrough_ignores_status() {
        let transport = Arc::new(Canned {
            outcome: Ok(HttpResponse {
                status: 503,
                headers: vec![("Content-Type".into(), "application/x-pem-file".into())],
                body: b"-----BEGIN".to_vec(),
            }),
            delay: Duration::ZERO,
            seen: Mutex::new(vec![]),
        });
        let request = VaultRequest::raw(Method::Get, "pki/ca/pem");
        assert_eq!(request.kind(), ResultKind::Raw);

        let response = executor(transport).execute(&request).await.unwrap();
        assert!(response.is_raw_passthrough());
        assert_eq!(response.result, b"-----BEGIN".to_vec());
    }
}
