//! Transport adapter contract and the reqwest-backed implementation.
//!
//! A [`Transport`] performs exactly one HTTP exchange. All translation of
//! library-specific failures into [`TransportError`] happens here so the
//! executor only ever sees the normalized shape.

use async_trait::async_trait;
use std::{error::Error as StdError, fmt, io, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::trace;

/// HTTP verbs understood by Vault, including the non-standard `LIST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// PUT
    Put,
    /// POST
    Post,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// HEAD
    Head,
    /// LIST
    List,
}

impl Method {
    /// Wire name of the verb.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::List => "LIST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fully-resolved HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP verb
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// Header name/value pairs
    pub headers: Vec<(String, String)>,
    /// Serialized body
    pub body: Option<Vec<u8>>,
    /// Deadline for the whole exchange
    pub timeout: Duration,
}

impl HttpRequest {
    /// First value of a header, case-insensitive.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// One HTTP response, body fully read.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Header name/value pairs
    pub headers: Vec<(String, String)>,
    /// Raw body bytes
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// First value of a header, case-insensitive.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Whether the body is declared as JSON (or undeclared).
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.header("content-type")
            .is_none_or(|ct| ct.to_ascii_lowercase().contains("json"))
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Normalized transport failure.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// The connection was closed or reset before a response was read
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Connection refused or host unreachable
    #[error("unable to connect: {0}")]
    Unreachable(String),

    /// The exchange did not complete within the timeout
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    /// Anything else the transport reports
    #[error("transport failure: {0}")]
    Other(#[source] Arc<dyn StdError + Send + Sync>),
}

/// Performs one HTTP exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the normalized response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Wrap an already configured client.
    #[must_use]
    pub const fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    fn classify(err: reqwest::Error, timeout: Duration) -> TransportError {
        if err.is_timeout() {
            return TransportError::TimedOut(timeout);
        }
        if err.is_connect() {
            return TransportError::Unreachable(err.to_string());
        }
        if err.is_body() || is_connection_closed(&err) {
            return TransportError::ConnectionClosed(err.to_string());
        }
        TransportError::Other(Arc::new(err))
    }
}

fn is_connection_closed(err: &(dyn StdError + 'static)) -> bool {
    let mut source = Some(err);
    while let Some(e) = source {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            return matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            );
        }
        source = e.source();
    }
    false
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| TransportError::Other(Arc::new(e)))?;
        let timeout = request.timeout;

        let mut builder = self.http.request(method, &request.url).timeout(timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::classify(e, timeout))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::classify(e, timeout))?
            .to_vec();

        trace!(status, bytes = body.len(), "Transport exchange complete");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_names() {
        assert_eq!(Method::List.as_str(), "LIST");
        assert_eq!(Method::Head.to_string(), "HEAD");
        assert!(reqwest::Method::from_bytes(Method::List.as_str().as_bytes()).is_ok());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = HttpResponse {
            status: 200,
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: vec![],
        };
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert!(response.is_json());
    }

    #[test]
    fn test_pem_body_is_not_json() {
        let response = HttpResponse {
            status: 200,
            headers: vec![("content-type".into(), "application/pem-certificate-chain".into())],
            body: b"-----BEGIN CERTIFICATE-----".to_vec(),
        };
        assert!(!response.is_json());
    }

    #[test]
    fn test_closed_connection_detected_in_source_chain() {
        let err = io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer");
        assert!(is_connection_closed(&err));

        let err = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert!(!is_connection_closed(&err));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_classified() {
        let transport = ReqwestTransport::new(reqwest::Client::new());
        let request = HttpRequest {
            method: Method::Get,
            // port 9 (discard) on localhost is closed in test environments
            url: "http://127.0.0.1:9/v1/sys/health".to_string(),
            headers: vec![],
            body: None,
            timeout: Duration::from_secs(5),
        };

        let err = transport.send(request).await.unwrap_err();
        assert!(matches!(err, TransportError::Unreachable(_)), "got {err:?}");
    }
}
