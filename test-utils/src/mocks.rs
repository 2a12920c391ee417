//! Mock transport for testing.
//!
//! [`MockTransport`] answers requests from a route table keyed by method and
//! API path, counts calls per route and records every request it sees.

use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::sync::RwLock;
use vault_client::{HttpRequest, HttpResponse, Method, Transport, TransportError};

/// A request seen by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method
    pub method: Method,
    /// API path without the `/v1/` prefix or query
    pub path: String,
    /// Request headers
    pub headers: Vec<(String, String)>,
    /// Request body
    pub body: Option<Vec<u8>>,
}

impl RecordedRequest {
    /// Header value, case-insensitive.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body parsed as JSON.
    #[must_use]
    pub fn json(&self) -> Option<serde_json::Value> {
        self.body.as_deref().and_then(|b| serde_json::from_slice(b).ok())
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Response(HttpResponse),
    Failure(TransportError),
}

/// Scripted in-memory Vault.
///
/// Unknown routes answer 404 with an empty `errors` array.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: RwLock<HashMap<(Method, String), Reply>>,
    calls: RwLock<HashMap<(Method, String), usize>>,
    requests: RwLock<Vec<RecordedRequest>>,
    total: AtomicUsize,
    delay: Option<Duration>,
}

impl MockTransport {
    /// Create an empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every answer by `delay`, so concurrent callers overlap.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Finish building and share.
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Answer `method path` with `status` and a JSON body.
    pub async fn respond_json(&self, method: Method, path: &str, status: u16, body: serde_json::Value) {
        let response = HttpResponse {
            status,
            headers: vec![("content-type".into(), "application/json".into())],
            body: body.to_string().into_bytes(),
        };
        self.respond(method, path, response).await;
    }

    /// Answer `method path` with `response`.
    pub async fn respond(&self, method: Method, path: &str, response: HttpResponse) {
        self.routes
            .write()
            .await
            .insert((method, normalize(path)), Reply::Response(response));
    }

    /// Fail `method path` at the transport level.
    pub async fn fail(&self, method: Method, path: &str, error: TransportError) {
        self.routes
            .write()
            .await
            .insert((method, normalize(path)), Reply::Failure(error));
    }

    /// Calls made to `method path`.
    pub async fn calls(&self, method: Method, path: &str) -> usize {
        self.calls
            .read()
            .await
            .get(&(method, normalize(path)))
            .copied()
            .unwrap_or_default()
    }

    /// Calls made to any route.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// All requests seen so far.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }

    /// Most recent request.
    pub async fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.read().await.last().cloned()
    }
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_string()
}

fn api_path(url: &str) -> String {
    let without_query = url.split('?').next().unwrap_or(url);
    without_query
        .split_once("/v1/")
        .map_or(without_query, |(_, path)| path)
        .trim_matches('/')
        .to_string()
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let key = (request.method, api_path(&request.url));
        self.total.fetch_add(1, Ordering::SeqCst);
        *self.calls.write().await.entry(key.clone()).or_default() += 1;
        self.requests.write().await.push(RecordedRequest {
            method: request.method,
            path: key.1.clone(),
            headers: request.headers.clone(),
            body: request.body.clone(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.routes.read().await.get(&key).cloned() {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Failure(error)) => Err(error),
            None => Ok(HttpResponse {
                status: 404,
                headers: vec![("content-type".into(), "application/json".into())],
                body: br#"{"errors":[]}"#.to_vec(),
            }),
        }
    }
}
