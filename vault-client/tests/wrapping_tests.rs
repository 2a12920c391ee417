//! Response-unwrapping behaviour against a scripted transport.

use futures::future::join_all;
use secrecy::{ExposeSecret, SecretString};
use std::{collections::HashMap, sync::Arc, time::Duration};
use test_utils::{MockTransport, fixtures};
use tokio_test::{assert_err, assert_ok};
use vault_client::{
    AuthConfig, ConnectionErrorKind, Credential, Method, TransportError, VaultClient, VaultConfig, VaultError,
    executor::TOKEN_HEADER,
    wrapping::{self, WrappingResolver},
};

const UNWRAP: &str = "sys/wrapping/unwrap";

fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

fn client(mock: &Arc<MockTransport>, auth: AuthConfig, unwrap_ttl: Duration) -> VaultClient {
    let config = VaultConfig::new("http://vault.test:8200", auth).with_unwrap_cache_ttl(unwrap_ttl);
    VaultClient::with_transport(config, mock.clone()).unwrap()
}

#[tokio::test]
async fn concurrent_unwraps_share_one_call() {
    let mock = MockTransport::new().with_delay(Duration::from_millis(50)).shared();
    mock.respond_json(Method::Post, UNWRAP, 200, fixtures::auth_response("s.inner", 3600, true))
        .await;
    let client = client(&mock, AuthConfig::None, Duration::from_secs(60));
    let token = secret("hvs.wrapped-1");

    let results = join_all((0..16).map(|_| client.unwrap(&token, wrapping::client_token))).await;

    for result in results {
        assert_eq!(assert_ok!(result).expose_secret(), "s.inner");
    }
    assert_eq!(mock.calls(Method::Post, UNWRAP).await, 1);
}

#[tokio::test]
async fn concurrent_failures_share_one_call() {
    let mock = MockTransport::new().with_delay(Duration::from_millis(50)).shared();
    mock.respond_json(Method::Post, UNWRAP, 400, fixtures::invalid_wrapping_token())
        .await;
    let client = client(&mock, AuthConfig::None, Duration::from_secs(60));
    let token = secret("hvs.wrapped-2");

    let results = join_all((0..8).map(|_| client.unwrap(&token, wrapping::client_token))).await;

    for result in results {
        let err = assert_err!(result);
        assert!(matches!(err, VaultError::Wrapping { .. }));
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.errors(), vec!["wrapping token is not valid or does not exist".to_string()]);
    }
    assert_eq!(mock.calls(Method::Post, UNWRAP).await, 1);
}

#[tokio::test(start_paused = true)]
async fn outcome_is_kept_for_the_ttl_then_fetched_again() {
    let mock = MockTransport::new().shared();
    mock.respond_json(
        Method::Post,
        UNWRAP,
        200,
        fixtures::data_response(serde_json::json!({"secret_id": "sid-1"})),
    )
    .await;
    let client = client(&mock, AuthConfig::None, Duration::from_secs(3600));
    let token = secret("hvs.wrapped-3");

    assert_ok!(client.unwrap(&token, wrapping::secret_id).await);
    tokio::time::advance(Duration::from_secs(3599)).await;
    assert_ok!(client.unwrap(&token, wrapping::secret_id).await);
    assert_eq!(mock.calls(Method::Post, UNWRAP).await, 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(client.resolver().cached().await, 0);

    let value = assert_ok!(client.unwrap(&token, wrapping::secret_id).await);
    assert_eq!(value.expose_secret(), "sid-1");
    assert_ok!(client.unwrap(&token, wrapping::secret_id).await);
    assert_eq!(mock.calls(Method::Post, UNWRAP).await, 2);
}

#[tokio::test]
async fn failed_outcome_is_remembered() {
    let mock = MockTransport::new().shared();
    mock.respond_json(Method::Post, UNWRAP, 400, fixtures::invalid_wrapping_token())
        .await;
    let client = client(&mock, AuthConfig::None, Duration::from_secs(60));
    let token = secret("hvs.wrapped-4");

    assert_err!(client.unwrap(&token, wrapping::client_token).await);
    // a later success on the server is not observed until the entry expires
    mock.respond_json(Method::Post, UNWRAP, 200, fixtures::auth_response("s.late", 60, false))
        .await;
    assert_err!(client.unwrap(&token, wrapping::client_token).await);
    assert_eq!(mock.calls(Method::Post, UNWRAP).await, 1);
}

#[tokio::test]
async fn distinct_tokens_unwrap_independently() {
    let mock = MockTransport::new().shared();
    mock.respond_json(
        Method::Post,
        UNWRAP,
        200,
        fixtures::data_response(serde_json::json!({"password": "hunter2"})),
    )
    .await;
    let client = client(&mock, AuthConfig::None, Duration::from_secs(60));

    assert_ok!(client.unwrap(&secret("hvs.a"), wrapping::password).await);
    assert_ok!(client.unwrap(&secret("hvs.b"), wrapping::password).await);
    assert_eq!(mock.calls(Method::Post, UNWRAP).await, 2);

    let tokens: Vec<_> = mock
        .requests()
        .await
        .iter()
        .filter_map(|r| r.header(TOKEN_HEADER).map(String::from))
        .collect();
    assert_eq!(tokens, vec!["hvs.a".to_string(), "hvs.b".to_string()]);
}

#[tokio::test]
async fn other_statuses_are_preserved() {
    let mock = MockTransport::new().shared();
    mock.respond_json(Method::Post, UNWRAP, 403, fixtures::error_response(&["permission denied"]))
        .await;
    let client = client(&mock, AuthConfig::None, Duration::from_secs(60));

    let err = assert_err!(client.unwrap(&secret("hvs.c"), wrapping::client_token).await);
    assert!(matches!(err, VaultError::Service { status: 403, .. }));
    assert_eq!(err.errors(), vec!["permission denied".to_string()]);
}

#[tokio::test]
async fn wrapped_client_token_authorizes_calls() {
    let mock = MockTransport::new().shared();
    mock.respond_json(Method::Post, UNWRAP, 200, fixtures::auth_response("s.unwrapped", 0, false))
        .await;
    mock.respond_json(
        Method::Get,
        "secret/app",
        200,
        fixtures::data_response(serde_json::json!({"db_password": "pw"})),
    )
    .await;
    let client = client(&mock, AuthConfig::WrappedToken(secret("hvs.wrapped-5")), Duration::from_secs(60));

    for _ in 0..3 {
        let data: HashMap<String, String> = assert_ok!(client.kv1("secret").read("app").await);
        assert_eq!(data["db_password"], "pw");
    }

    assert_eq!(mock.calls(Method::Post, UNWRAP).await, 1);
    let reads: Vec<_> = mock
        .requests()
        .await
        .into_iter()
        .filter(|r| r.path == "secret/app")
        .collect();
    assert_eq!(reads.len(), 3);
    assert!(reads.iter().all(|r| r.header(TOKEN_HEADER) == Some("s.unwrapped")));
}

#[tokio::test]
async fn resolver_can_be_used_standalone() {
    let mock = MockTransport::new().shared();
    mock.respond_json(Method::Post, UNWRAP, 200, fixtures::auth_response("s.direct", 60, true))
        .await;
    let executor = Arc::new(vault_client::RequestExecutor::new(
        url::Url::parse("http://vault.test:8200").unwrap(),
        mock.clone(),
    ));
    let resolver = WrappingResolver::new(executor, Duration::from_secs(5));

    let value = assert_ok!(resolver.unwrap(&secret("hvs.d"), wrapping::client_token).await);
    assert_eq!(value.expose_secret(), "s.direct");
    assert_eq!(resolver.cached().await, 1);
    assert_eq!(resolver.ttl(), Duration::from_secs(5));
}

#[tokio::test]
async fn transport_failure_is_shared_and_classified() {
    let mock = MockTransport::new().with_delay(Duration::from_millis(20)).shared();
    mock.fail(Method::Post, UNWRAP, TransportError::Unreachable("connection refused".into()))
        .await;
    let client = client(&mock, AuthConfig::None, Duration::from_secs(60));
    let token = secret("hvs.wrapped-6");

    let results = join_all((0..4).map(|_| client.unwrap(&token, wrapping::client_token))).await;
    for result in results {
        let err = assert_err!(result);
        assert!(matches!(
            err,
            VaultError::Connection {
                kind: ConnectionErrorKind::Refused,
                ..
            }
        ));
    }
    assert_eq!(mock.calls(Method::Post, UNWRAP).await, 1);
    assert_eq!(mock.total_calls(), 1);
}

#[tokio::test]
async fn wrapped_password_reaches_the_login_body() {
    let mock = MockTransport::new().shared();
    mock.respond_json(
        Method::Post,
        UNWRAP,
        200,
        fixtures::data_response(serde_json::json!({"password": "from-the-wrap"})),
    )
    .await;
    mock.respond_json(
        Method::Post,
        "auth/ldap-users/login/carol",
        200,
        fixtures::auth_response("s.carol", 3600, true),
    )
    .await;
    mock.respond_json(
        Method::Get,
        "secret/carol",
        200,
        fixtures::leased_response("secret/carol/lease-1", 600, serde_json::json!({"k": "v"})),
    )
    .await;
    let auth = AuthConfig::UserPass {
        mount: "ldap-users".into(),
        username: "carol".into(),
        password: Credential::Wrapped(secret("hvs.wrapped-pw")),
    };
    let client = client(&mock, auth, Duration::from_secs(60));

    let data: HashMap<String, String> = assert_ok!(client.kv1("secret").read("carol").await);
    assert_eq!(data["k"], "v");

    let requests = mock.requests().await;
    let login = requests
        .iter()
        .find(|r| r.path == "auth/ldap-users/login/carol")
        .and_then(test_utils::RecordedRequest::json);
    assert_eq!(login, Some(serde_json::json!({"password": "from-the-wrap"})));
    let unwrap = requests.iter().find(|r| r.path == UNWRAP);
    assert!(unwrap.is_some_and(|r| r.header(TOKEN_HEADER) == Some("hvs.wrapped-pw") && r.json().is_none()));
}
