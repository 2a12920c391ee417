//! Vault response bodies for tests.

use serde_json::{Value, json};

/// Standard envelope carrying `data`.
#[must_use]
pub fn data_response(data: Value) -> Value {
    json!({
        "request_id": "8c3b5b7e-3b0a-4c9e-a6f1-0f6d2f0c9b11",
        "lease_id": "",
        "renewable": false,
        "lease_duration": 0,
        "data": data,
        "wrap_info": null,
        "warnings": null,
        "auth": null
    })
}

/// Leased envelope, as returned for dynamic secrets.
#[must_use]
pub fn leased_response(lease_id: &str, lease_duration: u64, data: Value) -> Value {
    let mut body = data_response(data);
    body["lease_id"] = json!(lease_id);
    body["lease_duration"] = json!(lease_duration);
    body["renewable"] = json!(true);
    body
}

/// Login response issuing `client_token`.
#[must_use]
pub fn auth_response(client_token: &str, lease_duration: u64, renewable: bool) -> Value {
    json!({
        "request_id": "2f8f1c1e-0d3a-4b8e-9f7a-5d1c3e2b4a6f",
        "lease_id": "",
        "renewable": false,
        "lease_duration": 0,
        "data": null,
        "wrap_info": null,
        "warnings": null,
        "auth": {
            "client_token": client_token,
            "accessor": "accessor-1",
            "policies": ["default"],
            "token_policies": ["default"],
            "metadata": {"role_name": "app"},
            "lease_duration": lease_duration,
            "renewable": renewable,
            "entity_id": "entity-1",
            "token_type": "service",
            "orphan": true
        }
    })
}

/// Wrapped response handing out `token`.
#[must_use]
pub fn wrapped_response(token: &str, ttl: u64, creation_path: &str) -> Value {
    json!({
        "request_id": "",
        "lease_id": "",
        "renewable": false,
        "lease_duration": 0,
        "data": null,
        "wrap_info": {
            "token": token,
            "accessor": "wrap-accessor",
            "ttl": ttl,
            "creation_time": "2024-03-01T10:00:00.000000Z",
            "creation_path": creation_path
        },
        "warnings": null,
        "auth": null
    })
}

/// LIST response.
#[must_use]
pub fn list_response(keys: &[&str]) -> Value {
    data_response(json!({ "keys": keys }))
}

/// Error body.
#[must_use]
pub fn error_response(errors: &[&str]) -> Value {
    json!({ "errors": errors })
}

/// Error body returned for invalid wrapping tokens.
#[must_use]
pub fn invalid_wrapping_token() -> Value {
    error_response(&["wrapping token is not valid or does not exist"])
}
