//! Property-based tests for the Vault client.
//!
//! Tests validate:
//! - Duration strings survive a format/parse round trip
//! - Integer seconds and strings decode to the same duration
//! - Comma-joined lists decode back to their elements
//! - Secrets never appear in Debug output
//! - Error classification follows the status code

use proptest::prelude::*;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use test_utils::{
    api_path_strategy, dns_names_strategy, error_status_strategy, millis_duration_strategy,
    secret_value_strategy, token_strategy, whole_seconds_strategy,
};
use vault_client::{
    AuthInfo, Confidentiality, Method, VaultError, VaultRequest, WrapInfo,
    codec::{self, comma_list, duration},
};
use vault_common::Retryable;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Lifetime {
    #[serde(with = "duration")]
    ttl: Duration,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Sans {
    #[serde(with = "comma_list")]
    alt_names: Vec<String>,
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_duration_round_trip(d in millis_duration_strategy()) {
        let text = codec::format_duration(d);
        prop_assert_eq!(codec::parse_duration(&text), Ok(d));
    }

    #[test]
    fn prop_integer_seconds_match_string_form(d in whole_seconds_strategy()) {
        let from_int: Lifetime = serde_json::from_value(serde_json::json!({"ttl": d.as_secs()})).unwrap();
        let from_str: Lifetime =
            serde_json::from_value(serde_json::json!({"ttl": codec::format_duration(d)})).unwrap();
        prop_assert_eq!(from_int.ttl, d);
        prop_assert_eq!(from_str.ttl, d);
    }

    #[test]
    fn prop_comma_list_round_trip(names in dns_names_strategy()) {
        let encoded = serde_json::to_value(Sans { alt_names: names.clone() }).unwrap();
        prop_assert_eq!(&encoded["alt_names"], &serde_json::json!(names.join(",")));
        let decoded: Sans = serde_json::from_value(encoded).unwrap();
        prop_assert_eq!(decoded.alt_names, names);
    }

    #[test]
    fn prop_auth_info_debug_hides_token(token in token_strategy()) {
        let auth = AuthInfo {
            client_token: token.clone(),
            lease_duration: 3600,
            ..Default::default()
        };
        let debug = format!("{auth:?}");
        prop_assert!(!debug.contains(&token));
        prop_assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn prop_wrap_info_debug_hides_token(token in token_strategy()) {
        let info = WrapInfo {
            token: token.clone(),
            ttl: 300,
            ..Default::default()
        };
        let debug = format!("{info:?}");
        prop_assert!(!debug.contains(&token));
    }

    #[test]
    fn prop_request_debug_hides_token_and_body(
        token in token_strategy(),
        secret in secret_value_strategy(),
        path in api_path_strategy(),
    ) {
        let request = VaultRequest::empty(Method::Put, path.clone())
            .with_body(&serde_json::json!({"password": secret}))
            .unwrap()
            .with_token(SecretString::from(token.clone()));
        let debug = format!("{request:?}");
        prop_assert!(!debug.contains(&token));
        prop_assert!(!debug.contains(&secret));
        prop_assert!(debug.contains(&path));
    }

    #[test]
    fn prop_high_confidentiality_masks_everything(secret in secret_value_strategy()) {
        prop_assert_eq!(Confidentiality::High.mask(&secret), "***");
        let medium = Confidentiality::Medium.mask(&secret);
        prop_assert!(!medium.contains(&secret));
    }

    #[test]
    fn prop_status_classification(status in error_status_strategy(), path in api_path_strategy()) {
        let err = VaultError::from_status(status, path, vec!["boom".to_string()]);
        prop_assert_eq!(err.status(), Some(status));
        prop_assert_eq!(err.is_not_found(), status == 404);
        prop_assert_eq!(err.is_retryable(), matches!(status, 429 | 500 | 502 | 503 | 504));
    }
}
