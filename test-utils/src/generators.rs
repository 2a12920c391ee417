//! Shared proptest generators for the Vault client crates.

use proptest::prelude::*;
use std::time::Duration;

/// Durations with whole-second precision up to ten days.
pub fn whole_seconds_strategy() -> impl Strategy<Value = Duration> {
    (0u64..864_000).prop_map(Duration::from_secs)
}

/// Durations with millisecond precision up to one day.
pub fn millis_duration_strategy() -> impl Strategy<Value = Duration> {
    (0u64..86_400_000).prop_map(Duration::from_millis)
}

/// Token-shaped strings (`hvs.` or legacy `s.` prefix).
pub fn token_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Za-z0-9]{24}".prop_map(|body| format!("hvs.{body}")),
        "[A-Za-z0-9]{24}".prop_map(|body| format!("s.{body}")),
    ]
}

/// Secret values long enough that any leak is unambiguous.
pub fn secret_value_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9]{16,48}"
}

/// Relative API paths of one to four segments.
pub fn api_path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9_-]{0,11}", 1..=4).prop_map(|segments| segments.join("/"))
}

/// Lists of DNS names, as sent in comma-joined fields.
pub fn dns_names_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,10}\\.example\\.com", 0..5)
}

/// Status codes Vault uses for failures.
pub fn error_status_strategy() -> impl Strategy<Value = u16> {
    prop_oneof![
        Just(400u16),
        Just(403),
        Just(404),
        Just(405),
        Just(412),
        Just(429),
        Just(500),
        Just(502),
        Just(503),
    ]
}
