//! Wire codec: typed values to and from Vault's JSON.
//!
//! Serde does the bulk of the work. This module adds the envelope types Vault
//! wraps most payloads in, the `with =` adapters for encodings Vault uses that
//! serde has no opinion on, and the decode entry points that turn a parse
//! failure into [`VaultError::Decode`].
//!
//! Conventions for every wire type in the crate: unknown fields are ignored,
//! and `None` fields are left out of request bodies.

use crate::{
    error::{VaultError, VaultResult},
    transport::HttpResponse,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{collections::HashMap, fmt, time::Duration};

/// Vault's standard response envelope.
///
/// `data` and `auth` are engine-specific; `wrap_info` replaces both when the
/// response was wrapped.
#[derive(Clone, Serialize, Deserialize)]
pub struct LeasedResponse<D, A = AuthInfo> {
    /// Server-assigned request id
    #[serde(default)]
    pub request_id: String,
    /// Lease id, empty when the payload is not leased
    #[serde(default)]
    pub lease_id: String,
    /// Whether the lease can be renewed
    #[serde(default)]
    pub renewable: bool,
    /// Lease duration in seconds
    #[serde(default)]
    pub lease_duration: u64,
    /// Engine payload
    pub data: Option<D>,
    /// Present when the response was wrapped
    pub wrap_info: Option<WrapInfo>,
    /// Non-fatal warnings
    pub warnings: Option<Vec<String>>,
    /// Auth payload returned by login endpoints
    pub auth: Option<A>,
}

impl<D, A> Default for LeasedResponse<D, A> {
    fn default() -> Self {
        Self {
            request_id: String::new(),
            lease_id: String::new(),
            renewable: false,
            lease_duration: 0,
            data: None,
            wrap_info: None,
            warnings: None,
            auth: None,
        }
    }
}

impl<D, A> fmt::Debug for LeasedResponse<D, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeasedResponse")
            .field("request_id", &self.request_id)
            .field("lease_id", &self.lease_id)
            .field("renewable", &self.renewable)
            .field("lease_duration", &self.lease_duration)
            .field("data", &self.data.as_ref().map(|_| "[REDACTED]"))
            .field("wrap_info", &self.wrap_info)
            .field("warnings", &self.warnings)
            .field("auth", &self.auth.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl<D, A> LeasedResponse<D, A> {
    /// Lease duration as a [`Duration`].
    #[must_use]
    pub const fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease_duration)
    }

    /// Lease id, `None` when empty.
    #[must_use]
    pub fn lease(&self) -> Option<&str> {
        Some(self.lease_id.as_str()).filter(|id| !id.is_empty())
    }
}

/// Metadata describing a wrapped response.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct WrapInfo {
    /// The wrapping token
    #[serde(default)]
    pub token: String,
    /// Accessor of the wrapping token
    #[serde(default)]
    pub accessor: String,
    /// Wrapping token TTL in seconds
    #[serde(default)]
    pub ttl: u64,
    /// When the wrapping token was created
    #[serde(default, with = "option_epoch_or_timestamp", skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<chrono::DateTime<chrono::Utc>>,
    /// Path of the call whose response was wrapped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_path: Option<String>,
    /// Accessor of the wrapped token, when a token was wrapped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrapped_accessor: Option<String>,
}

impl fmt::Debug for WrapInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapInfo")
            .field("token", &"[REDACTED]")
            .field("accessor", &self.accessor)
            .field("ttl", &self.ttl)
            .field("creation_time", &self.creation_time)
            .field("creation_path", &self.creation_path)
            .finish_non_exhaustive()
    }
}

/// `auth` block returned by login and token endpoints.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthInfo {
    /// The issued client token
    #[serde(default)]
    pub client_token: String,
    /// Token accessor
    #[serde(default)]
    pub accessor: String,
    /// Policies attached to the token
    #[serde(default)]
    pub policies: Vec<String>,
    /// Policies attached directly to the token
    #[serde(default)]
    pub token_policies: Vec<String>,
    /// Login metadata
    pub metadata: Option<HashMap<String, String>>,
    /// Token TTL in seconds
    #[serde(default)]
    pub lease_duration: u64,
    /// Whether the token can be renewed
    #[serde(default)]
    pub renewable: bool,
    /// Identity entity id
    #[serde(default)]
    pub entity_id: String,
    /// `service` or `batch`
    #[serde(default)]
    pub token_type: String,
    /// Whether the token has no parent
    #[serde(default)]
    pub orphan: bool,
}

impl fmt::Debug for AuthInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthInfo")
            .field("client_token", &"[REDACTED]")
            .field("accessor", &self.accessor)
            .field("policies", &self.policies)
            .field("lease_duration", &self.lease_duration)
            .field("renewable", &self.renewable)
            .field("token_type", &self.token_type)
            .finish_non_exhaustive()
    }
}

impl AuthInfo {
    /// Token TTL as a [`Duration`].
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.lease_duration)
    }
}

/// Vault's error body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorEnvelope {
    /// Error messages
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Extract error messages from an error body.
///
/// Uses the `errors` array when present and non-empty, the trimmed raw text
/// otherwise. Returns an empty list for an empty body.
#[must_use]
pub fn parse_errors(body: &[u8]) -> Vec<String> {
    if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(body) {
        if !envelope.errors.is_empty() {
            return envelope.errors;
        }
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        Vec::new()
    } else {
        vec![text.to_string()]
    }
}

/// Serialize a request body.
///
/// # Errors
///
/// Returns [`VaultError::Encode`] when the value cannot be serialized.
pub fn encode_body<T: Serialize + ?Sized>(value: &T) -> VaultResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(VaultError::from)
}

/// Decode a JSON body into `T`.
///
/// # Errors
///
/// Returns [`VaultError::Decode`] carrying the status and raw body.
pub fn decode_json<T: DeserializeOwned>(response: &HttpResponse) -> VaultResult<T> {
    serde_json::from_slice(&response.body)
        .map_err(|e| VaultError::decode(response.status, &response.body, e))
}

/// Decode a leased envelope; an empty body (204) yields an empty envelope.
///
/// # Errors
///
/// Returns [`VaultError::Decode`] for a non-empty body that does not match.
pub fn decode_leased<D, A>(response: &HttpResponse) -> VaultResult<LeasedResponse<D, A>>
where
    D: DeserializeOwned,
    A: DeserializeOwned,
{
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(LeasedResponse::default());
    }
    decode_json(response)
}

/// Error for a payload section the response should have carried.
#[must_use]
pub fn missing_field(response_status: u16, field: &'static str) -> VaultError {
    VaultError::decode(
        response_status,
        &[],
        <serde_json::Error as serde::de::Error>::missing_field(field),
    )
}

/// Format a duration the way Vault expects it: `1h30m`, `45s`, `0.5s`, `0s`.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    use std::fmt::Write;

    let total = duration.as_secs();
    let nanos = duration.subsec_nanos();
    if total == 0 && nanos == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        let _ = write!(out, "{hours}h");
    }
    if minutes > 0 {
        let _ = write!(out, "{minutes}m");
    }
    if seconds > 0 || nanos > 0 {
        let _ = write!(out, "{seconds}");
        if nanos > 0 {
            let fraction = format!("{nanos:09}");
            let _ = write!(out, ".{}", fraction.trim_end_matches('0'));
        }
        out.push('s');
    }
    out
}

const MAX_FRACTION_DIGITS: usize = 18;

/// Parse a Vault duration string.
///
/// Accepts Go-style unit sequences (`1h30m`, `250ms`, `1.5s`, `7d`), an
/// ISO-8601 time form (`PT30S`) and bare second counts (`"30"`).
///
/// # Errors
///
/// Returns a description of the first invalid segment.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let lowered = input.trim().to_lowercase();
    let text = lowered.strip_prefix("pt").unwrap_or(&lowered);
    if text.is_empty() {
        return Err(format!("invalid duration {input:?}"));
    }
    if let Ok(secs) = text.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total_nanos: u128 = 0;
    let mut rest = text;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| format!("missing unit in duration {input:?}"))?;
        if number_len == 0 {
            return Err(format!("invalid duration {input:?}"));
        }
        let (number, tail) = rest.split_at(number_len);
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);

        let unit_nanos: u128 = match unit {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3_600 * 1_000_000_000,
            "d" => 86_400 * 1_000_000_000,
            other => return Err(format!("unknown unit {other:?} in duration {input:?}")),
        };

        let out_of_range = || format!("duration {input:?} out of range");
        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|e: std::num::ParseIntError| {
                if matches!(e.kind(), std::num::IntErrorKind::PosOverflow) {
                    out_of_range()
                } else {
                    format!("invalid number {number:?} in duration {input:?}")
                }
            })?
        };
        let mut segment = whole.checked_mul(unit_nanos).ok_or_else(out_of_range)?;
        // digits past the 18th are below nanosecond precision for every unit
        let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
        if !fraction.is_empty() {
            let digits: u128 = fraction
                .parse()
                .map_err(|_| format!("invalid number {number:?} in duration {input:?}"))?;
            let scale = 10u128.pow(u32::try_from(fraction.len()).unwrap_or(0));
            segment = segment
                .checked_add(digits * unit_nanos / scale)
                .ok_or_else(out_of_range)?;
        }
        total_nanos = total_nanos.checked_add(segment).ok_or_else(out_of_range)?;
        rest = tail;
    }

    let secs = u64::try_from(total_nanos / 1_000_000_000)
        .map_err(|_| format!("duration {input:?} out of range"))?;
    let nanos = u32::try_from(total_nanos % 1_000_000_000).unwrap_or(0);
    Ok(Duration::new(secs, nanos))
}

/// `with = "codec::duration"`: Vault duration string, or integer seconds.
pub mod duration {
    use super::{format_duration, parse_duration};
    use serde::{Deserializer, Serializer, de};
    use std::{fmt, time::Duration};

    /// Serialize as a Vault duration string.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*value))
    }

    /// Deserialize from a duration string or a number of seconds.
    ///
    /// # Errors
    ///
    /// Fails on negative numbers and unparseable strings.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        deserializer.deserialize_any(DurationVisitor)
    }

    struct DurationVisitor;

    impl de::Visitor<'_> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a duration string or a number of seconds")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
            u64::try_from(v)
                .map(Duration::from_secs)
                .map_err(|_| E::custom(format!("negative duration {v}")))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Duration, E> {
            Duration::try_from_secs_f64(v).map_err(|_| E::custom(format!("invalid duration {v}")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
            parse_duration(v).map_err(E::custom)
        }
    }
}

/// `with = "codec::option_duration"`: optional form of [`duration`].
pub mod option_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    struct Wire(#[serde(with = "super::duration")] Duration);

    /// Serialize `Some` as a duration string, `None` as null.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&super::format_duration(*d)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional duration.
    ///
    /// # Errors
    ///
    /// Fails on malformed durations.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<Wire>::deserialize(deserializer).map(|wire| wire.map(|Wire(d)| d))
    }
}

/// `with = "codec::comma_list"`: list sent as one comma-joined string.
pub mod comma_list {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Joined(String),
        List(Vec<String>),
    }

    /// Serialize as `"a,b,c"`.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.join(","))
    }

    /// Deserialize from a comma-joined string (or a JSON array).
    ///
    /// # Errors
    ///
    /// Fails when the value is neither a string nor an array of strings.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        Ok(match Wire::deserialize(deserializer)? {
            Wire::Joined(joined) => joined
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            Wire::List(list) => list,
        })
    }
}

/// `with = "codec::string_or_object"`: value Vault sometimes sends as JSON
/// text inside a string.
pub mod string_or_object {
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de::DeserializeOwned};
    use serde_json::Value;

    /// Serialize natively.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<T: Serialize, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
        value.serialize(serializer)
    }

    /// Decode natively, falling back to parsing a string as JSON.
    ///
    /// # Errors
    ///
    /// Fails when neither form matches `T`.
    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: DeserializeOwned,
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match serde_json::from_value::<T>(value.clone()) {
            Ok(decoded) => Ok(decoded),
            Err(native_err) => match value {
                Value::String(text) => serde_json::from_str(&text).map_err(serde::de::Error::custom),
                _ => Err(serde::de::Error::custom(native_err)),
            },
        }
    }
}

/// `with = "codec::epoch_or_timestamp"`: instant sent either as epoch seconds
/// or as an RFC 3339 timestamp.
pub mod epoch_or_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};
    use serde_json::Value;

    /// Serialize as RFC 3339.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    /// Deserialize from epoch seconds or an RFC 3339 string.
    ///
    /// # Errors
    ///
    /// Fails on out-of-range numbers and malformed strings.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        from_value(&Value::deserialize(deserializer)?).map_err(de::Error::custom)
    }

    pub(super) fn from_value(value: &Value) -> Result<DateTime<Utc>, String> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .ok_or_else(|| format!("epoch seconds out of range: {n}")),
            Value::String(s) => match s.parse::<i64>() {
                Ok(secs) => DateTime::from_timestamp(secs, 0)
                    .ok_or_else(|| format!("epoch seconds out of range: {s}")),
                Err(_) => DateTime::parse_from_rfc3339(s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| format!("invalid timestamp {s:?}: {e}")),
            },
            other => Err(format!("expected epoch seconds or timestamp, got {other}")),
        }
    }
}

/// Optional form of [`epoch_or_timestamp`].
pub mod option_epoch_or_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};
    use serde_json::Value;

    /// Serialize `Some` as RFC 3339, `None` as null.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional instant; null and empty strings are `None`.
    ///
    /// # Errors
    ///
    /// Fails on malformed values.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            Value::String(s) if s.is_empty() => Ok(None),
            other => super::epoch_or_timestamp::from_value(&other)
                .map(Some)
                .map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Role {
        #[serde(with = "duration")]
        ttl: Duration,
        #[serde(default, with = "option_duration", skip_serializing_if = "Option::is_none")]
        max_ttl: Option<Duration>,
        #[serde(default, with = "comma_list", skip_serializing_if = "Vec::is_empty")]
        alt_names: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Meta {
        #[serde(with = "string_or_object")]
        metadata: HashMap<String, String>,
    }

    #[derive(Debug, Deserialize)]
    struct Version {
        #[serde(with = "epoch_or_timestamp")]
        created: DateTime<Utc>,
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: vec![],
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h30m");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_secs(86_400 * 2)), "48h");
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("1h30m"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("PT1M"), Ok(Duration::from_secs(60)));
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("0.5s"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("7d"), Ok(Duration::from_secs(7 * 86_400)));
        assert_eq!(parse_duration("42"), Ok(Duration::from_secs(42)));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10y").is_err());
        assert!(parse_duration("h").is_err());
        assert!(parse_duration("10").is_ok());
    }

    #[test]
    fn test_parse_duration_out_of_range() {
        let huge = parse_duration("99999999999999999999999999999999999999h");
        assert!(huge.is_err_and(|e| e.contains("out of range")));
        assert!(parse_duration("999999999999999999999999999999999999999999s").is_err());
        assert!(parse_duration("5000000000000000000h1h").is_err());
        assert!(parse_duration("9223372036854775807h9223372036854775807h").is_err());

        let long_fraction = format!("1.{}d", "9".repeat(60));
        let parsed = parse_duration(&long_fraction);
        assert!(parsed.is_ok_and(|d| d > Duration::from_secs(86_400 * 2 - 1)));

        let decoded: Result<Role, _> =
            serde_json::from_str(r#"{"ttl":"99999999999999999999999999999999999999h"}"#);
        assert!(decoded.is_err());
    }

    #[test]
    fn test_null_fields_are_omitted() {
        let role = Role {
            ttl: Duration::from_secs(60),
            max_ttl: None,
            alt_names: vec![],
            description: None,
        };
        assert_eq!(serde_json::to_value(&role).unwrap(), json!({"ttl": "1m"}));
    }

    #[test]
    fn test_comma_list_and_duration_encoding() {
        let role = Role {
            ttl: Duration::from_secs(90),
            max_ttl: Some(Duration::from_secs(7200)),
            alt_names: vec!["a.example.com".into(), "b.example.com".into()],
            description: Some("web".into()),
        };
        let value = serde_json::to_value(&role).unwrap();
        assert_eq!(
            value,
            json!({
                "ttl": "1m30s",
                "max_ttl": "2h",
                "alt_names": "a.example.com,b.example.com",
                "description": "web"
            })
        );
        let back: Role = serde_json::from_value(value).unwrap();
        assert_eq!(back, role);
    }

    #[test]
    fn test_duration_from_integer_seconds_and_unknown_fields() {
        let role: Role = serde_json::from_value(json!({
            "ttl": 3600,
            "max_ttl": 0,
            "alt_names": " a , b,,",
            "added_in_a_future_release": true
        }))
        .unwrap();
        assert_eq!(role.ttl, Duration::from_secs(3600));
        assert_eq!(role.max_ttl, Some(Duration::ZERO));
        assert_eq!(role.alt_names, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_negative_duration_rejected() {
        let err = serde_json::from_value::<Role>(json!({"ttl": -5})).unwrap_err();
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn test_string_or_object() {
        let native: Meta = serde_json::from_value(json!({"metadata": {"team": "core"}})).unwrap();
        let encoded: Meta =
            serde_json::from_value(json!({"metadata": "{\"team\":\"core\"}"})).unwrap();
        assert_eq!(native, encoded);
        assert!(serde_json::from_value::<Meta>(json!({"metadata": "not json"})).is_err());
    }

    #[test]
    fn test_epoch_or_timestamp() {
        let expected = Utc.with_ymd_and_hms(2015, 9, 21, 16, 3, 32).unwrap();
        let from_epoch: Version = serde_json::from_value(json!({"created": 1_442_851_412})).unwrap();
        let from_text: Version =
            serde_json::from_value(json!({"created": "2015-09-21T16:03:32Z"})).unwrap();
        assert_eq!(from_epoch.created, expected);
        assert_eq!(from_text.created, expected);
    }

    #[test]
    fn test_decode_error_keeps_status_and_body() {
        let err = decode_json::<serde_json::Value>(&response(200, "{not-json")).unwrap_err();
        match err {
            VaultError::Decode { status, body, .. } => {
                assert_eq!(status, 200);
                assert_eq!(body, "{not-json");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_decode_leased_envelope() {
        let body = json!({
            "request_id": "req-1",
            "lease_id": "",
            "renewable": false,
            "lease_duration": 2_764_800,
            "data": {"bar": "baz"},
            "wrap_info": null,
            "warnings": null,
            "auth": null
        })
        .to_string();
        let leased: LeasedResponse<HashMap<String, String>> =
            decode_leased(&response(200, &body)).unwrap();
        assert_eq!(leased.request_id, "req-1");
        assert_eq!(leased.lease(), None);
        assert_eq!(leased.lease_ttl(), Duration::from_secs(2_764_800));
        assert_eq!(leased.data.unwrap()["bar"], "baz");
    }

    #[test]
    fn test_empty_body_is_empty_envelope() {
        let leased: LeasedResponse<serde_json::Value> = decode_leased(&response(204, "")).unwrap();
        assert!(leased.data.is_none());
        assert!(leased.auth.is_none());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_errors(br#"{"errors":["permission denied"]}"#),
            vec!["permission denied".to_string()]
        );
        assert_eq!(parse_errors(b"upstream gone\n"), vec!["upstream gone".to_string()]);
        assert_eq!(parse_errors(br#"{"errors":[]}"#), vec![r#"{"errors":[]}"#.to_string()]);
        assert!(parse_errors(b"").is_empty());
    }

    #[test]
    fn test_secret_fields_redacted_in_debug() {
        let auth = AuthInfo {
            client_token: "hvs.very-secret".into(),
            accessor: "acc".into(),
            ..AuthInfo::default()
        };
        let debug = format!("{auth:?}");
        assert!(!debug.contains("hvs.very-secret"));
        assert!(debug.contains("acc"));

        let leased: LeasedResponse<String> = LeasedResponse {
            data: Some("plaintext".into()),
            ..LeasedResponse::default()
        };
        assert!(!format!("{leased:?}").contains("plaintext"));
    }
}
