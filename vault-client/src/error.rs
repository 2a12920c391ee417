//! Vault error types using thiserror 2.0.
//!
//! Every failure of a call is surfaced as a [`VaultError`]. Variants carry the
//! HTTP status when one was received and the messages Vault returned, so
//! callers can branch on status without parsing strings.
//!
//! The type is `Clone` because a single unwrap computation is shared by every
//! concurrent caller and each of them receives the same outcome.

use crate::transport::TransportError;
use std::{fmt, sync::Arc};
use thiserror::Error;
use vault_common::Retryable;

/// Kind of transport-level failure that prevented a response from arriving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// The connection was closed or reset mid-request
    Closed,
    /// The server could not be reached
    Refused,
    /// The call exceeded its timeout
    TimedOut,
}

impl fmt::Display for ConnectionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Closed => "closed",
            Self::Refused => "refused",
            Self::TimedOut => "timed out",
        })
    }
}

/// Vault-specific errors.
#[derive(Error, Debug, Clone)]
pub enum VaultError {
    /// Transport could not complete the call
    #[error("Vault connection {kind}: {message}")]
    Connection {
        /// What went wrong at the connection level
        kind: ConnectionErrorKind,
        /// Transport-supplied detail
        message: String,
    },

    /// Any other transport failure, propagated unchanged
    #[error(transparent)]
    Transport(TransportError),

    /// Vault answered 404
    #[error("Not found: {path}")]
    NotFound {
        /// Request path that was not found
        path: String,
        /// Messages from the error envelope
        errors: Vec<String>,
    },

    /// Vault answered with a status the request did not expect
    #[error("Vault returned status {status}: {}", errors.join("; "))]
    Service {
        /// HTTP status code
        status: u16,
        /// Messages from the error envelope, or the raw body
        errors: Vec<String>,
    },

    /// Response body did not match the expected shape
    #[error("Failed to decode response with status {status}: {source}")]
    Decode {
        /// HTTP status code of the undecodable response
        status: u16,
        /// Raw response body, kept for diagnostics
        body: String,
        /// Underlying parse failure
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// Request body could not be serialized
    #[error("Failed to encode request body: {0}")]
    Encode(#[source] Arc<serde_json::Error>),

    /// Wrapping token rejected by the unwrap endpoint
    #[error("{message}")]
    Wrapping {
        /// Operator-facing explanation
        message: String,
        /// Messages from the error envelope
        errors: Vec<String>,
    },

    /// Login flow did not produce a usable token
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for Vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

impl VaultError {
    /// HTTP status associated with the error, absent for transport failures.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::Service { status, .. } | Self::Decode { status, .. } => Some(*status),
            Self::Wrapping { .. } => Some(400),
            _ => None,
        }
    }

    /// Human-readable messages: server-supplied when available, derived otherwise.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        match self {
            Self::NotFound { errors, .. }
            | Self::Service { errors, .. }
            | Self::Wrapping { errors, .. }
                if !errors.is_empty() =>
            {
                errors.clone()
            }
            other => vec![other.to_string()],
        }
    }

    /// Whether Vault answered 404.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Create an error for an unexpected status, mapping 404 to [`Self::NotFound`].
    #[must_use]
    pub fn from_status(status: u16, path: impl Into<String>, errors: Vec<String>) -> Self {
        if status == 404 {
            Self::NotFound {
                path: path.into(),
                errors,
            }
        } else {
            Self::Service { status, errors }
        }
    }

    /// Create a decode error from a parse failure.
    #[must_use]
    pub fn decode(status: u16, body: &[u8], source: serde_json::Error) -> Self {
        Self::Decode {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
            source: Arc::new(source),
        }
    }

    /// Create an authentication failed error.
    #[must_use]
    pub fn auth_failed(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

impl Retryable for VaultError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { .. } => true,
            Self::Service { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(Arc::new(err))
    }
}

/// Opt-in recovery from 404 responses.
///
/// Nothing in the client swallows a `NotFound` on its own; callers that treat
/// a missing path as empty say so explicitly.
pub trait NotFoundExt<T> {
    /// Map a `NotFound` error to `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns any error other than `NotFound` unchanged.
    fn optional(self) -> VaultResult<Option<T>>;

    /// Map a `NotFound` error to `T::default()`.
    ///
    /// # Errors
    ///
    /// Returns any error other than `NotFound` unchanged.
    fn or_default_on_not_found(self) -> VaultResult<T>
    where
        T: Default;
}

impl<T> NotFoundExt<T> for VaultResult<T> {
    fn optional(self) -> VaultResult<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn or_default_on_not_found(self) -> VaultResult<T>
    where
        T: Default,
    {
        self.optional().map(Option::unwrap_or_default)
    }
}
