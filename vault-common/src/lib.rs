//! Shared library for cross-cutting concerns of the Vault client crates.
//!
//! This crate provides centralized implementations for:
//! - Retryability classification of errors
//! - HTTP client configuration and building
//! - Retry policies with exponential backoff
//! - Tracing subscriber initialisation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod http;
pub mod retry;
pub mod tracing_config;

pub use error::Retryable;
pub use http::{HttpConfig, build_http_client};
pub use retry::{RetryConfig, RetryPolicy};
pub use tracing_config::{TracingConfig, init_tracing};
