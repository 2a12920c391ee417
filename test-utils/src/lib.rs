//! Shared test utilities for the Vault client crates.
//!
//! This crate provides:
//! - Proptest generators for durations, tokens and API paths
//! - A scripted in-memory [`Transport`](vault_client::Transport)
//! - Fixtures building Vault response bodies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use generators::*;
pub use mocks::{MockTransport, RecordedRequest};
