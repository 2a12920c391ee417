//! Property-based tests for vault-common crate.
//!
//! These tests verify universal properties of the retry policy using proptest.

use proptest::prelude::*;
use std::time::Duration;
use vault_common::{RetryConfig, RetryPolicy, Retryable};

#[derive(Debug, thiserror::Error)]
#[error("transient={0}")]
struct Flaky(bool);

impl Retryable for Flaky {
    fn is_retryable(&self) -> bool {
        self.0
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Delays never exceed the configured cap, jitter included.
    #[test]
    fn prop_delay_bounded_by_max(
        attempt in 0u32..40,
        initial_ms in 1u64..500,
        max_ms in 500u64..20_000,
    ) {
        let policy = RetryPolicy::new(
            RetryConfig::default()
                .with_initial_delay(Duration::from_millis(initial_ms))
                .with_max_delay(Duration::from_millis(max_ms)),
        );

        let delay = policy.delay_for_attempt(attempt);
        // 25% jitter on top of the cap
        prop_assert!(delay <= Duration::from_millis(max_ms + max_ms / 4 + 1));
    }

    /// Without jitter, delays are monotonically non-decreasing.
    #[test]
    fn prop_delay_monotonic_without_jitter(attempt in 0u32..30) {
        let policy = RetryPolicy::new(RetryConfig::default().without_jitter());
        prop_assert!(policy.delay_for_attempt(attempt) <= policy.delay_for_attempt(attempt + 1));
    }

    /// Non-retryable errors are never retried regardless of the attempt count.
    #[test]
    fn prop_fatal_errors_never_retried(attempt in 0u32..10, max_retries in 0u32..10) {
        let policy = RetryPolicy::new(RetryConfig::default().with_max_retries(max_retries));
        prop_assert!(!policy.should_retry(&Flaky(false), attempt));
        prop_assert_eq!(policy.should_retry(&Flaky(true), attempt), attempt < max_retries);
    }
}
