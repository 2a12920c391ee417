//! Retryability classification shared by every error type in the workspace.
//!
//! Errors are classified as either retryable or non-retryable, which helps
//! callers decide whether to retry failed operations. Nothing in the client
//! retries on its own; the classification only feeds [`crate::RetryPolicy`].

/// Classification of transient failures.
pub trait Retryable {
    /// Check if this error is retryable.
    ///
    /// Retryable errors are transient failures that may succeed on retry,
    /// such as network issues, rate limiting, or temporary unavailability.
    fn is_retryable(&self) -> bool;
}

impl Retryable for std::io::Error {
    fn is_retryable(&self) -> bool {
        use std::io::ErrorKind;
        matches!(
            self.kind(),
            ErrorKind::ConnectionRefused
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::TimedOut
                | ErrorKind::Interrupted
        )
    }
}
