//! Tracing subscriber initialisation.
//!
//! The client libraries only emit `tracing` events; installing a subscriber
//! is left to the binary. Each executed request runs inside a debug-level
//! `execute` span carrying operation, method and path; the JSON formatter
//! reports it with every event emitted inside it.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor an explicit filter is given.
pub const DEFAULT_FILTER: &str = "warn,vault_client=info,vault_common=info";

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Filter directives, overridden by `RUST_LOG` when it is set
    pub filter: String,
    /// Whether to output JSON lines
    pub json_output: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            json_output: false,
        }
    }
}

impl TracingConfig {
    /// Replace the filter directives, e.g. `vault_client=debug`.
    #[must_use]
    pub fn with_filter(mut self, directives: impl Into<String>) -> Self {
        self.filter = directives.into();
        self
    }

    /// Enable JSON output.
    #[must_use]
    pub const fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.filter))
    }
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed (for instance by
/// another test in the same process).
pub fn init_tracing(config: &TracingConfig) -> bool {
    let registry = tracing_subscriber::registry().with(config.env_filter());
    let installed = if config.json_output {
        registry
            .with(fmt::layer().json().with_current_span(true).with_span_list(false))
            .try_init()
            .is_ok()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init().is_ok()
    };

    if installed {
        tracing::debug!(filter = %config.filter, json = config.json_output, "Tracing initialized");
    }
    installed
}
