//! Knowledge-source adapter abstraction.
//!
//! Provides a unified interface for external knowledge providers.

mod encyclopedia;
mod registry;
mod resilience;

pub use encyclopedia::EncyclopediaClient;
pub use registry::GovernmentRegistryClient;
pub use resilience::{ResilienceConfig, ResilientSource};

use crate::Result;
use crate::models::{KnowledgeQuery, SourceResult};
use std::time::Duration;

/// Trait for knowledge-source adapters.
///
/// New providers are added purely by implementing this contract and
/// registering an instance; the consolidation engine has no provider-specific
/// logic.
pub trait KnowledgeSource: Send + Sync {
    /// The stable adapter identifier.
    fn name(&self) -> &str;

    /// Raw credibility of the provider (0-100).
    ///
    /// Used to derive the default reliability weight at registration time.
    fn raw_credibility(&self) -> u8;

    /// Whether the provider can currently be queried.
    ///
    /// Implementations must not panic; any internal fault is reported as
    /// unavailable. The engine additionally contains panics from misbehaving
    /// implementations.
    fn is_available(&self) -> bool;

    /// Queries the provider for evidence about the statement.
    ///
    /// # Errors
    ///
    /// Returns an error on transient failure. The engine isolates the fault:
    /// a failing adapter is recorded as unavailable without aborting the
    /// other adapters.
    fn query(&self, query: &KnowledgeQuery) -> Result<SourceResult>;
}

/// HTTP client configuration for knowledge-source adapters.
#[derive(Debug, Clone, Copy)]
pub struct SourceHttpConfig {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for SourceHttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            connect_timeout_ms: 3_000,
        }
    }
}

impl SourceHttpConfig {
    /// Loads HTTP configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("CROSSCHECK_SOURCE_TIMEOUT_MS") {
            if let Ok(timeout_ms) = v.parse::<u64>() {
                self.timeout_ms = timeout_ms;
            }
        }
        if let Ok(v) = std::env::var("CROSSCHECK_SOURCE_CONNECT_TIMEOUT_MS") {
            if let Ok(connect_timeout_ms) = v.parse::<u64>() {
                self.connect_timeout_ms = connect_timeout_ms;
            }
        }
        self
    }
}

/// Builds a blocking HTTP client for adapter requests with configured timeouts.
///
/// Each adapter is individually responsible for its own request timeout; the
/// consolidation engine imposes no central deadline.
#[must_use]
pub fn build_http_client(config: SourceHttpConfig) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder();
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build source HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}
