//! # Crosscheck
//!
//! Multi-source knowledge consolidation engine for statement verification.
//!
//! Crosscheck fans a verification query out to pluggable knowledge-source
//! adapters, weights each adapter's answer by a domain-aware reliability
//! score, isolates per-source failures, and folds the results into a single
//! confidence-bearing verdict.
//!
//! ## Features
//!
//! - Pluggable source adapters behind one capability trait
//! - Per-source fault isolation: one failing provider never fails the verdict
//! - Domain-aware reliability weights with feedback-driven adjustment
//! - Fast path that short-circuits on the first confident high-trust answer
//! - Conservative fallback verdict when no source can be reached
//!
//! ## Example
//!
//! ```rust,ignore
//! use crosscheck::{ConsolidationEngine, KnowledgeQuery};
//!
//! let engine = ConsolidationEngine::new();
//! engine.register(Arc::new(EncyclopediaClient::new()), None);
//! let result = engine.query_all(
//!     &KnowledgeQuery::new("The Eiffel Tower is in Paris").with_domain("geography"),
//! )?;
//! println!("supported={} confidence={}", result.supported, result.confidence);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod engine;
pub mod models;
pub mod observability;
pub mod reliability;
pub mod sources;

// Re-exports for convenience
pub use config::EngineConfig;
pub use engine::{ConsolidationEngine, FAST_PATH_CONFIDENCE_THRESHOLD, dedup_sources};
pub use models::{ConsolidatedResult, KnowledgeQuery, Source, SourceCategory, SourceResult};
pub use reliability::{FeedbackPolarity, ReliabilityConfig, SourceReliabilityRegistry};
pub use sources::{
    EncyclopediaClient, GovernmentRegistryClient, KnowledgeSource, ResilienceConfig,
    ResilientSource, SourceHttpConfig,
};

/// Error type for crosscheck operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed query (empty statement), invalid config values |
/// | `OperationFailed` | Adapter HTTP request fails, provider response cannot be parsed |
///
/// Adapter-level `OperationFailed` errors are contained by the consolidation
/// engine: they move the adapter into the result's unavailable list and never
/// propagate out of `query_all` or `query_best`.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - A query has an empty statement
    /// - A reliability weight override is not a finite number
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - An adapter's HTTP request fails or times out
    /// - A provider response cannot be deserialized
    /// - A circuit breaker rejects a call
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

/// Result type alias for crosscheck operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("empty statement".to_string());
        assert_eq!(err.to_string(), "invalid input: empty statement");

        let err = Error::OperationFailed {
            operation: "encyclopedia_query".to_string(),
            cause: "timeout".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "operation 'encyclopedia_query' failed: timeout"
        );
    }
}
