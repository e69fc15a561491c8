//! Adapter answer and consolidated verdict models.

use super::Source;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One adapter's answer to a query.
///
/// Created per adapter call; consumed immediately by fusion; not retained.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceResult {
    /// Whether the adapter judged the statement supported.
    pub supported: bool,
    /// The adapter's confidence in its judgement (0-100).
    pub confidence: u8,
    /// Evidence statements backing the judgement.
    pub evidence: Vec<String>,
    /// Statements contradicting the query.
    pub contradictions: Vec<String>,
    /// Evidence records backing the judgement.
    pub sources: Vec<Source>,
}

impl SourceResult {
    /// Creates a result with the given verdict and confidence (clamped to 100).
    #[must_use]
    pub fn new(supported: bool, confidence: u8) -> Self {
        Self {
            supported,
            confidence: confidence.min(100),
            ..Self::default()
        }
    }

    /// Adds an evidence statement.
    #[must_use]
    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence.push(evidence.into());
        self
    }

    /// Adds a contradiction statement.
    #[must_use]
    pub fn with_contradiction(mut self, contradiction: impl Into<String>) -> Self {
        self.contradictions.push(contradiction.into());
        self
    }

    /// Adds an evidence record.
    #[must_use]
    pub fn with_source(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }
}

/// The engine's consolidated verdict for one query.
///
/// Created once per call; immutable; returned to the caller and not persisted
/// by this crate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsolidatedResult {
    /// Whether the statement is supported by a strict weighted majority of
    /// the responding adapters.
    pub supported: bool,
    /// Weighted mean confidence across responding adapters (0-100, rounded).
    pub confidence: u8,
    /// Union of evidence statements, first occurrence wins.
    pub evidence: Vec<String>,
    /// Union of contradiction statements, first occurrence wins.
    pub contradictions: Vec<String>,
    /// Deduplicated evidence records across all responding adapters.
    pub sources: Vec<Source>,
    /// Adapter name to the reliability weight used in this call.
    pub source_weights: HashMap<String, f64>,
    /// Names of adapters that answered.
    pub consulted: Vec<String>,
    /// Names of adapters that were unavailable or failed.
    pub unavailable: Vec<String>,
    /// Wall-clock elapsed time in milliseconds, floored at 1.
    pub query_time_ms: u64,
}
