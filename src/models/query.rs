//! Verification query model.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A verification request.
///
/// Created by the caller; read-only to the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeQuery {
    /// The statement to verify.
    pub statement: String,
    /// Optional domain tag (e.g. "healthcare", "financial").
    ///
    /// Used to select per-domain reliability weight overrides.
    pub domain: Option<String>,
    /// Optional free-text context for the statement.
    pub context: Option<String>,
    /// Optional hint for the maximum number of evidence records per adapter.
    pub max_results: Option<usize>,
}

impl KnowledgeQuery {
    /// Creates a query for the given statement.
    #[must_use]
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            ..Self::default()
        }
    }

    /// Sets the domain tag.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the free-text context.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Sets the max-results hint.
    #[must_use]
    pub const fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Validates the query before any network activity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the statement is empty or
    /// whitespace-only.
    pub fn validate(&self) -> Result<()> {
        if self.statement.trim().is_empty() {
            return Err(Error::InvalidInput(
                "query statement must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let query = KnowledgeQuery::new("Insulin regulates blood glucose")
            .with_domain("healthcare")
            .with_context("patient education material")
            .with_max_results(5);

        assert_eq!(query.statement, "Insulin regulates blood glucose");
        assert_eq!(query.domain.as_deref(), Some("healthcare"));
        assert_eq!(query.max_results, Some(5));
    }

    #[test]
    fn test_validate_rejects_empty_statement() {
        assert!(KnowledgeQuery::new("").validate().is_err());
        assert!(KnowledgeQuery::new("   \t").validate().is_err());
        assert!(KnowledgeQuery::new("water boils at 100C").validate().is_ok());
    }
}
