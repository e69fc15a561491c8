//! Reference-encyclopedia adapter.
//!
//! Queries a MediaWiki-compatible REST search endpoint and maps matching
//! articles into evidence records.

use super::{KnowledgeSource, SourceHttpConfig, build_http_client};
use crate::models::{KnowledgeQuery, Source, SourceCategory, SourceResult};
use crate::{Error, Result};
use serde::Deserialize;

/// Reference-encyclopedia knowledge source.
pub struct EncyclopediaClient {
    /// API endpoint.
    endpoint: String,
    /// Adapter name used for registration and reporting.
    name: String,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl EncyclopediaClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://en.wikipedia.org/w/rest.php/v1";

    /// Raw credibility of a general reference encyclopedia.
    pub const RAW_CREDIBILITY: u8 = 85;

    /// Default number of search results requested per query.
    const DEFAULT_LIMIT: usize = 5;

    /// Creates a new encyclopedia client.
    #[must_use]
    pub fn new() -> Self {
        let endpoint = std::env::var("CROSSCHECK_ENCYCLOPEDIA_ENDPOINT")
            .unwrap_or_else(|_| Self::DEFAULT_ENDPOINT.to_string());

        Self {
            endpoint,
            name: "encyclopedia".to_string(),
            client: build_http_client(SourceHttpConfig::from_env()),
        }
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the adapter name (useful when registering several instances).
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets HTTP client timeouts for provider requests.
    #[must_use]
    pub fn with_http_config(mut self, config: SourceHttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    /// Makes a search request against the encyclopedia API.
    fn search(&self, term: &str, limit: usize) -> Result<SearchResponse> {
        let response = self
            .client
            .get(format!("{}/search/page", self.endpoint))
            .query(&[("q", term), ("limit", &limit.to_string())])
            .send()
            .map_err(|e| {
                let error_kind = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connect"
                } else if e.is_request() {
                    "request"
                } else {
                    "unknown"
                };
                tracing::error!(
                    source = %self.name,
                    error = %e,
                    error_kind = error_kind,
                    "Encyclopedia search request failed"
                );
                Error::OperationFailed {
                    operation: "encyclopedia_search".to_string(),
                    cause: format!("{error_kind} error: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            tracing::error!(
                source = %self.name,
                status = %status,
                body = %body,
                "Encyclopedia API returned error status"
            );
            return Err(Error::OperationFailed {
                operation: "encyclopedia_search".to_string(),
                cause: format!("API returned status: {status} - {body}"),
            });
        }

        response.json().map_err(|e| {
            tracing::error!(
                source = %self.name,
                error = %e,
                "Failed to parse encyclopedia response"
            );
            Error::OperationFailed {
                operation: "encyclopedia_response".to_string(),
                cause: e.to_string(),
            }
        })
    }

    /// Maps search pages into a source result.
    ///
    /// Confidence scales with the number of matching articles, capped at 80:
    /// a general encyclopedia match is corroborating, never conclusive.
    fn to_result(&self, pages: Vec<SearchPage>) -> SourceResult {
        if pages.is_empty() {
            return SourceResult::new(false, 20)
                .with_evidence("No encyclopedia articles matched the statement");
        }

        #[allow(clippy::cast_possible_truncation)]
        let confidence = (50 + pages.len() * 10).min(80) as u8;
        let mut result = SourceResult::new(true, confidence);
        for page in pages {
            if let Some(excerpt) = page.excerpt.as_deref() {
                result = result.with_evidence(strip_markup(excerpt));
            }
            let url = format!(
                "https://en.wikipedia.org/wiki/{}",
                page.key.replace(' ', "_")
            );
            result = result.with_source(
                Source::new(
                    page.key.clone(),
                    page.title,
                    SourceCategory::ReferenceEncyclopedia,
                )
                .with_url(url)
                .with_credibility(Self::RAW_CREDIBILITY),
            );
        }
        result
    }
}

impl Default for EncyclopediaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeSource for EncyclopediaClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn raw_credibility(&self) -> u8 {
        Self::RAW_CREDIBILITY
    }

    fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/search/page", self.endpoint))
            .query(&[("q", "ping"), ("limit", "1")])
            .send()
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn query(&self, query: &KnowledgeQuery) -> Result<SourceResult> {
        let limit = query.max_results.unwrap_or(Self::DEFAULT_LIMIT).max(1);
        let response = self.search(&query.statement, limit)?;
        Ok(self.to_result(response.pages))
    }
}

/// Strips the search-match markup the API embeds in excerpts.
fn strip_markup(excerpt: &str) -> String {
    excerpt
        .replace("<span class=\"searchmatch\">", "")
        .replace("</span>", "")
}

/// Response from the search API.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    pages: Vec<SearchPage>,
}

/// One matching page in a search response.
#[derive(Debug, Deserialize)]
struct SearchPage {
    key: String,
    title: String,
    excerpt: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = EncyclopediaClient::new().with_endpoint("http://localhost:9999");
        assert_eq!(client.name(), "encyclopedia");
        assert_eq!(client.raw_credibility(), 85);
    }

    #[test]
    fn test_to_result_empty_pages() {
        let client = EncyclopediaClient::new();
        let result = client.to_result(vec![]);
        assert!(!result.supported);
        assert_eq!(result.confidence, 20);
        assert!(result.sources.is_empty());
    }

    #[test]
    fn test_to_result_confidence_capped() {
        let client = EncyclopediaClient::new();
        let pages = (0..10)
            .map(|i| SearchPage {
                key: format!("Page_{i}"),
                title: format!("Page {i}"),
                excerpt: Some("An <span class=\"searchmatch\">excerpt</span>".to_string()),
            })
            .collect();
        let result = client.to_result(pages);
        assert!(result.supported);
        assert_eq!(result.confidence, 80);
        assert_eq!(result.sources.len(), 10);
        assert_eq!(result.evidence[0], "An excerpt");
    }

    #[test]
    fn test_strip_markup() {
        let excerpt = "The <span class=\"searchmatch\">Eiffel</span> Tower";
        assert_eq!(strip_markup(excerpt), "The Eiffel Tower");
    }
}
