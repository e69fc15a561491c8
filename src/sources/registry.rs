//! Authoritative-registry adapter.
//!
//! Queries an official registry API (government datasets, company registers,
//! statutory records) and maps verified records into evidence.

use super::{KnowledgeSource, SourceHttpConfig, build_http_client};
use crate::models::{KnowledgeQuery, Source, SourceCategory, SourceResult};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Authoritative-registry knowledge source.
pub struct GovernmentRegistryClient {
    /// API endpoint.
    endpoint: String,
    /// API key, if the registry requires one.
    api_key: Option<String>,
    /// Adapter name used for registration and reporting.
    name: String,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl GovernmentRegistryClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.data.gov/v1";

    /// Raw credibility of an authoritative registry.
    pub const RAW_CREDIBILITY: u8 = 92;

    /// Default number of records requested per query.
    const DEFAULT_LIMIT: usize = 3;

    /// Creates a new registry client.
    ///
    /// Reads `CROSSCHECK_REGISTRY_ENDPOINT` and `CROSSCHECK_REGISTRY_API_KEY`
    /// from the environment.
    #[must_use]
    pub fn new() -> Self {
        let endpoint = std::env::var("CROSSCHECK_REGISTRY_ENDPOINT")
            .unwrap_or_else(|_| Self::DEFAULT_ENDPOINT.to_string());
        let api_key = std::env::var("CROSSCHECK_REGISTRY_API_KEY").ok();

        Self {
            endpoint,
            api_key,
            name: "government-registry".to_string(),
            client: build_http_client(SourceHttpConfig::from_env()),
        }
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the adapter name.
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

    /// Looks up registry records matching the statement.
    fn lookup(&self, term: &str, limit: usize) -> Result<LookupResponse> {
        let mut request = self
            .client
            .get(format!("{}/records", self.endpoint))
            .query(&[("search", term), ("limit", &limit.to_string())]);
        if let Some(key) = self.api_key.as_deref() {
            request = request.header("X-Api-Key", key);
        }

        let response = request.send().map_err(|e| {
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
                "Registry lookup request failed"
            );
            Error::OperationFailed {
                operation: "registry_lookup".to_string(),
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
                "Registry API returned error status"
            );
            return Err(Error::OperationFailed {
                operation: "registry_lookup".to_string(),
                cause: format!("API returned status: {status} - {body}"),
            });
        }

        response.json().map_err(|e| {
            tracing::error!(
                source = %self.name,
                error = %e,
                "Failed to parse registry response"
            );
            Error::OperationFailed {
                operation: "registry_response".to_string(),
                cause: e.to_string(),
            }
        })
    }

    /// Maps registry records into a source result.
    ///
    /// Registry records are authoritative: any verified match yields high
    /// confidence, and records explicitly marked contradicting are surfaced
    /// as contradictions.
    fn to_result(&self, records: Vec<RegistryRecord>) -> SourceResult {
        if records.is_empty() {
            return SourceResult::new(false, 30)
                .with_evidence("No registry records matched the statement");
        }

        let any_contradicting = records.iter().any(|r| r.status == RecordStatus::Contradicts);
        let all_verified = records.iter().all(|r| r.verified_at.is_some());
        let confidence = if any_contradicting {
            88
        } else if all_verified {
            95
        } else {
            75
        };

        let mut result = SourceResult::new(!any_contradicting, confidence);
        for record in records {
            let line = format!("{}: {}", record.register, record.summary);
            result = match record.status {
                RecordStatus::Contradicts => result.with_contradiction(line),
                RecordStatus::Confirms | RecordStatus::Related => result.with_evidence(line),
            };

            let mut source = Source::new(
                record.id,
                record.summary,
                SourceCategory::GovernmentRegistry,
            )
            .with_credibility(Self::RAW_CREDIBILITY);
            if let Some(url) = record.url {
                source = source.with_url(url);
            }
            if let Some(at) = record.published_at {
                source = source.with_published_at(at);
            }
            if let Some(at) = record.verified_at {
                source = source.with_verified_at(at);
            }
            result = result.with_source(source);
        }
        result
    }
}

impl Default for GovernmentRegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeSource for GovernmentRegistryClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn raw_credibility(&self) -> u8 {
        Self::RAW_CREDIBILITY
    }

    fn is_available(&self) -> bool {
        let mut request = self.client.get(format!("{}/health", self.endpoint));
        if let Some(key) = self.api_key.as_deref() {
            request = request.header("X-Api-Key", key);
        }
        request
            .send()
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn query(&self, query: &KnowledgeQuery) -> Result<SourceResult> {
        let limit = query.max_results.unwrap_or(Self::DEFAULT_LIMIT).max(1);
        let response = self.lookup(&query.statement, limit)?;
        Ok(self.to_result(response.records))
    }
}

/// Response from the records API.
#[derive(Debug, Deserialize)]
struct LookupResponse {
    records: Vec<RegistryRecord>,
}

/// One record in a lookup response.
#[derive(Debug, Deserialize)]
struct RegistryRecord {
    id: String,
    register: String,
    summary: String,
    status: RecordStatus,
    url: Option<String>,
    published_at: Option<DateTime<Utc>>,
    verified_at: Option<DateTime<Utc>>,
}

/// How a record relates to the searched statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RecordStatus {
    Confirms,
    Contradicts,
    Related,
}
