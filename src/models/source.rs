//! Evidence source records returned by knowledge-source adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of an evidence source.
///
/// Categories participate in source deduplication: two records with the same
/// URL but different categories are distinct evidence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceCategory {
    /// A general reference encyclopedia (e.g. a wiki article).
    ReferenceEncyclopedia,
    /// An authoritative government registry or official dataset.
    GovernmentRegistry,
    /// A peer-reviewed or academic publication.
    Academic,
    /// A news article.
    News,
    /// Any other provider-defined category.
    Custom(String),
}

impl SourceCategory {
    /// Returns the canonical string form of the category.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ReferenceEncyclopedia => "reference-encyclopedia",
            Self::GovernmentRegistry => "government-registry",
            Self::Academic => "academic",
            Self::News => "news",
            Self::Custom(name) => name.as_str(),
        }
    }

    /// Parses a category from its string form (case-insensitive).
    ///
    /// Unknown strings become [`SourceCategory::Custom`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "reference-encyclopedia" => Self::ReferenceEncyclopedia,
            "government-registry" => Self::GovernmentRegistry,
            "academic" => Self::Academic,
            "news" => Self::News,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl std::fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable reference to external evidence.
///
/// Created by an adapter when it returns evidence; never mutated after
/// creation; owned by the result that carries it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Stable identifier within the originating provider.
    pub id: String,
    /// Display title of the record.
    pub title: String,
    /// Category of the record.
    pub category: SourceCategory,
    /// Canonical URL, if the provider exposes one.
    pub url: Option<String>,
    /// When the record was published.
    pub published_at: Option<DateTime<Utc>>,
    /// When the record was last verified by the provider.
    pub verified_at: Option<DateTime<Utc>>,
    /// Raw credibility score of the record (0-100).
    pub credibility: u8,
}

impl Source {
    /// Creates a new source record.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>, category: SourceCategory) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category,
            url: None,
            published_at: None,
            verified_at: None,
            credibility: 50,
        }
    }

    /// Sets the canonical URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the publish timestamp.
    #[must_use]
    pub const fn with_published_at(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    /// Sets the verification timestamp.
    #[must_use]
    pub const fn with_verified_at(mut self, at: DateTime<Utc>) -> Self {
        self.verified_at = Some(at);
        self
    }

    /// Sets the raw credibility score, clamped to 0-100.
    #[must_use]
    pub fn with_credibility(mut self, credibility: u8) -> Self {
        self.credibility = credibility.min(100);
        self
    }

    /// The deduplication key for this source: `(url or title) + category`.
    ///
    /// Two records sharing a key are treated as the same piece of evidence.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        let locator = self.url.as_deref().unwrap_or(&self.title);
        format!("{locator}|{}", self.category)
    }
}
