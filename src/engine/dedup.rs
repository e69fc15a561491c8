//! Source deduplication.

use crate::models::Source;
use std::collections::HashSet;

/// Deduplicates evidence records, first occurrence wins.
///
/// The key is `(url or title) + category`: the same article surfaced by two
/// adapters collapses into one entry, while records that share a URL but
/// differ in category stay distinct. Order is stable.
#[must_use]
pub fn dedup_sources(sources: Vec<Source>) -> Vec<Source> {
    let mut seen = HashSet::with_capacity(sources.len());
    sources
        .into_iter()
        .filter(|source| seen.insert(source.dedup_key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceCategory;

    fn source(id: &str, title: &str, url: Option<&str>, category: SourceCategory) -> Source {
        let mut s = Source::new(id, title, category);
        if let Some(url) = url {
            s = s.with_url(url);
        }
        s
    }

    #[test]
    fn test_same_url_and_category_collapse() {
        let a = source(
            "a",
            "Tower",
            Some("https://w.org/tower"),
            SourceCategory::ReferenceEncyclopedia,
        );
        let b = source(
            "b",
            "Eiffel Tower",
            Some("https://w.org/tower"),
            SourceCategory::ReferenceEncyclopedia,
        );

        let deduped = dedup_sources(vec![a, b]);
        assert_eq!(deduped.len(), 1);
        // First occurrence wins.
        assert_eq!(deduped[0].id, "a");
    }

    #[test]
    fn test_same_url_different_category_kept() {
        let a = source(
            "a",
            "Tower",
            Some("https://w.org/tower"),
            SourceCategory::ReferenceEncyclopedia,
        );
        let b = source("b", "Tower", Some("https://w.org/tower"), SourceCategory::News);

        assert_eq!(dedup_sources(vec![a, b]).len(), 2);
    }

    #[test]
    fn test_title_used_when_url_missing() {
        let a = source("a", "Annual Report", None, SourceCategory::GovernmentRegistry);
        let b = source("b", "Annual Report", None, SourceCategory::GovernmentRegistry);
        let c = source("c", "Quarterly Report", None, SourceCategory::GovernmentRegistry);

        let deduped = dedup_sources(vec![a, b, c]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].id, "a");
        assert_eq!(deduped[1].id, "c");
    }

    #[test]
    fn test_empty_input() {
        assert!(dedup_sources(Vec::new()).is_empty());
    }
}
