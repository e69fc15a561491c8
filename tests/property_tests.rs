//! Property-based tests for reliability weights and consolidation.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Weights stay within [0, 1] under any feedback sequence
//! - Fused confidence is always a valid percentage
//! - The supported flag is exactly a strict weighted majority
//! - Deduplication is stable and key-unique

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use crosscheck::{
    ConsolidationEngine, FeedbackPolarity, KnowledgeQuery, KnowledgeSource, ReliabilityConfig,
    Source, SourceCategory, SourceReliabilityRegistry, SourceResult, dedup_sources,
};
use proptest::prelude::*;
use std::sync::Arc;

struct FixedSource {
    name: String,
    result: SourceResult,
}

impl KnowledgeSource for FixedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn raw_credibility(&self) -> u8 {
        50
    }

    fn is_available(&self) -> bool {
        true
    }

    fn query(&self, _query: &KnowledgeQuery) -> crosscheck::Result<SourceResult> {
        Ok(self.result.clone())
    }
}

fn feedback_event() -> impl Strategy<Value = (bool, Option<String>)> {
    (any::<bool>(), proptest::option::of("[a-z]{1,8}"))
}

proptest! {
    /// Property: any sequence of feedback events keeps every weight in [0, 1].
    #[test]
    fn prop_feedback_keeps_weights_clamped(
        base in 0.0_f64..=1.0,
        events in proptest::collection::vec(feedback_event(), 0..60),
    ) {
        let registry = SourceReliabilityRegistry::new();
        registry.register(
            Arc::new(FixedSource {
                name: "s".to_string(),
                result: SourceResult::new(true, 50),
            }),
            Some(ReliabilityConfig::new(base)),
        );

        let mut domains_seen = Vec::new();
        for (positive, domain) in &events {
            let polarity = if *positive {
                FeedbackPolarity::Positive
            } else {
                FeedbackPolarity::Negative
            };
            registry.update_from_feedback("s", polarity, domain.as_deref());
            if let Some(domain) = domain {
                domains_seen.push(domain.clone());
            }

            let base_weight = registry.weight_for("s", None);
            prop_assert!((0.0..=1.0).contains(&base_weight));
            for d in &domains_seen {
                let w = registry.weight_for("s", Some(d));
                prop_assert!((0.0..=1.0).contains(&w));
            }
        }
    }

    /// Property: feedback moves the base weight by exactly ±0.05 (modulo clamping).
    #[test]
    fn prop_feedback_step_is_fixed(base in 0.0_f64..=1.0, positive in any::<bool>()) {
        let registry = SourceReliabilityRegistry::new();
        registry.register(
            Arc::new(FixedSource {
                name: "s".to_string(),
                result: SourceResult::new(true, 50),
            }),
            Some(ReliabilityConfig::new(base)),
        );

        let polarity = if positive {
            FeedbackPolarity::Positive
        } else {
            FeedbackPolarity::Negative
        };
        registry.update_from_feedback("s", polarity, None);

        let step = if positive { 0.05 } else { -0.05 };
        let expected = (base + step).clamp(0.0, 1.0);
        prop_assert!((registry.weight_for("s", None) - expected).abs() < 1e-9);
    }

    /// Property: fused confidence is always 0-100, query time is never zero,
    /// and the supported flag is exactly a strict weighted majority.
    #[test]
    fn prop_fusion_is_bounded_and_strict(
        answers in proptest::collection::vec(
            (0.0_f64..=1.0, 0u8..=100, any::<bool>()),
            1..6,
        ),
    ) {
        let engine = ConsolidationEngine::new();
        for (i, (weight, confidence, supported)) in answers.iter().enumerate() {
            engine.register(
                Arc::new(FixedSource {
                    name: format!("s{i}"),
                    result: SourceResult::new(*supported, *confidence),
                }),
                Some(ReliabilityConfig::new(*weight)),
            );
        }

        let result = engine.query_all(&KnowledgeQuery::new("statement")).unwrap();

        prop_assert!(result.confidence <= 100);
        prop_assert!(result.query_time_ms >= 1);
        prop_assert_eq!(result.consulted.len(), answers.len());

        let total: f64 = answers.iter().map(|(w, _, _)| w).sum();
        let supporting: f64 = answers
            .iter()
            .filter(|(_, _, s)| *s)
            .map(|(w, _, _)| w)
            .sum();
        prop_assert_eq!(result.supported, supporting > total / 2.0);
    }

    /// Property: dedup output is key-unique and a stable subsequence of its input.
    #[test]
    fn prop_dedup_stable_and_unique(
        records in proptest::collection::vec(
            ("[a-c]{1}", proptest::option::of("[a-c]{1}"), 0usize..3),
            0..20,
        ),
    ) {
        let categories = [
            SourceCategory::ReferenceEncyclopedia,
            SourceCategory::GovernmentRegistry,
            SourceCategory::News,
        ];
        let sources: Vec<Source> = records
            .iter()
            .enumerate()
            .map(|(i, (title, url, cat))| {
                let mut s = Source::new(format!("id{i}"), title.clone(), categories[*cat].clone());
                if let Some(url) = url {
                    s = s.with_url(url.clone());
                }
                s
            })
            .collect();

        let deduped = dedup_sources(sources.clone());

        prop_assert!(deduped.len() <= sources.len());

        let keys: Vec<String> = deduped.iter().map(Source::dedup_key).collect();
        let mut unique = keys.clone();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(keys.len(), unique.len(), "dedup keys must be unique");

        // First occurrence wins: each kept record is the earliest with its key.
        for kept in &deduped {
            let first = sources
                .iter()
                .find(|s| s.dedup_key() == kept.dedup_key())
                .unwrap();
            prop_assert_eq!(&first.id, &kept.id);
        }
    }
}
