//! Source reliability registry.
//!
//! Holds, per adapter, a base trust weight and optional per-domain overrides,
//! and adjusts them from verification feedback. The registry is an explicit,
//! constructible object so tests and callers can hold isolated instances;
//! there is no process-global state.

use crate::sources::KnowledgeSource;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Additive weight adjustment applied per feedback event.
///
/// The fixed step size is a behavioral contract: callers and their audit
/// trails rely on the exact resulting deltas.
pub const FEEDBACK_STEP: f64 = 0.05;

/// Neutral weight assumed for an adapter with no recorded config.
///
/// Defensive default; registered adapters always carry a config.
pub const NEUTRAL_WEIGHT: f64 = 0.5;

/// Direction of a feedback event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackPolarity {
    /// The adapter's verdict turned out correct.
    Positive,
    /// The adapter's verdict turned out incorrect.
    Negative,
}

/// Per-adapter reliability configuration.
///
/// Every weight value is clamped to `[0, 1]` at all times: on construction,
/// on explicit override, and after each feedback adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    /// Base trust weight in `[0, 1]`.
    pub base_weight: f64,
    /// Per-domain trust overrides, each in `[0, 1]`.
    pub domain_weights: HashMap<String, f64>,
    /// Whether the adapter participates in consolidation.
    pub enabled: bool,
}

impl ReliabilityConfig {
    /// Creates a config with the given base weight, clamped to `[0, 1]`.
    #[must_use]
    pub fn new(base_weight: f64) -> Self {
        Self {
            base_weight: clamp_weight(base_weight),
            domain_weights: HashMap::new(),
            enabled: true,
        }
    }

    /// Derives the default config for an adapter: `raw_credibility / 100`.
    #[must_use]
    pub fn for_source(source: &dyn KnowledgeSource) -> Self {
        Self::new(f64::from(source.raw_credibility()) / 100.0)
    }

    /// Adds a per-domain weight override, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_domain_weight(mut self, domain: impl Into<String>, weight: f64) -> Self {
        self.domain_weights
            .insert(domain.into(), clamp_weight(weight));
        self
    }

    /// Disables the adapter without deregistering it.
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// The effective weight for a domain: the override if present, else base.
    #[must_use]
    pub fn weight_for(&self, domain: Option<&str>) -> f64 {
        domain
            .and_then(|d| self.domain_weights.get(d).copied())
            .unwrap_or(self.base_weight)
    }
}

struct Entry {
    source: Arc<dyn KnowledgeSource>,
    config: ReliabilityConfig,
}

/// Registry of knowledge-source adapters and their reliability configs.
///
/// Reads during an in-flight consolidation are safe: the engine takes an
/// immutable snapshot of the registration set at call start, and all interior
/// state is guarded by an `RwLock`.
#[derive(Default)]
pub struct SourceReliabilityRegistry {
    // Vec keeps registration order, which sorted_by_reliability tie-breaks on.
    entries: RwLock<Vec<Entry>>,
}

impl SourceReliabilityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter with an optional reliability config.
    ///
    /// When `config` is omitted the default is derived from the adapter's raw
    /// credibility (`raw_credibility / 100`, no domain overrides, enabled).
    /// Re-registering a name replaces its adapter and config in place,
    /// keeping its original position in the registration order.
    pub fn register(&self, source: Arc<dyn KnowledgeSource>, config: Option<ReliabilityConfig>) {
        let mut config = config.unwrap_or_else(|| ReliabilityConfig::for_source(source.as_ref()));
        config.base_weight = clamp_weight(config.base_weight);
        for weight in config.domain_weights.values_mut() {
            *weight = clamp_weight(*weight);
        }

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let name = source.name().to_string();
        if let Some(entry) = entries.iter_mut().find(|e| e.source.name() == name) {
            entry.source = source;
            entry.config = config;
        } else {
            entries.push(Entry { source, config });
        }
        tracing::debug!(source = %name, "Registered knowledge source");
    }

    /// Removes an adapter and its config.
    pub fn deregister(&self, name: &str) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.retain(|e| e.source.name() != name);
        tracing::debug!(source = %name, "Deregistered knowledge source");
    }

    /// The effective weight for an adapter in the given domain.
    ///
    /// Returns the domain override if present, else the base weight, else
    /// [`NEUTRAL_WEIGHT`] for an unknown adapter.
    #[must_use]
    pub fn weight_for(&self, name: &str, domain: Option<&str>) -> f64 {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries
            .iter()
            .find(|e| e.source.name() == name)
            .map_or(NEUTRAL_WEIGHT, |e| e.config.weight_for(domain))
    }

    /// Nudges an adapter's weight from a feedback event.
    ///
    /// The domain override is adjusted when `domain` is given (created from
    /// the current effective weight if absent), else the base weight. The
    /// step is a fixed ±[`FEEDBACK_STEP`], clamped to `[0, 1]`. Unknown
    /// adapter names are ignored.
    pub fn update_from_feedback(
        &self,
        name: &str,
        polarity: FeedbackPolarity,
        domain: Option<&str>,
    ) {
        let step = match polarity {
            FeedbackPolarity::Positive => FEEDBACK_STEP,
            FeedbackPolarity::Negative => -FEEDBACK_STEP,
        };

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some(entry) = entries.iter_mut().find(|e| e.source.name() == name) else {
            tracing::warn!(source = %name, "Feedback for unknown source ignored");
            return;
        };

        let updated = if let Some(domain) = domain {
            let current = entry.config.weight_for(Some(domain));
            let next = clamp_weight(current + step);
            entry.config.domain_weights.insert(domain.to_string(), next);
            next
        } else {
            entry.config.base_weight = clamp_weight(entry.config.base_weight + step);
            entry.config.base_weight
        };
        tracing::debug!(
            source = %name,
            domain = domain.unwrap_or("-"),
            weight = updated,
            "Adjusted source reliability from feedback"
        );
    }

    /// Overrides an adapter's base weight, clamped to `[0, 1]`.
    ///
    /// Unknown adapter names are ignored.
    pub fn set_base_weight(&self, name: &str, weight: f64) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(entry) = entries.iter_mut().find(|e| e.source.name() == name) {
            entry.config.base_weight = clamp_weight(weight);
        }
    }

    /// All enabled adapters ordered by effective weight, descending.
    ///
    /// Ties keep registration order (stable sort); the fast-path selector
    /// relies on this ordering.
    #[must_use]
    pub fn sorted_by_reliability(&self, domain: Option<&str>) -> Vec<Arc<dyn KnowledgeSource>> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut weighted: Vec<_> = entries
            .iter()
            .filter(|e| e.config.enabled)
            .map(|e| (Arc::clone(&e.source), e.config.weight_for(domain)))
            .collect();
        weighted.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        weighted.into_iter().map(|(source, _)| source).collect()
    }

    /// Snapshot of all enabled adapters in registration order.
    ///
    /// The consolidation engine takes this once at call start so concurrent
    /// register/deregister calls cannot affect an in-flight query.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<dyn KnowledgeSource>> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries
            .iter()
            .filter(|e| e.config.enabled)
            .map(|e| Arc::clone(&e.source))
            .collect()
    }

    /// The reliability config recorded for an adapter, if registered.
    #[must_use]
    pub fn config_for(&self, name: &str) -> Option<ReliabilityConfig> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries
            .iter()
            .find(|e| e.source.name() == name)
            .map(|e| e.config.clone())
    }

    /// Number of registered adapters, including disabled ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether the registry has no adapters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Clamps a weight to `[0, 1]`; non-finite values collapse to 0.
fn clamp_weight(weight: f64) -> f64 {
    if weight.is_finite() {
        weight.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use crate::models::{KnowledgeQuery, SourceResult};

    struct StubSource {
        name: String,
        credibility: u8,
    }

    impl StubSource {
        fn arc(name: &str, credibility: u8) -> Arc<dyn KnowledgeSource> {
            Arc::new(Self {
                name: name.to_string(),
                credibility,
            })
        }
    }

    impl KnowledgeSource for StubSource {
        fn name(&self) -> &str {
            &self.name
        }

        fn raw_credibility(&self) -> u8 {
            self.credibility
        }

        fn is_available(&self) -> bool {
            true
        }

        fn query(&self, _query: &KnowledgeQuery) -> Result<SourceResult> {
            Ok(SourceResult::new(true, 50))
        }
    }

    #[test]
    fn test_register_derives_default_weight() {
        let registry = SourceReliabilityRegistry::new();
        registry.register(StubSource::arc("enc", 85), None);

        assert!((registry.weight_for("enc", None) - 0.85).abs() < f64::EPSILON);
    }

    #[test]
    fn test_weight_for_unknown_is_neutral() {
        let registry = SourceReliabilityRegistry::new();
        assert!((registry.weight_for("ghost", None) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_domain_override_beats_base() {
        let registry = SourceReliabilityRegistry::new();
        registry.register(
            StubSource::arc("enc", 85),
            Some(ReliabilityConfig::new(0.85).with_domain_weight("healthcare", 0.4)),
        );

        assert!((registry.weight_for("enc", Some("healthcare")) - 0.4).abs() < f64::EPSILON);
        assert!((registry.weight_for("enc", Some("legal")) - 0.85).abs() < f64::EPSILON);
    }

    #[test]
    fn test_feedback_nudges_base_weight() {
        let registry = SourceReliabilityRegistry::new();
        registry.register(StubSource::arc("enc", 50), None);

        registry.update_from_feedback("enc", FeedbackPolarity::Positive, None);
        assert!((registry.weight_for("enc", None) - 0.55).abs() < 1e-9);

        registry.update_from_feedback("enc", FeedbackPolarity::Negative, None);
        registry.update_from_feedback("enc", FeedbackPolarity::Negative, None);
        assert!((registry.weight_for("enc", None) - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_feedback_creates_domain_override_from_effective_weight() {
        let registry = SourceReliabilityRegistry::new();
        registry.register(StubSource::arc("enc", 80), None);

        registry.update_from_feedback("enc", FeedbackPolarity::Negative, Some("legal"));
        assert!((registry.weight_for("enc", Some("legal")) - 0.75).abs() < 1e-9);
        // Base weight untouched.
        assert!((registry.weight_for("enc", None) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_feedback_clamps_at_bounds() {
        let registry = SourceReliabilityRegistry::new();
        registry.register(StubSource::arc("hi", 100), None);
        registry.register(StubSource::arc("lo", 0), None);

        for _ in 0..5 {
            registry.update_from_feedback("hi", FeedbackPolarity::Positive, None);
            registry.update_from_feedback("lo", FeedbackPolarity::Negative, None);
        }
        assert!((registry.weight_for("hi", None) - 1.0).abs() < f64::EPSILON);
        assert!(registry.weight_for("lo", None).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sorted_by_reliability_descending_stable() {
        let registry = SourceReliabilityRegistry::new();
        registry.register(StubSource::arc("a", 70), None);
        registry.register(StubSource::arc("b", 90), None);
        registry.register(StubSource::arc("c", 70), None);

        let names: Vec<String> = registry
            .sorted_by_reliability(None)
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        // b first, then a and c tie in registration order.
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_sorted_by_reliability_uses_domain_override() {
        let registry = SourceReliabilityRegistry::new();
        registry.register(StubSource::arc("a", 90), None);
        registry.register(
            StubSource::arc("b", 70),
            Some(ReliabilityConfig::new(0.7).with_domain_weight("financial", 0.95)),
        );

        let names: Vec<String> = registry
            .sorted_by_reliability(Some("financial"))
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_disabled_sources_excluded_from_snapshot() {
        let registry = SourceReliabilityRegistry::new();
        registry.register(StubSource::arc("a", 80), None);
        registry.register(
            StubSource::arc("b", 80),
            Some(ReliabilityConfig::new(0.8).disabled()),
        );

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name(), "a");
        assert!(registry.sorted_by_reliability(None).len() == 1);
        // Still counted as registered.
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_deregister_removes_entry() {
        let registry = SourceReliabilityRegistry::new();
        registry.register(StubSource::arc("a", 80), None);
        registry.deregister("a");

        assert!(registry.is_empty());
        assert!(registry.config_for("a").is_none());
    }

    #[test]
    fn test_reregister_replaces_in_place() {
        let registry = SourceReliabilityRegistry::new();
        registry.register(StubSource::arc("a", 80), None);
        registry.register(StubSource::arc("b", 80), None);
        registry.register(StubSource::arc("a", 80), Some(ReliabilityConfig::new(0.2)));

        let snapshot = registry.snapshot();
        assert_eq!(snapshot[0].name(), "a");
        assert!((registry.weight_for("a", None) - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_register_clamps_supplied_config() {
        let registry = SourceReliabilityRegistry::new();
        registry.register(
            StubSource::arc("a", 80),
            Some(ReliabilityConfig {
                base_weight: 7.5,
                domain_weights: HashMap::from([("x".to_string(), -2.0)]),
                enabled: true,
            }),
        );

        assert!((registry.weight_for("a", None) - 1.0).abs() < f64::EPSILON);
        assert!(registry.weight_for("a", Some("x")).abs() < f64::EPSILON);
    }
}
