//! Multi-source consolidation engine.
//!
//! Fans a verification query out to every registered knowledge source,
//! weights each answer by the source's domain-aware reliability, and folds
//! the answers into one consolidated verdict. Per-source isolation is the
//! central resilience contract: one failing provider never fails the whole
//! verification.

mod dedup;

pub use dedup::dedup_sources;

use crate::config::EngineConfig;
use crate::models::{ConsolidatedResult, KnowledgeQuery, Source, SourceResult};
use crate::reliability::{FeedbackPolarity, ReliabilityConfig, SourceReliabilityRegistry};
use crate::sources::KnowledgeSource;
use crate::Result;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Fast-path confidence threshold.
///
/// `query_best` returns as soon as one source answers with confidence
/// strictly above this value; fixed by design to avoid unnecessary calls to
/// lower-trust sources.
pub const FAST_PATH_CONFIDENCE_THRESHOLD: u8 = 70;

/// Evidence message synthesized when no source can be reached and fallback is
/// enabled.
const FALLBACK_EVIDENCE: &str = "No external sources available for verification";

/// The consolidation engine.
///
/// Stateless per query: only the reliability registry persists across calls.
/// The registry may be shared with other engines or mutated concurrently;
/// each query operates on an immutable snapshot of the registration set taken
/// at call start.
pub struct ConsolidationEngine {
    registry: Arc<SourceReliabilityRegistry>,
    fallback_enabled: AtomicBool,
}

impl Default for ConsolidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsolidationEngine {
    /// Creates an engine with an empty registry and default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an engine with an empty registry and the given configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_registry(Arc::new(SourceReliabilityRegistry::new()), config)
    }

    /// Creates an engine over an existing (possibly shared) registry.
    #[must_use]
    pub const fn with_registry(
        registry: Arc<SourceReliabilityRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            fallback_enabled: AtomicBool::new(config.fallback_enabled),
        }
    }

    /// The underlying reliability registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<SourceReliabilityRegistry> {
        &self.registry
    }

    /// Registers a knowledge source with an optional reliability config.
    pub fn register(&self, source: Arc<dyn KnowledgeSource>, config: Option<ReliabilityConfig>) {
        self.registry.register(source, config);
    }

    /// Removes a knowledge source.
    pub fn deregister(&self, name: &str) {
        self.registry.deregister(name);
    }

    /// Adjusts a source's reliability weight from verification feedback.
    pub fn update_from_feedback(
        &self,
        name: &str,
        polarity: FeedbackPolarity,
        domain: Option<&str>,
    ) {
        self.registry.update_from_feedback(name, polarity, domain);
    }

    /// Enables or disables the synthesized fallback evidence message.
    pub fn set_fallback_enabled(&self, enabled: bool) {
        self.fallback_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Queries every registered source and fuses the answers.
    ///
    /// Availability checks and queries run as independent parallel
    /// operations, joined before fusion; a source that reports unavailable,
    /// fails, or panics lands in the result's unavailable list without
    /// aborting the others. Zero responders yield the conservative fallback
    /// verdict instead of an error.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] for a malformed query, before
    /// any network activity. Individual source faults never propagate.
    pub fn query_all(&self, query: &KnowledgeQuery) -> Result<ConsolidatedResult> {
        query.validate()?;
        let started = Instant::now();
        let span = tracing::info_span!(
            "consolidation.query_all",
            domain = query.domain.as_deref().unwrap_or("-"),
            sources = tracing::field::Empty,
        );
        let _enter = span.enter();
        metrics::counter!("consolidation_queries_total", "path" => "all").increment(1);

        let snapshot = self.registry.snapshot();
        let outcomes = fan_out(&snapshot, query);

        let mut consulted = Vec::new();
        let mut unavailable = Vec::new();
        let mut responded = Vec::new();
        for (name, outcome) in outcomes {
            match outcome {
                Some(result) => {
                    consulted.push(name.clone());
                    responded.push((name, result));
                },
                None => unavailable.push(name),
            }
        }
        span.record("sources", responded.len());

        if responded.is_empty() {
            metrics::counter!("consolidation_fallbacks_total").increment(1);
            tracing::warn!(
                unavailable = unavailable.len(),
                "No sources answered; returning conservative fallback"
            );
            return Ok(self.fallback_result(unavailable, started));
        }

        let result = self.fuse(query, responded, consulted, unavailable, started);
        metrics::histogram!("consolidation_query_duration_ms", "path" => "all")
            .record(elapsed_ms_f64(started));
        Ok(result)
    }

    /// Queries sources sequentially in reliability order, returning as soon
    /// as one answers with confidence above
    /// [`FAST_PATH_CONFIDENCE_THRESHOLD`].
    ///
    /// Sources whose availability check fails are skipped, not counted as
    /// failures. When no source clears the threshold, or all are unavailable
    /// or erroring, the call falls back to a fresh [`Self::query_all`] as a
    /// correctness backstop (no partial reuse of the walk's attempts).
    ///
    /// The short-circuit result reports reliability weight **1.0** for the
    /// winning source regardless of its configured weight. Downstream
    /// consumers depend on this shape; do not silently correct it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] for a malformed query, before
    /// any network activity. Individual source faults never propagate.
    pub fn query_best(&self, query: &KnowledgeQuery) -> Result<ConsolidatedResult> {
        query.validate()?;
        let started = Instant::now();
        let span = tracing::info_span!(
            "consolidation.query_best",
            domain = query.domain.as_deref().unwrap_or("-"),
            winner = tracing::field::Empty,
        );
        let _enter = span.enter();
        metrics::counter!("consolidation_queries_total", "path" => "best").increment(1);

        let ordered = self.registry.sorted_by_reliability(query.domain.as_deref());
        let mut failed = Vec::new();
        for source in ordered {
            let name = source.name().to_string();
            if !probe_available(source.as_ref()) {
                tracing::debug!(source = %name, "Skipping unavailable source on fast path");
                continue;
            }
            let Some(result) = run_query(source.as_ref(), query) else {
                failed.push(name);
                continue;
            };
            if result.confidence > FAST_PATH_CONFIDENCE_THRESHOLD {
                span.record("winner", name.as_str());
                metrics::counter!("consolidation_fast_path_hits_total").increment(1);
                metrics::histogram!("consolidation_query_duration_ms", "path" => "best")
                    .record(elapsed_ms_f64(started));
                return Ok(single_source_result(&name, result, failed, started));
            }
            tracing::debug!(
                source = %name,
                confidence = result.confidence,
                "Fast-path answer below threshold; trying next source"
            );
        }

        // Correctness backstop: nothing cleared the threshold, so consult
        // everyone from scratch.
        self.query_all(query)
    }

    /// Weighted fusion over the responding sources.
    fn fuse(
        &self,
        query: &KnowledgeQuery,
        responded: Vec<(String, SourceResult)>,
        consulted: Vec<String>,
        unavailable: Vec<String>,
        started: Instant,
    ) -> ConsolidatedResult {
        let domain = query.domain.as_deref();

        let mut total_weight = 0.0_f64;
        let mut supporting_weight = 0.0_f64;
        let mut weighted_confidence = 0.0_f64;
        let mut source_weights = HashMap::with_capacity(responded.len());
        let mut evidence = Vec::new();
        let mut seen_evidence = HashSet::new();
        let mut contradictions = Vec::new();
        let mut seen_contradictions = HashSet::new();
        let mut all_sources: Vec<Source> = Vec::new();

        for (name, result) in responded {
            let weight = self.registry.weight_for(&name, domain);
            total_weight += weight;
            weighted_confidence += f64::from(result.confidence) * weight;
            if result.supported {
                supporting_weight += weight;
            }
            source_weights.insert(name, weight);

            for line in result.evidence {
                if seen_evidence.insert(line.clone()) {
                    evidence.push(line);
                }
            }
            for line in result.contradictions {
                if seen_contradictions.insert(line.clone()) {
                    contradictions.push(line);
                }
            }
            all_sources.extend(result.sources);
        }

        let confidence = if total_weight > 0.0 {
            round_confidence(weighted_confidence / total_weight)
        } else {
            0
        };
        // Strict weighted majority; an exact tie resolves to false.
        let supported = supporting_weight > total_weight / 2.0;

        ConsolidatedResult {
            supported,
            confidence,
            evidence,
            contradictions,
            sources: dedup_sources(all_sources),
            source_weights,
            consulted,
            unavailable,
            query_time_ms: elapsed_ms(started),
        }
    }

    /// The conservative verdict when zero sources answered.
    fn fallback_result(&self, unavailable: Vec<String>, started: Instant) -> ConsolidatedResult {
        let evidence = if self.fallback_enabled.load(Ordering::Relaxed) {
            vec![FALLBACK_EVIDENCE.to_string()]
        } else {
            Vec::new()
        };
        ConsolidatedResult {
            supported: false,
            confidence: 0,
            evidence,
            contradictions: Vec::new(),
            sources: Vec::new(),
            source_weights: HashMap::new(),
            consulted: Vec::new(),
            unavailable,
            query_time_ms: elapsed_ms(started),
        }
    }
}

/// Builds the fast-path verdict from the winning source's answer.
fn single_source_result(
    name: &str,
    result: SourceResult,
    failed: Vec<String>,
    started: Instant,
) -> ConsolidatedResult {
    ConsolidatedResult {
        supported: result.supported,
        confidence: result.confidence,
        evidence: result.evidence,
        contradictions: result.contradictions,
        sources: dedup_sources(result.sources),
        // The winner is reported fully trusted on the fast path.
        source_weights: HashMap::from([(name.to_string(), 1.0)]),
        consulted: vec![name.to_string()],
        unavailable: failed,
        query_time_ms: elapsed_ms(started),
    }
}

/// Probes availability and queries every source in parallel.
///
/// One scoped thread per source; all are joined before this returns, so no
/// source's slowness or failure aborts another's. Panics from misbehaving
/// adapters are contained inside the worker.
fn fan_out(
    sources: &[Arc<dyn KnowledgeSource>],
    query: &KnowledgeQuery,
) -> Vec<(String, Option<SourceResult>)> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = sources
            .iter()
            .map(|source| {
                let name = source.name().to_string();
                let handle = scope.spawn(move || {
                    if !probe_available(source.as_ref()) {
                        return None;
                    }
                    run_query(source.as_ref(), query)
                });
                (name, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(name, handle)| {
                let outcome = handle.join().unwrap_or_default();
                (name, outcome)
            })
            .collect()
    })
}

/// Availability check with panic containment: any fault means unavailable.
fn probe_available(source: &dyn KnowledgeSource) -> bool {
    std::panic::catch_unwind(AssertUnwindSafe(|| source.is_available())).unwrap_or_else(|_| {
        tracing::warn!(source = %source.name(), "Availability check panicked");
        false
    })
}

/// Query with fault isolation: errors and panics collapse to `None`.
fn run_query(source: &dyn KnowledgeSource, query: &KnowledgeQuery) -> Option<SourceResult> {
    match std::panic::catch_unwind(AssertUnwindSafe(|| source.query(query))) {
        Ok(Ok(result)) => Some(result),
        Ok(Err(err)) => {
            tracing::warn!(source = %source.name(), error = %err, "Source query failed");
            metrics::counter!(
                "consolidation_source_failures_total",
                "source" => source.name().to_string()
            )
            .increment(1);
            None
        },
        Err(_) => {
            tracing::warn!(source = %source.name(), "Source query panicked");
            metrics::counter!(
                "consolidation_source_failures_total",
                "source" => source.name().to_string()
            )
            .increment(1);
            None
        },
    }
}

/// Rounds a fused confidence into the 0-100 range.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_confidence(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

/// Elapsed wall-clock milliseconds, floored at 1.
fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis())
        .unwrap_or(u64::MAX)
        .max(1)
}

fn elapsed_ms_f64(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
