//! Circuit-breaking wrapper for knowledge-source adapters.
//!
//! Decorates any [`KnowledgeSource`] with a circuit breaker, retry-on-timeout
//! and request instrumentation. While the circuit is open the wrapper reports
//! itself unavailable, so the consolidation engine's normal skip logic
//! applies without special-casing.

use super::KnowledgeSource;
use crate::models::{KnowledgeQuery, SourceResult};
use crate::{Error, Result};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Resilience configuration for adapter calls.
#[derive(Debug, Clone)]
pub struct ResilienceConfig {
    /// Maximum number of retries for retryable failures.
    pub max_retries: u32,
    /// Backoff between retries in milliseconds.
    pub retry_backoff_ms: u64,
    /// Consecutive failures before opening the circuit.
    pub breaker_failure_threshold: u32,
    /// How long to keep the circuit open before half-open.
    pub breaker_reset_timeout_ms: u64,
    /// Maximum trial calls while half-open.
    pub breaker_half_open_max_calls: u32,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            retry_backoff_ms: 100,
            breaker_failure_threshold: 3,
            breaker_reset_timeout_ms: 30_000,
            breaker_half_open_max_calls: 1,
        }
    }
}

impl ResilienceConfig {
    /// Loads resilience configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("CROSSCHECK_SOURCE_MAX_RETRIES") {
            if let Ok(parsed) = v.parse::<u32>() {
                self.max_retries = parsed;
            }
        }
        if let Ok(v) = std::env::var("CROSSCHECK_SOURCE_RETRY_BACKOFF_MS") {
            if let Ok(parsed) = v.parse::<u64>() {
                self.retry_backoff_ms = parsed;
            }
        }
        if let Ok(v) = std::env::var("CROSSCHECK_SOURCE_BREAKER_FAILURE_THRESHOLD") {
            if let Ok(parsed) = v.parse::<u32>() {
                self.breaker_failure_threshold = parsed.max(1);
            }
        }
        if let Ok(v) = std::env::var("CROSSCHECK_SOURCE_BREAKER_RESET_MS") {
            if let Ok(parsed) = v.parse::<u64>() {
                self.breaker_reset_timeout_ms = parsed;
            }
        }
        if let Ok(v) = std::env::var("CROSSCHECK_SOURCE_BREAKER_HALF_OPEN_MAX_CALLS") {
            if let Ok(parsed) = v.parse::<u32>() {
                self.breaker_half_open_max_calls = parsed.max(1);
            }
        }
        self
    }
}

/// Circuit breaker state machine.
#[derive(Debug)]
enum BreakerState {
    Closed { failures: u32 },
    Open { opened_at: Instant },
    HalfOpen { attempts: u32 },
}

#[derive(Debug)]
struct CircuitBreaker {
    state: BreakerState,
    failure_threshold: u32,
    reset_timeout: Duration,
    half_open_max_calls: u32,
}

impl CircuitBreaker {
    fn new(config: &ResilienceConfig) -> Self {
        Self {
            state: BreakerState::Closed { failures: 0 },
            failure_threshold: config.breaker_failure_threshold.max(1),
            reset_timeout: Duration::from_millis(config.breaker_reset_timeout_ms),
            half_open_max_calls: config.breaker_half_open_max_calls.max(1),
        }
    }

    fn allow(&mut self) -> bool {
        match self.state {
            BreakerState::Closed { .. } => true,
            BreakerState::Open { opened_at } => {
                if opened_at.elapsed() >= self.reset_timeout {
                    self.state = BreakerState::HalfOpen { attempts: 0 };
                    true
                } else {
                    false
                }
            },
            BreakerState::HalfOpen { ref mut attempts } => {
                if *attempts >= self.half_open_max_calls {
                    false
                } else {
                    *attempts += 1;
                    true
                }
            },
        }
    }

    const fn on_success(&mut self) {
        self.state = BreakerState::Closed { failures: 0 };
    }

    fn on_failure(&mut self) -> bool {
        match self.state {
            BreakerState::Closed { ref mut failures } => {
                *failures += 1;
                if *failures >= self.failure_threshold {
                    self.state = BreakerState::Open {
                        opened_at: Instant::now(),
                    };
                    return true;
                }
            },
            BreakerState::HalfOpen { .. } => {
                self.state = BreakerState::Open {
                    opened_at: Instant::now(),
                };
                return true;
            },
            BreakerState::Open { .. } => {},
        }
        false
    }

    fn is_open(&self) -> bool {
        match self.state {
            BreakerState::Open { opened_at } => opened_at.elapsed() < self.reset_timeout,
            _ => false,
        }
    }

    const fn state_value(&self) -> u8 {
        match self.state {
            BreakerState::Closed { .. } => 0,
            BreakerState::Open { .. } => 1,
            BreakerState::HalfOpen { .. } => 2,
        }
    }
}

/// Knowledge-source wrapper with circuit breaker and request instrumentation.
pub struct ResilientSource<S: KnowledgeSource> {
    inner: S,
    config: ResilienceConfig,
    breaker: Mutex<CircuitBreaker>,
}

impl<S: KnowledgeSource> ResilientSource<S> {
    /// Creates a new resilient source wrapper.
    #[must_use]
    pub fn new(inner: S, config: ResilienceConfig) -> Self {
        let breaker = CircuitBreaker::new(&config);
        Self {
            inner,
            config,
            breaker: Mutex::new(breaker),
        }
    }

    fn execute(&self, query: &KnowledgeQuery) -> Result<SourceResult> {
        let source = self.inner.name().to_string();
        let span = tracing::info_span!(
            "source.request",
            source = %source,
            status = tracing::field::Empty,
            error = tracing::field::Empty
        );
        let _enter = span.enter();

        let mut breaker = self
            .breaker
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if !breaker.allow() {
            let breaker_state = breaker.state_value();
            drop(breaker);
            record_breaker_state(&source, breaker_state);
            span.record("status", "circuit_open");
            metrics::counter!(
                "source_requests_total",
                "source" => source.clone(),
                "status" => "circuit_open"
            )
            .increment(1);
            return Err(Error::OperationFailed {
                operation: format!("source_query_{source}"),
                cause: "circuit breaker open".to_string(),
            });
        }
        drop(breaker);

        let mut attempts = 0;
        let max_attempts = self.config.max_retries + 1;
        let mut last_error = None;

        while attempts < max_attempts {
            attempts += 1;
            let attempt_start = Instant::now();
            let result = self.inner.query(query);
            let elapsed = attempt_start.elapsed();

            match result {
                Ok(value) => {
                    record_request(&source, elapsed, "success");
                    let mut breaker = self
                        .breaker
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner);
                    breaker.on_success();
                    let breaker_state = breaker.state_value();
                    drop(breaker);
                    record_breaker_state(&source, breaker_state);
                    span.record("status", "success");
                    return Ok(value);
                },
                Err(err) => {
                    let is_timeout = is_timeout_error(&err);
                    let retryable = is_timeout && attempts < max_attempts;
                    record_request(&source, elapsed, if is_timeout { "timeout" } else { "error" });

                    let mut breaker = self
                        .breaker
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner);
                    let tripped = breaker.on_failure();
                    let breaker_state = breaker.state_value();
                    drop(breaker);
                    record_breaker_state(&source, breaker_state);
                    if tripped {
                        metrics::counter!(
                            "source_circuit_breaker_trips_total",
                            "source" => source.clone()
                        )
                        .increment(1);
                        tracing::warn!(source = %source, "Source circuit breaker opened");
                    }

                    span.record("status", if is_timeout { "timeout" } else { "error" });
                    span.record("error", tracing::field::display(&err));

                    if retryable {
                        metrics::counter!("source_retries_total", "source" => source.clone())
                            .increment(1);
                        if self.config.retry_backoff_ms > 0 {
                            std::thread::sleep(Duration::from_millis(self.config.retry_backoff_ms));
                        }
                        last_error = Some(err);
                    } else {
                        return Err(err);
                    }
                },
            }
        }

        Err(last_error.unwrap_or_else(|| Error::OperationFailed {
            operation: format!("source_query_{source}"),
            cause: "exhausted retries".to_string(),
        }))
    }
}

impl<S: KnowledgeSource> KnowledgeSource for ResilientSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn raw_credibility(&self) -> u8 {
        self.inner.raw_credibility()
    }

    fn is_available(&self) -> bool {
        let open = self
            .breaker
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .is_open();
        if open {
            return false;
        }
        self.inner.is_available()
    }

    fn query(&self, query: &KnowledgeQuery) -> Result<SourceResult> {
        self.execute(query)
    }
}

fn record_request(source: &str, elapsed: Duration, status: &'static str) {
    metrics::counter!(
        "source_requests_total",
        "source" => source.to_string(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "source_request_duration_ms",
        "source" => source.to_string(),
        "status" => status
    )
    .record(elapsed.as_secs_f64() * 1000.0);
}

fn record_breaker_state(source: &str, breaker_state: u8) {
    metrics::gauge!("source_circuit_breaker_state", "source" => source.to_string())
        .set(f64::from(breaker_state));
}

fn is_timeout_error(err: &Error) -> bool {
    match err {
        Error::OperationFailed { cause, .. } => {
            let lower = cause.to_lowercase();
            lower.contains("timeout")
                || lower.contains("timed out")
                || lower.contains("deadline")
                || lower.contains("elapsed")
        },
        Error::InvalidInput(_) => false,
    }
}
