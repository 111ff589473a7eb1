//! Circuit breaker guarding the counterparty.
//!
//! # States
//! - Closed: normal operation, every call is attempted
//! - Open: counterparty assumed down, calls fail fast without side effects
//! - Half-Open: a limited number of trial calls test for recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= max_failures
//! Open → Half-Open: timeout elapsed since entering Open (checked lazily)
//! Half-Open → Closed: max_half_open_requests consecutive successes
//! Half-Open → Open: any failure (cooldown restarts)
//! ```
//!
//! # Design Decisions
//! - One mutex serializes admission and settlement; it is never held across an await
//! - Every transition bumps a generation so results from a previous state are discarded
//! - Caller cancellation settles as "ignored" and frees a half-open slot
//! - Counters live in an injected [`CircuitMetrics`] collector, one per breaker

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::schema::CircuitBreakerConfig;
use crate::observability::metrics::CircuitMetrics;
use crate::resilience::Classify;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }

    /// Value exported on the state gauge.
    pub fn gauge_value(&self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::Open => 1.0,
            CircuitState::HalfOpen => 2.0,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tuning knobs for a [`CircuitBreaker`].
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerSettings {
    pub name: String,
    pub max_failures: u32,
    pub timeout: Duration,
    pub max_half_open_requests: u32,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            name: "bacen-dict".to_string(),
            max_failures: 5,
            timeout: Duration::from_secs(60),
            max_half_open_requests: 3,
        }
    }
}

impl From<&CircuitBreakerConfig> for BreakerSettings {
    fn from(config: &CircuitBreakerConfig) -> Self {
        Self {
            name: config.name.clone(),
            max_failures: config.max_failures,
            timeout: Duration::from_secs(config.timeout_secs),
            max_half_open_requests: config.max_half_open_requests,
        }
    }
}

/// Error returned by [`CircuitBreaker::execute`].
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The breaker refused the call; the wrapped function was not invoked.
    #[error("circuit breaker '{name}' is open")]
    Open { name: String },

    /// The wrapped call's own error, passed through.
    #[error(transparent)]
    Inner(E),
}

/// Counters for the current state; zeroed on every transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counts {
    requests: u64,
    total_successes: u64,
    total_failures: u64,
    consecutive_successes: u64,
    consecutive_failures: u64,
}

/// Read-only view of a breaker, as reported by health and admin endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitStats {
    pub name: String,
    pub state: CircuitState,
    pub requests: u64,
    pub total_successes: u64,
    pub total_failures: u64,
    pub consecutive_successes: u64,
    pub consecutive_failures: u64,
    #[serde(rename = "since_state_change_ms", serialize_with = "as_millis")]
    pub since_state_change: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failure,
    Ignored,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    generation: u64,
    counts: Counts,
    changed_at: Instant,
}

/// Consecutive-failure circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    settings: BreakerSettings,
    inner: Mutex<Inner>,
    metrics: Arc<CircuitMetrics>,
}

impl CircuitBreaker {
    /// Create a breaker with its own metrics collector.
    pub fn new(settings: BreakerSettings) -> Self {
        let metrics = Arc::new(CircuitMetrics::new(settings.name.clone()));
        Self::with_metrics(settings, metrics)
    }

    /// Create a breaker reporting into an existing collector.
    pub fn with_metrics(settings: BreakerSettings, metrics: Arc<CircuitMetrics>) -> Self {
        Self {
            settings,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                generation: 0,
                counts: Counts::default(),
                changed_at: Instant::now(),
            }),
            metrics,
        }
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn settings(&self) -> &BreakerSettings {
        &self.settings
    }

    pub fn metrics(&self) -> &Arc<CircuitMetrics> {
        &self.metrics
    }

    /// Current state, applying a pending Open → Half-Open transition.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        self.current_state(&mut inner, Instant::now())
    }

    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    pub fn stats(&self) -> CircuitStats {
        let mut inner = self.lock();
        let now = Instant::now();
        let state = self.current_state(&mut inner, now);
        CircuitStats {
            name: self.settings.name.clone(),
            state,
            requests: inner.counts.requests,
            total_successes: inner.counts.total_successes,
            total_failures: inner.counts.total_failures,
            consecutive_successes: inner.counts.consecutive_successes,
            consecutive_failures: inner.counts.consecutive_failures,
            since_state_change: now.saturating_duration_since(inner.changed_at),
        }
    }

    /// Force the breaker Closed and zero every counter.
    pub fn reset(&self) {
        let mut inner = self.lock();
        let now = Instant::now();
        if inner.state != CircuitState::Closed {
            self.transition(&mut inner, CircuitState::Closed, now);
        } else {
            inner.generation += 1;
            inner.counts = Counts::default();
            inner.changed_at = now;
        }
        tracing::info!(breaker = %self.settings.name, "Circuit breaker reset");
    }

    /// Run `call` if the breaker admits it.
    ///
    /// Errors reporting a caller-side cancellation are not counted, and
    /// neither is a call whose future is dropped before it completes.
    pub async fn execute<F, Fut, T, E>(&self, call: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify,
    {
        let Some(permit) = self.admit() else {
            return Err(BreakerError::Open {
                name: self.settings.name.clone(),
            });
        };
        let result = call().await;
        match &result {
            Ok(_) => permit.settle(Outcome::Success),
            Err(e) if e.cancellation().is_some() => permit.settle(Outcome::Ignored),
            Err(_) => permit.settle(Outcome::Failure),
        }
        result.map_err(BreakerError::Inner)
    }

    fn admit(&self) -> Option<Permit<'_>> {
        match self.try_admit() {
            Some(generation) => {
                self.metrics.record_request();
                Some(Permit {
                    breaker: self,
                    generation,
                    settled: false,
                })
            }
            None => {
                self.metrics.record_rejection();
                tracing::debug!(breaker = %self.settings.name, "Call rejected, circuit open");
                None
            }
        }
    }

    fn try_admit(&self) -> Option<u64> {
        let mut inner = self.lock();
        let now = Instant::now();
        let state = self.current_state(&mut inner, now);

        let admitted = match state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => inner.counts.requests < u64::from(self.settings.max_half_open_requests),
        };
        if !admitted {
            return None;
        }

        inner.counts.requests = inner.counts.requests.saturating_add(1);
        Some(inner.generation)
    }

    fn settle(&self, generation: u64, outcome: Outcome) {
        let mut inner = self.lock();
        let now = Instant::now();
        let state = self.current_state(&mut inner, now);

        match outcome {
            Outcome::Success => self.metrics.record_success(),
            Outcome::Failure => self.metrics.record_failure(),
            Outcome::Ignored => self.metrics.record_ignored(),
        }

        // Outcome belongs to a state that has since been left.
        if generation != inner.generation {
            return;
        }

        match outcome {
            Outcome::Success => {
                inner.counts.total_successes = inner.counts.total_successes.saturating_add(1);
                inner.counts.consecutive_successes = inner.counts.consecutive_successes.saturating_add(1);
                inner.counts.consecutive_failures = 0;
                if state == CircuitState::HalfOpen
                    && inner.counts.consecutive_successes >= u64::from(self.settings.max_half_open_requests)
                {
                    self.transition(&mut inner, CircuitState::Closed, now);
                }
            }
            Outcome::Failure => {
                inner.counts.total_failures = inner.counts.total_failures.saturating_add(1);
                inner.counts.consecutive_failures = inner.counts.consecutive_failures.saturating_add(1);
                inner.counts.consecutive_successes = 0;
                let trip = match state {
                    CircuitState::Closed => {
                        inner.counts.consecutive_failures >= u64::from(self.settings.max_failures)
                    }
                    CircuitState::HalfOpen => true,
                    CircuitState::Open => false,
                };
                if trip {
                    self.transition(&mut inner, CircuitState::Open, now);
                }
            }
            Outcome::Ignored => {
                inner.counts.requests = inner.counts.requests.saturating_sub(1);
            }
        }
    }

    fn current_state(&self, inner: &mut Inner, now: Instant) -> CircuitState {
        if inner.state == CircuitState::Open
            && now.saturating_duration_since(inner.changed_at) >= self.settings.timeout
        {
            self.transition(inner, CircuitState::HalfOpen, now);
        }
        inner.state
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState, now: Instant) {
        let from = inner.state;
        if from == to {
            return;
        }

        inner.state = to;
        inner.generation += 1;
        inner.counts = Counts::default();
        inner.changed_at = now;
        self.metrics.record_transition(from, to);

        match to {
            CircuitState::Open => tracing::warn!(
                breaker = %self.settings.name,
                from = %from,
                cooldown_secs = self.settings.timeout.as_secs(),
                "Circuit breaker opened"
            ),
            _ => tracing::info!(
                breaker = %self.settings.name,
                from = %from,
                to = %to,
                "Circuit breaker state changed"
            ),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An admitted call. Dropping it unsettled (the caller's future was
/// dropped mid-call) counts as ignored.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    settled: bool,
}

impl Permit<'_> {
    fn settle(mut self, outcome: Outcome) {
        self.settled = true;
        self.breaker.settle(self.generation, outcome);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.settle(self.generation, Outcome::Ignored);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::timeouts::Cancellation;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum CallError {
        Down,
        Gone(Cancellation),
    }

    impl Classify for CallError {
        fn is_retryable(&self) -> bool {
            true
        }

        fn cancellation(&self) -> Option<Cancellation> {
            match self {
                CallError::Gone(reason) => Some(*reason),
                CallError::Down => None,
            }
        }
    }

    fn breaker(max_failures: u32) -> CircuitBreaker {
        CircuitBreaker::new(BreakerSettings {
            name: "test".to_string(),
            max_failures,
            timeout: Duration::from_secs(60),
            max_half_open_requests: 3,
        })
    }

    async fn fail(cb: &CircuitBreaker) -> Result<(), BreakerError<CallError>> {
        cb.execute(|| async { Err::<(), _>(CallError::Down) }).await
    }

    async fn succeed(cb: &CircuitBreaker) -> Result<(), BreakerError<CallError>> {
        cb.execute(|| async { Ok::<_, CallError>(()) }).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_after_exactly_max_failures() {
        for max_failures in 1..=6 {
            let cb = breaker(max_failures);
            for i in 1..=max_failures {
                assert_eq!(cb.state(), CircuitState::Closed, "opened early at failure {}", i);
                assert!(matches!(fail(&cb).await, Err(BreakerError::Inner(CallError::Down))));
            }
            assert_eq!(cb.state(), CircuitState::Open);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_consecutive_failures() {
        let cb = breaker(3);
        fail(&cb).await.unwrap_err();
        fail(&cb).await.unwrap_err();
        succeed(&cb).await.unwrap();
        fail(&cb).await.unwrap_err();
        fail(&cb).await.unwrap_err();

        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.stats().consecutive_failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_rejects_without_invoking() {
        let cb = breaker(3);
        for _ in 0..3 {
            fail(&cb).await.unwrap_err();
        }

        let calls = AtomicU32::new(0);
        for _ in 0..5 {
            let result = cb
                .execute(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, CallError>(())
                })
                .await;
            assert!(matches!(result, Err(BreakerError::Open { .. })));
        }

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(matches!(succeed(&cb).await, Err(BreakerError::Open { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(cb.metrics().snapshot().rejections, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens_and_restarts_cooldown() {
        let cb = breaker(1);
        fail(&cb).await.unwrap_err();
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        fail(&cb).await.unwrap_err();
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(matches!(succeed(&cb).await, Err(BreakerError::Open { .. })));

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cb.state(), CircuitState::HalfOpen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_successes_close_with_counters_reset() {
        let cb = breaker(1);
        fail(&cb).await.unwrap_err();
        tokio::time::advance(Duration::from_secs(60)).await;

        succeed(&cb).await.unwrap();
        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        succeed(&cb).await.unwrap();

        let stats = cb.stats();
        assert_eq!(stats.state, CircuitState::Closed);
        assert_eq!(stats.requests, 0);
        assert_eq!(stats.total_successes, 0);
        assert_eq!(stats.consecutive_successes, 0);
        assert_eq!(stats.total_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_three_failures_then_fast_fail() {
        let cb = breaker(3);
        let network_hits = AtomicU32::new(0);

        for _ in 0..3 {
            let _ = cb
                .execute(|| async {
                    network_hits.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(CallError::Down)
                })
                .await;
        }
        let fourth = cb
            .execute(|| async {
                network_hits.fetch_add(1, Ordering::SeqCst);
                Ok::<_, CallError>(())
            })
            .await;

        assert!(matches!(fourth, Err(BreakerError::Open { .. })));
        assert_eq!(network_hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_admission_is_bounded() {
        let cb = Arc::new(breaker(1));
        fail(&cb).await.unwrap_err();
        tokio::time::advance(Duration::from_secs(60)).await;

        let gate = Arc::new(tokio::sync::Notify::new());
        let mut handles = Vec::new();
        for _ in 0..3 {
            let cb = cb.clone();
            let gate = gate.clone();
            handles.push(tokio::spawn(async move {
                cb.execute(|| async move {
                    gate.notified().await;
                    Ok::<_, CallError>(())
                })
                .await
            }));
        }
        tokio::task::yield_now().await;
        while cb.stats().requests < 3 {
            tokio::task::yield_now().await;
        }

        assert!(matches!(succeed(&cb).await, Err(BreakerError::Open { .. })));

        gate.notify_waiters();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_not_counted() {
        let cb = breaker(2);
        for _ in 0..5 {
            let result = cb
                .execute(|| async { Err::<(), _>(CallError::Gone(Cancellation::DeadlineExceeded)) })
                .await;
            assert!(matches!(result, Err(BreakerError::Inner(CallError::Gone(_)))));
        }

        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.stats().total_failures, 0);
        assert_eq!(cb.metrics().snapshot().ignored, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_trial_call_frees_half_open_slot() {
        let cb = breaker(1);
        fail(&cb).await.unwrap_err();
        tokio::time::advance(Duration::from_secs(60)).await;

        for _ in 0..3 {
            let pending = cb.execute(|| async {
                std::future::pending::<()>().await;
                Ok::<_, CallError>(())
            });
            let _ = tokio::time::timeout(Duration::from_millis(10), pending).await;
        }

        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(cb.stats().requests, 0);
        succeed(&cb).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_forces_closed() {
        let cb = breaker(1);
        fail(&cb).await.unwrap_err();
        assert!(cb.is_open());

        cb.reset();
        let stats = cb.stats();
        assert_eq!(stats.state, CircuitState::Closed);
        assert_eq!(stats.consecutive_failures, 0);
        succeed(&cb).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_lived_closed_counters_saturate() {
        let cb = breaker(3);
        {
            let mut inner = cb.lock();
            inner.counts.requests = u64::MAX;
            inner.counts.total_successes = u64::MAX;
            inner.counts.consecutive_successes = u64::MAX;
        }

        succeed(&cb).await.unwrap();

        let stats = cb.stats();
        assert_eq!(stats.state, CircuitState::Closed);
        assert_eq!(stats.requests, u64::MAX);
        assert_eq!(stats.total_successes, u64::MAX);
        assert_eq!(stats.consecutive_successes, u64::MAX);
    }
}
