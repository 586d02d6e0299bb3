//! Circuit breaker for calls to the market data API.
//!
//! Prevents a struggling backend from dragging the dashboard down with it:
//! once an endpoint keeps failing, further calls are rejected immediately
//! instead of piling onto a dependency that cannot answer.
//!
//! # State Machine
//!
//! Each endpoint owns an independent state machine:
//!
//! ```text
//! CLOSED → OPEN (consecutive failures >= failure_threshold)
//! OPEN → HALF_OPEN (open_timeout elapsed, computed on read)
//! HALF_OPEN → CLOSED (successes >= success_threshold)
//! HALF_OPEN → OPEN (any single failure)
//! ```
//!
//! The OPEN → HALF_OPEN transition is lazy: it is evaluated against the
//! endpoint's last failure timestamp whenever state is read, not by a
//! background timer. An endpoint nobody queries during its timeout window
//! will not announce the transition until the next read.
//!
//! # Example
//!
//! ```rust,ignore
//! use market_data_client::resilience::{CircuitBreaker, CircuitBreakerConfig};
//!
//! let breaker = CircuitBreaker::new(CircuitBreakerConfig::default(), events);
//!
//! let quote = breaker
//!     .execute("quote", || api.fetch_quote("AAPL"))
//!     .await?;
//! ```

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};

use crate::error::DataError;
use crate::events::{CircuitEvent, SharedEventHub};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Circuit is closed, calls flow normally.
    Closed,
    /// Circuit is open, calls are rejected.
    Open,
    /// Circuit is testing with trial calls.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "CLOSED"),
            Self::Open => write!(f, "OPEN"),
            Self::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before an endpoint opens.
    pub failure_threshold: u32,
    /// Successes during probation before an endpoint closes.
    pub success_threshold: u32,
    /// Time an endpoint stays open before probation is allowed.
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_timeout: Duration::from_secs(30),
        }
    }
}

/// Per-endpoint circuit record.
#[derive(Debug, Clone)]
struct EndpointRecord {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure_at: Option<Instant>,
}

impl EndpointRecord {
    const fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure_at: None,
        }
    }
}

/// Point-in-time view of one endpoint's circuit.
#[derive(Debug, Clone)]
pub struct EndpointSnapshot {
    /// Endpoint key.
    pub endpoint: String,
    /// Current state after any lazy transition.
    pub state: CircuitState,
    /// Consecutive failure count.
    pub failures: u32,
    /// Success count (probation successes while half-open).
    pub successes: u32,
    /// When the endpoint last failed, if it has.
    pub last_failure_at: Option<Instant>,
}

/// Aggregate statistics across all tracked endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerStats {
    /// Number of endpoints with circuit records.
    pub tracked_endpoints: usize,
    /// Total calls recorded since construction.
    pub total_calls: u64,
    /// Total failures recorded since construction.
    pub total_failures: u64,
    /// Number of state transitions since construction.
    pub state_transitions: u64,
    /// Aggregate success rate (1.0 when no calls have been recorded).
    pub success_rate: f64,
}

/// Circuit breaker keyed by endpoint.
///
/// Each endpoint gets an independent state machine; a failing `financials`
/// endpoint never blocks `quote` traffic. Records are created lazily on
/// first success or failure and removed by [`CircuitBreaker::reset`].
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    endpoints: RwLock<HashMap<String, EndpointRecord>>,
    events: SharedEventHub,
    /// Total calls counter (for stats).
    total_calls: AtomicU64,
    /// Total failures counter (for stats).
    total_failures: AtomicU64,
    /// State transitions counter (for stats).
    state_transitions: AtomicU64,
}

impl CircuitBreaker {
    /// Create a new circuit breaker.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig, events: SharedEventHub) -> Self {
        Self {
            config,
            endpoints: RwLock::new(HashMap::new()),
            events,
            total_calls: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            state_transitions: AtomicU64::new(0),
        }
    }

    /// Get the current state snapshot for an endpoint.
    ///
    /// Evaluates the lazy OPEN → HALF_OPEN transition as a side effect of
    /// the read. An endpoint with no record yet reports CLOSED.
    #[must_use]
    pub fn state(&self, endpoint: &str) -> EndpointSnapshot {
        self.check_open_timeout(endpoint);

        let endpoints = self
            .endpoints
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        endpoints.get(endpoint).map_or_else(
            || EndpointSnapshot {
                endpoint: endpoint.to_string(),
                state: CircuitState::Closed,
                failures: 0,
                successes: 0,
                last_failure_at: None,
            },
            |record| EndpointSnapshot {
                endpoint: endpoint.to_string(),
                state: record.state,
                failures: record.failure_count,
                successes: record.success_count,
                last_failure_at: record.last_failure_at,
            },
        )
    }

    /// Execute an operation through the endpoint's circuit.
    ///
    /// Rejects with [`DataError::CircuitOpen`] while the endpoint is OPEN,
    /// without invoking the operation. Otherwise the outcome is recorded
    /// and the original error propagates unchanged.
    ///
    /// # Errors
    ///
    /// Returns `DataError::CircuitOpen` when rejected, or the operation's
    /// own error on failure.
    pub async fn execute<T, F, Fut>(&self, endpoint: &str, op: F) -> Result<T, DataError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DataError>>,
    {
        if self.state(endpoint).state == CircuitState::Open {
            tracing::debug!(endpoint, "Circuit open, rejecting call");
            return Err(DataError::CircuitOpen {
                endpoint: endpoint.to_string(),
            });
        }

        match op().await {
            Ok(value) => {
                self.record_success(endpoint);
                Ok(value)
            }
            Err(err) => {
                self.record_failure(endpoint);
                Err(err)
            }
        }
    }

    /// Record a successful call for an endpoint.
    ///
    /// Clears the failure timestamp; during probation, reaching the
    /// success threshold closes the endpoint and clears its counters.
    pub fn record_success(&self, endpoint: &str) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);

        let mut endpoints = self
            .endpoints
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let record = endpoints
            .entry(endpoint.to_string())
            .or_insert_with(EndpointRecord::new);

        record.success_count += 1;
        record.last_failure_at = None;

        if record.state == CircuitState::HalfOpen
            && record.success_count >= self.config.success_threshold
        {
            record.state = CircuitState::Closed;
            record.failure_count = 0;
            record.success_count = 0;
            drop(endpoints);

            self.state_transitions.fetch_add(1, Ordering::Relaxed);
            tracing::info!(endpoint, from = "HALF_OPEN", to = "CLOSED", "Circuit closed");
            let _ = self.events.send_circuit(CircuitEvent::Closed {
                endpoint: endpoint.to_string(),
            });
        }
    }

    /// Record a failed call for an endpoint.
    ///
    /// Reaching the failure threshold opens a closed endpoint; a single
    /// failure during probation reopens it immediately.
    pub fn record_failure(&self, endpoint: &str) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        self.total_failures.fetch_add(1, Ordering::Relaxed);

        let mut endpoints = self
            .endpoints
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let record = endpoints
            .entry(endpoint.to_string())
            .or_insert_with(EndpointRecord::new);

        record.failure_count += 1;
        record.last_failure_at = Some(Instant::now());

        let opened = match record.state {
            CircuitState::Closed => {
                if record.failure_count >= self.config.failure_threshold {
                    record.state = CircuitState::Open;
                    true
                } else {
                    false
                }
            }
            // Probation fails fast: one failure reopens the endpoint.
            CircuitState::HalfOpen => {
                record.state = CircuitState::Open;
                true
            }
            CircuitState::Open => false,
        };
        let failures = record.failure_count;
        drop(endpoints);

        if opened {
            self.state_transitions.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(endpoint, failures, to = "OPEN", "Circuit opened");
            let _ = self.events.send_circuit(CircuitEvent::Opened {
                endpoint: endpoint.to_string(),
            });
        }
    }

    /// Drop an endpoint's record, returning it to a fresh CLOSED state.
    pub fn reset(&self, endpoint: &str) {
        let mut endpoints = self
            .endpoints
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        endpoints.remove(endpoint);
        drop(endpoints);
        tracing::info!(endpoint, "Circuit reset");
    }

    /// Force one endpoint open (operator override).
    pub fn force_open(&self, endpoint: &str) {
        if self.transition_to_open(endpoint) {
            let _ = self.events.send_circuit(CircuitEvent::Opened {
                endpoint: endpoint.to_string(),
            });
        }
    }

    /// Force one endpoint closed, clearing its counters.
    pub fn force_close(&self, endpoint: &str) {
        if self.transition_to_closed(endpoint) {
            let _ = self.events.send_circuit(CircuitEvent::Closed {
                endpoint: endpoint.to_string(),
            });
        }
    }

    /// Move one OPEN endpoint into probation ahead of its timeout.
    ///
    /// Used by the health monitor when the backend reports itself healthy
    /// while the client still has the endpoint open.
    pub fn force_half_open(&self, endpoint: &str) {
        if self.transition_to_half_open(endpoint) {
            let _ = self.events.send_circuit(CircuitEvent::HalfOpen {
                endpoint: endpoint.to_string(),
            });
        }
    }

    /// Force every tracked endpoint open.
    ///
    /// Fleet-wide fail-fast for when the backend is known to be down.
    /// Endpoints without a record yet still start CLOSED on first touch.
    pub fn force_open_all(&self) {
        let keys = self.tracked_endpoints();
        for endpoint in &keys {
            self.transition_to_open(endpoint);
        }
        tracing::warn!(endpoints = keys.len(), "All circuits forced open");
        let _ = self.events.send_circuit(CircuitEvent::ForceOpen);
    }

    /// Force every tracked endpoint closed, clearing all counters.
    pub fn force_close_all(&self) {
        let keys = self.tracked_endpoints();
        for endpoint in &keys {
            self.transition_to_closed(endpoint);
        }
        tracing::info!(endpoints = keys.len(), "All circuits forced closed");
        let _ = self.events.send_circuit(CircuitEvent::ForceClosed);
    }

    /// Endpoints currently in the OPEN state (after lazy transitions).
    #[must_use]
    pub fn open_endpoints(&self) -> Vec<String> {
        let keys = self.tracked_endpoints();
        keys.into_iter()
            .filter(|endpoint| self.state(endpoint).state == CircuitState::Open)
            .collect()
    }

    /// Whether any tracked endpoint is currently OPEN.
    #[must_use]
    pub fn any_open(&self) -> bool {
        !self.open_endpoints().is_empty()
    }

    /// Aggregate statistics across all tracked endpoints.
    #[must_use]
    pub fn stats(&self) -> BreakerStats {
        let total_calls = self.total_calls.load(Ordering::Relaxed);
        let total_failures = self.total_failures.load(Ordering::Relaxed);
        // No calls yet reads as fully successful.
        #[allow(clippy::cast_precision_loss)]
        let success_rate = if total_calls == 0 {
            1.0
        } else {
            (total_calls - total_failures) as f64 / total_calls as f64
        };

        let endpoints = self
            .endpoints
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        BreakerStats {
            tracked_endpoints: endpoints.len(),
            total_calls,
            total_failures,
            state_transitions: self.state_transitions.load(Ordering::Relaxed),
            success_rate,
        }
    }

    fn tracked_endpoints(&self) -> Vec<String> {
        let endpoints = self
            .endpoints
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        endpoints.keys().cloned().collect()
    }

    /// Evaluate the lazy OPEN → HALF_OPEN transition for one endpoint.
    fn check_open_timeout(&self, endpoint: &str) {
        let due = {
            let endpoints = self
                .endpoints
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            endpoints.get(endpoint).is_some_and(|record| {
                record.state == CircuitState::Open
                    && record
                        .last_failure_at
                        .is_some_and(|at| at.elapsed() >= self.config.open_timeout)
            })
        };

        if due && self.transition_to_half_open(endpoint) {
            let _ = self.events.send_circuit(CircuitEvent::HalfOpen {
                endpoint: endpoint.to_string(),
            });
        }
    }

    /// Transition an endpoint to OPEN. Returns whether a transition happened.
    fn transition_to_open(&self, endpoint: &str) -> bool {
        let mut endpoints = self
            .endpoints
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let record = endpoints
            .entry(endpoint.to_string())
            .or_insert_with(EndpointRecord::new);

        if record.state == CircuitState::Open {
            return false;
        }
        let previous = record.state;
        record.state = CircuitState::Open;
        // Stamp the timestamp the timeout is measured from.
        record.last_failure_at = Some(Instant::now());
        drop(endpoints);

        self.state_transitions.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(endpoint, from = %previous, to = "OPEN", "Circuit opened");
        true
    }

    /// Transition an endpoint to HALF_OPEN. Returns whether it happened.
    fn transition_to_half_open(&self, endpoint: &str) -> bool {
        let mut endpoints = self
            .endpoints
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some(record) = endpoints.get_mut(endpoint) else {
            return false;
        };

        if record.state != CircuitState::Open {
            return false;
        }
        record.state = CircuitState::HalfOpen;
        // Probation counts successes from zero.
        record.success_count = 0;
        drop(endpoints);

        self.state_transitions.fetch_add(1, Ordering::Relaxed);
        tracing::info!(endpoint, from = "OPEN", to = "HALF_OPEN", "Circuit testing");
        true
    }

    /// Transition an endpoint to CLOSED. Returns whether it happened.
    fn transition_to_closed(&self, endpoint: &str) -> bool {
        let mut endpoints = self
            .endpoints
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some(record) = endpoints.get_mut(endpoint) else {
            return false;
        };

        if record.state == CircuitState::Closed {
            return false;
        }
        let previous = record.state;
        record.state = CircuitState::Closed;
        record.failure_count = 0;
        record.success_count = 0;
        record.last_failure_at = None;
        drop(endpoints);

        self.state_transitions.fetch_add(1, Ordering::Relaxed);
        tracing::info!(endpoint, from = %previous, to = "CLOSED", "Circuit closed");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventHub;
    use std::sync::Arc;
    use std::sync::atomic::AtomicU32;
    use tokio::time::advance;

    fn make_breaker(config: CircuitBreakerConfig) -> CircuitBreaker {
        CircuitBreaker::new(config, Arc::new(EventHub::with_defaults()))
    }

    #[tokio::test]
    async fn initial_state_is_closed() {
        let breaker = make_breaker(CircuitBreakerConfig::default());
        let snapshot = breaker.state("quote");
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.failures, 0);
        assert!(snapshot.last_failure_at.is_none());
    }

    #[tokio::test]
    async fn opens_after_failure_threshold() {
        let breaker = make_breaker(CircuitBreakerConfig::default());

        for _ in 0..4 {
            breaker.record_failure("quote");
        }
        assert_eq!(breaker.state("quote").state, CircuitState::Closed);

        breaker.record_failure("quote");
        assert_eq!(breaker.state("quote").state, CircuitState::Open);
    }

    #[tokio::test]
    async fn endpoints_are_isolated() {
        let breaker = make_breaker(CircuitBreakerConfig::default());

        for _ in 0..5 {
            breaker.record_failure("financials");
        }

        assert_eq!(breaker.state("financials").state, CircuitState::Open);
        assert_eq!(breaker.state("quote").state, CircuitState::Closed);
        assert_eq!(breaker.open_endpoints(), vec!["financials".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn open_transitions_to_half_open_on_read_after_timeout() {
        let breaker = make_breaker(CircuitBreakerConfig::default());

        for _ in 0..5 {
            breaker.record_failure("quote");
        }
        assert_eq!(breaker.state("quote").state, CircuitState::Open);

        advance(Duration::from_secs(29)).await;
        assert_eq!(breaker.state("quote").state, CircuitState::Open);

        advance(Duration::from_secs(2)).await;
        assert_eq!(breaker.state("quote").state, CircuitState::HalfOpen);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_closes_after_success_threshold() {
        let breaker = make_breaker(CircuitBreakerConfig::default());

        for _ in 0..5 {
            breaker.record_failure("quote");
        }
        advance(Duration::from_secs(31)).await;
        assert_eq!(breaker.state("quote").state, CircuitState::HalfOpen);

        breaker.record_success("quote");
        assert_eq!(breaker.state("quote").state, CircuitState::HalfOpen);

        breaker.record_success("quote");
        let snapshot = breaker.state("quote");
        assert_eq!(snapshot.state, CircuitState::Closed);
        // Counters cleared on close
        assert_eq!(snapshot.failures, 0);
        assert_eq!(snapshot.successes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_reopens_on_single_failure() {
        let breaker = make_breaker(CircuitBreakerConfig::default());

        for _ in 0..5 {
            breaker.record_failure("quote");
        }
        advance(Duration::from_secs(31)).await;
        assert_eq!(breaker.state("quote").state, CircuitState::HalfOpen);

        breaker.record_failure("quote");
        assert_eq!(breaker.state("quote").state, CircuitState::Open);
    }

    #[tokio::test]
    async fn execute_rejects_without_invoking_when_open() {
        let breaker = make_breaker(CircuitBreakerConfig {
            failure_threshold: 2,
            ..Default::default()
        });
        let invocations = Arc::new(AtomicU32::new(0));

        let failing_op = |count: Arc<AtomicU32>| async move {
            count.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(DataError::Network("connection refused".to_string()))
        };

        // Two failing calls surface the underlying error and open the circuit
        for _ in 0..2 {
            let counter = Arc::clone(&invocations);
            let result = breaker.execute("quote", || failing_op(counter)).await;
            assert!(matches!(result, Err(DataError::Network(_))));
        }
        assert_eq!(breaker.state("quote").state, CircuitState::Open);

        // Third call is rejected without invoking the operation
        let counter = Arc::clone(&invocations);
        let result = breaker.execute("quote", || failing_op(counter)).await;
        assert!(matches!(result, Err(DataError::CircuitOpen { endpoint }) if endpoint == "quote"));
        assert_eq!(invocations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn execute_records_success() {
        let breaker = make_breaker(CircuitBreakerConfig::default());

        let result = breaker.execute("quote", || async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);

        let snapshot = breaker.state("quote");
        assert_eq!(snapshot.successes, 1);
        assert!(snapshot.last_failure_at.is_none());
    }

    #[tokio::test]
    async fn success_clears_last_failure_timestamp() {
        let breaker = make_breaker(CircuitBreakerConfig::default());

        breaker.record_failure("quote");
        assert!(breaker.state("quote").last_failure_at.is_some());

        breaker.record_success("quote");
        assert!(breaker.state("quote").last_failure_at.is_none());
    }

    #[tokio::test]
    async fn force_open_and_close() {
        let breaker = make_breaker(CircuitBreakerConfig::default());

        breaker.force_open("quote");
        assert_eq!(breaker.state("quote").state, CircuitState::Open);

        breaker.force_close("quote");
        let snapshot = breaker.state("quote");
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn forced_open_endpoint_still_times_out_into_probation() {
        let breaker = make_breaker(CircuitBreakerConfig::default());

        breaker.force_open("quote");
        advance(Duration::from_secs(31)).await;
        assert_eq!(breaker.state("quote").state, CircuitState::HalfOpen);
    }

    #[tokio::test]
    async fn force_open_all_affects_every_tracked_endpoint() {
        let breaker = make_breaker(CircuitBreakerConfig::default());
        breaker.record_success("quote");
        breaker.record_success("metrics");

        breaker.force_open_all();
        assert_eq!(breaker.state("quote").state, CircuitState::Open);
        assert_eq!(breaker.state("metrics").state, CircuitState::Open);
        assert!(breaker.any_open());

        breaker.force_close_all();
        assert!(!breaker.any_open());
    }

    #[tokio::test]
    async fn force_half_open_moves_open_endpoint_into_probation() {
        let breaker = make_breaker(CircuitBreakerConfig::default());

        breaker.force_open("quote");
        breaker.force_half_open("quote");
        assert_eq!(breaker.state("quote").state, CircuitState::HalfOpen);

        // No effect on a closed endpoint
        breaker.force_half_open("metrics");
        assert_eq!(breaker.state("metrics").state, CircuitState::Closed);
    }

    #[tokio::test]
    async fn reset_drops_endpoint_record() {
        let breaker = make_breaker(CircuitBreakerConfig::default());

        for _ in 0..5 {
            breaker.record_failure("quote");
        }
        assert_eq!(breaker.state("quote").state, CircuitState::Open);

        breaker.reset("quote");
        let snapshot = breaker.state("quote");
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.failures, 0);
        assert_eq!(breaker.stats().tracked_endpoints, 0);
    }

    #[tokio::test]
    async fn stats_aggregate_across_endpoints() {
        let breaker = make_breaker(CircuitBreakerConfig::default());
        assert!((breaker.stats().success_rate - 1.0).abs() < f64::EPSILON);

        breaker.record_success("quote");
        breaker.record_success("quote");
        breaker.record_failure("metrics");
        breaker.record_success("news");

        let stats = breaker.stats();
        assert_eq!(stats.tracked_endpoints, 3);
        assert_eq!(stats.total_calls, 4);
        assert_eq!(stats.total_failures, 1);
        assert!((stats.success_rate - 0.75).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn transitions_are_announced_on_the_event_hub() {
        let events = Arc::new(EventHub::with_defaults());
        let breaker = CircuitBreaker::new(
            CircuitBreakerConfig {
                failure_threshold: 1,
                success_threshold: 1,
                ..Default::default()
            },
            Arc::clone(&events),
        );
        let mut rx = events.circuit_rx();

        breaker.record_failure("quote");
        assert!(matches!(
            rx.try_recv().unwrap(),
            CircuitEvent::Opened { endpoint } if endpoint == "quote"
        ));

        advance(Duration::from_secs(31)).await;
        let _ = breaker.state("quote");
        assert!(matches!(
            rx.try_recv().unwrap(),
            CircuitEvent::HalfOpen { endpoint } if endpoint == "quote"
        ));

        breaker.record_success("quote");
        assert!(matches!(
            rx.try_recv().unwrap(),
            CircuitEvent::Closed { endpoint } if endpoint == "quote"
        ));
    }
}
