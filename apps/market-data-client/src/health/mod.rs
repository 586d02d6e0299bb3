//! Backend health monitoring and circuit synchronization.
//!
//! The circuit breaker only sees the failures the dashboard happens to
//! produce, which can lag reality in both directions. The health monitor
//! closes that gap with an out-of-band probe of the backend's `/health`
//! endpoint and reconciles the two signals:
//!
//! - Repeated probe failures force the breaker open without waiting for
//!   ordinary request failures to accumulate; a failing health check is
//!   stronger evidence of an outage than a failing data call.
//! - A healthy probe whose body reports `circuit_breaker.status ==
//!   "healthy"` moves still-open endpoints into probation ahead of their
//!   timeout, resurrecting circuits the retry path alone would leave
//!   waiting.
//!
//! Polling speeds up while any circuit is open (default 15s vs 30s) to
//! detect recovery faster. Probe errors never propagate to callers; every
//! outcome becomes a status event.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::Client;
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::config::HealthSettings;
use crate::error::DataError;
use crate::events::{CircuitEvent, HealthEvent, SharedEventHub};
use crate::resilience::CircuitBreaker;

/// Client-local judgment of backend liveness.
#[derive(Debug, Clone)]
pub struct HealthSnapshot {
    /// Whether the backend currently looks healthy.
    pub backend_healthy: bool,
    /// Consecutive failed probes.
    pub consecutive_failures: u32,
    /// When the last probe completed.
    pub last_check_at: Option<DateTime<Utc>>,
}

impl Default for HealthSnapshot {
    fn default() -> Self {
        Self {
            backend_healthy: true,
            consecutive_failures: 0,
            last_check_at: None,
        }
    }
}

/// Health probe response body.
#[derive(Debug, Clone, Default, Deserialize)]
struct ProbeResponse {
    /// Overall status string, unused beyond logging.
    #[serde(default)]
    status: Option<String>,
    /// Backend's own view of its circuit state.
    #[serde(default)]
    circuit_breaker: Option<ProbeBreakerStatus>,
}

/// Backend-reported circuit sub-status.
#[derive(Debug, Clone, Deserialize)]
struct ProbeBreakerStatus {
    #[serde(default)]
    status: Option<String>,
}

/// Periodic backend health monitor.
///
/// Owns the polling loop; constructed once at startup and shut down via
/// its [`CancellationToken`]. All shared state lives behind `Arc`s so the
/// monitor can be queried while the loop runs.
pub struct HealthMonitor {
    config: HealthSettings,
    client: Client,
    breaker: Arc<CircuitBreaker>,
    events: SharedEventHub,
    snapshot: RwLock<HealthSnapshot>,
    shutdown: CancellationToken,
}

impl HealthMonitor {
    /// Create a new health monitor.
    ///
    /// # Errors
    ///
    /// Returns `DataError::Config` when the probe HTTP client cannot be
    /// constructed.
    pub fn new(
        config: HealthSettings,
        breaker: Arc<CircuitBreaker>,
        events: SharedEventHub,
        shutdown: CancellationToken,
    ) -> Result<Self, DataError> {
        let client = Client::builder()
            .timeout(config.probe_timeout())
            .build()
            .map_err(|e| DataError::Config(e.to_string()))?;

        Ok(Self {
            config,
            client,
            breaker,
            events,
            snapshot: RwLock::new(HealthSnapshot::default()),
            shutdown,
        })
    }

    /// Current health snapshot.
    #[must_use]
    pub fn snapshot(&self) -> HealthSnapshot {
        self.snapshot.read().clone()
    }

    /// Operator override: force every circuit open, bypassing automatic
    /// logic.
    pub fn force_open_circuit(&self) {
        tracing::warn!("Operator forced circuits open");
        self.breaker.force_open_all();
    }

    /// Operator override: force every circuit closed and forget probe
    /// failures.
    pub fn force_close_circuit(&self) {
        tracing::info!("Operator forced circuits closed");
        self.snapshot.write().consecutive_failures = 0;
        self.breaker.force_close_all();
    }

    /// Spawn the polling loop onto the runtime.
    pub fn spawn(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move { monitor.run().await })
    }

    /// Run the polling loop until cancelled.
    ///
    /// With no health URL configured this logs once and returns; the
    /// monitor is best-effort and its absence is never fatal.
    pub async fn run(self: Arc<Self>) {
        let Some(url) = self.config.url.clone() else {
            tracing::info!("No health URL configured, monitoring disabled");
            return;
        };

        let mut circuit_rx = self.events.circuit_rx();
        let mut poll = tokio::time::interval(self.config.interval());

        tracing::info!(
            url = %url,
            interval_secs = self.config.interval_secs,
            open_interval_secs = self.config.open_interval_secs,
            "Health monitor started"
        );

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    self.probe_once(&url).await;
                }

                event = circuit_rx.recv() => match event {
                    Ok(CircuitEvent::Opened { .. } | CircuitEvent::ForceOpen) => {
                        tracing::info!(
                            interval_secs = self.config.open_interval_secs,
                            "Circuit opened, polling faster"
                        );
                        poll = tokio::time::interval(self.config.open_interval());
                    }
                    Ok(CircuitEvent::Closed { .. } | CircuitEvent::ForceClosed) => {
                        tracing::info!(
                            interval_secs = self.config.interval_secs,
                            "Circuit closed, reverting poll cadence"
                        );
                        self.snapshot.write().consecutive_failures = 0;
                        poll = tokio::time::interval(self.config.interval());
                    }
                    Ok(CircuitEvent::HalfOpen { .. }) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => {}
                },

                () = self.shutdown.cancelled() => {
                    tracing::info!("Health monitor stopped");
                    return;
                }
            }
        }
    }

    /// Issue one health probe. Never fails; every outcome becomes a
    /// status event.
    async fn probe_once(&self, url: &str) {
        let result = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                let body: ProbeResponse = response.json().await.unwrap_or_default();
                self.record_healthy(&body);
            }
            Ok(response) => {
                self.record_unhealthy(&format!("status {}", response.status()));
            }
            Err(e) => {
                self.record_unhealthy(&e.to_string());
            }
        }
    }

    fn record_healthy(&self, body: &ProbeResponse) {
        let checked_at = Utc::now();
        {
            let mut snapshot = self.snapshot.write();
            snapshot.backend_healthy = true;
            snapshot.consecutive_failures = 0;
            snapshot.last_check_at = Some(checked_at);
        }

        tracing::debug!(status = ?body.status, "Health probe passed");
        let _ = self.events.send_health(HealthEvent {
            healthy: true,
            consecutive_failures: 0,
            checked_at,
        });

        self.sync_breaker(body);
    }

    /// Cross-signal override: the backend says it is healthy, so open
    /// endpoints move into probation instead of waiting out the timeout.
    fn sync_breaker(&self, body: &ProbeResponse) {
        let reports_healthy = body
            .circuit_breaker
            .as_ref()
            .and_then(|cb| cb.status.as_deref())
            == Some("healthy");
        if !reports_healthy {
            return;
        }

        let open = self.breaker.open_endpoints();
        if open.is_empty() {
            return;
        }

        tracing::info!(
            endpoints = open.len(),
            "Backend reports healthy, moving open circuits to probation"
        );
        for endpoint in &open {
            self.breaker.force_half_open(endpoint);
        }
    }

    fn record_unhealthy(&self, reason: &str) {
        let checked_at = Utc::now();
        let failures = {
            let mut snapshot = self.snapshot.write();
            snapshot.backend_healthy = false;
            snapshot.consecutive_failures += 1;
            snapshot.last_check_at = Some(checked_at);
            snapshot.consecutive_failures
        };

        tracing::warn!(reason, consecutive_failures = failures, "Health probe failed");
        let _ = self.events.send_health(HealthEvent {
            healthy: false,
            consecutive_failures: failures,
            checked_at,
        });

        if failures == self.config.max_consecutive_failures {
            tracing::error!(
                failures,
                "Health check failure threshold reached, forcing circuits open"
            );
            self.breaker.force_open_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventHub;
    use crate::resilience::{CircuitBreakerConfig, CircuitState};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Fixture {
        monitor: Arc<HealthMonitor>,
        breaker: Arc<CircuitBreaker>,
        events: SharedEventHub,
    }

    fn make_fixture(url: Option<String>) -> Fixture {
        let events: SharedEventHub = Arc::new(EventHub::with_defaults());
        let breaker = Arc::new(CircuitBreaker::new(
            CircuitBreakerConfig::default(),
            Arc::clone(&events),
        ));
        let monitor = Arc::new(
            HealthMonitor::new(
                HealthSettings {
                    url,
                    ..Default::default()
                },
                Arc::clone(&breaker),
                Arc::clone(&events),
                CancellationToken::new(),
            )
            .unwrap(),
        );
        Fixture {
            monitor,
            breaker,
            events,
        }
    }

    #[tokio::test]
    async fn healthy_probe_resets_failures_and_emits_event() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .and(header("cache-control", "no-store"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})),
            )
            .mount(&server)
            .await;

        let fixture = make_fixture(Some(format!("{}/health", server.uri())));
        let mut health_rx = fixture.events.health_rx();

        // Seed some failures, then recover
        fixture.monitor.snapshot.write().consecutive_failures = 2;
        fixture
            .monitor
            .probe_once(&format!("{}/health", server.uri()))
            .await;

        let snapshot = fixture.monitor.snapshot();
        assert!(snapshot.backend_healthy);
        assert_eq!(snapshot.consecutive_failures, 0);
        assert!(snapshot.last_check_at.is_some());

        let event = health_rx.try_recv().unwrap();
        assert!(event.healthy);
    }

    #[tokio::test]
    async fn three_failed_probes_force_circuits_open() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fixture = make_fixture(Some(format!("{}/health", server.uri())));
        let url = format!("{}/health", server.uri());

        // Breaker's own counters stay below its threshold throughout
        fixture.breaker.record_failure("quote");

        fixture.monitor.probe_once(&url).await;
        fixture.monitor.probe_once(&url).await;
        assert_eq!(fixture.breaker.state("quote").state, CircuitState::Closed);

        fixture.monitor.probe_once(&url).await;
        assert_eq!(fixture.breaker.state("quote").state, CircuitState::Open);
        assert_eq!(fixture.monitor.snapshot().consecutive_failures, 3);
        assert!(!fixture.monitor.snapshot().backend_healthy);
    }

    #[tokio::test]
    async fn transport_error_counts_as_a_failed_probe() {
        let fixture = make_fixture(Some("http://127.0.0.1:1/health".to_string()));

        fixture.monitor.probe_once("http://127.0.0.1:1/health").await;

        let snapshot = fixture.monitor.snapshot();
        assert!(!snapshot.backend_healthy);
        assert_eq!(snapshot.consecutive_failures, 1);
    }

    #[tokio::test]
    async fn healthy_substatus_moves_open_endpoints_to_probation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok",
                "circuit_breaker": {"status": "healthy"}
            })))
            .mount(&server)
            .await;

        let fixture = make_fixture(Some(format!("{}/health", server.uri())));
        fixture.breaker.force_open("quote");
        fixture.breaker.force_open("metrics");

        fixture
            .monitor
            .probe_once(&format!("{}/health", server.uri()))
            .await;

        assert_eq!(fixture.breaker.state("quote").state, CircuitState::HalfOpen);
        assert_eq!(
            fixture.breaker.state("metrics").state,
            CircuitState::HalfOpen
        );
    }

    #[tokio::test]
    async fn healthy_probe_without_substatus_leaves_circuits_open() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})),
            )
            .mount(&server)
            .await;

        let fixture = make_fixture(Some(format!("{}/health", server.uri())));
        fixture.breaker.force_open("quote");

        fixture
            .monitor
            .probe_once(&format!("{}/health", server.uri()))
            .await;

        assert_eq!(fixture.breaker.state("quote").state, CircuitState::Open);
    }

    #[tokio::test]
    async fn operator_overrides_drive_the_breaker() {
        let fixture = make_fixture(None);
        fixture.breaker.record_success("quote");

        fixture.monitor.force_open_circuit();
        assert_eq!(fixture.breaker.state("quote").state, CircuitState::Open);

        fixture.monitor.force_close_circuit();
        assert_eq!(fixture.breaker.state("quote").state, CircuitState::Closed);
        assert_eq!(fixture.monitor.snapshot().consecutive_failures, 0);
    }

    #[tokio::test]
    async fn run_without_url_is_a_no_op() {
        let fixture = make_fixture(None);
        // Returns immediately instead of looping
        Arc::clone(&fixture.monitor).run().await;
    }

    #[tokio::test]
    async fn shutdown_token_stops_the_loop() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})),
            )
            .mount(&server)
            .await;

        let fixture = make_fixture(Some(format!("{}/health", server.uri())));
        let handle = fixture.monitor.spawn();

        // Give the loop a moment to issue its immediate first probe
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        fixture.monitor.shutdown.cancel();
        handle.await.unwrap();

        assert!(fixture.monitor.snapshot().last_check_at.is_some());
    }
}
