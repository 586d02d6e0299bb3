//! Health Sync Integration Tests
//!
//! Exercises the health monitor's running loop against a mock backend:
//! failed probes forcing circuits open ahead of the breaker's own
//! threshold, and a healthy backend-reported sub-status reviving open
//! circuits into probation.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use market_data_client::config::HealthSettings;
use market_data_client::{
    CircuitBreaker, CircuitBreakerConfig, CircuitEvent, CircuitState, EventHub, HealthMonitor,
    SharedEventHub,
};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Fixture {
    monitor: Arc<HealthMonitor>,
    breaker: Arc<CircuitBreaker>,
    events: SharedEventHub,
    shutdown: CancellationToken,
}

fn make_fixture(health_url: String, max_consecutive_failures: u32) -> Fixture {
    let events: SharedEventHub = Arc::new(EventHub::with_defaults());
    let breaker = Arc::new(CircuitBreaker::new(
        CircuitBreakerConfig::default(),
        Arc::clone(&events),
    ));
    let shutdown = CancellationToken::new();
    let monitor = Arc::new(
        HealthMonitor::new(
            HealthSettings {
                url: Some(health_url),
                interval_secs: 1,
                open_interval_secs: 1,
                max_consecutive_failures,
                ..Default::default()
            },
            Arc::clone(&breaker),
            Arc::clone(&events),
            shutdown.clone(),
        )
        .unwrap(),
    );
    Fixture {
        monitor,
        breaker,
        events,
        shutdown,
    }
}

#[tokio::test]
async fn failing_backend_forces_circuits_open() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let fixture = make_fixture(format!("{}/health", server.uri()), 1);
    // The breaker's own counters are nowhere near its threshold
    fixture.breaker.record_failure("quote");

    let mut circuit_rx = fixture.events.circuit_rx();
    let handle = fixture.monitor.spawn();

    // First probe fires immediately; threshold 1 forces circuits open
    loop {
        let event = timeout(Duration::from_secs(3), circuit_rx.recv())
            .await
            .expect("expected a circuit event before timeout")
            .unwrap();
        match event {
            CircuitEvent::ForceOpen => break,
            _ => continue,
        }
    }

    assert_eq!(fixture.breaker.state("quote").state, CircuitState::Open);
    let snapshot = fixture.monitor.snapshot();
    assert!(!snapshot.backend_healthy);

    fixture.shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn healthy_substatus_revives_open_circuits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "ok",
            "circuit_breaker": {"status": "healthy"}
        })))
        .mount(&server)
        .await;

    let fixture = make_fixture(format!("{}/health", server.uri()), 3);
    fixture.breaker.force_open("quote");

    let mut circuit_rx = fixture.events.circuit_rx();
    let handle = fixture.monitor.spawn();

    loop {
        let event = timeout(Duration::from_secs(3), circuit_rx.recv())
            .await
            .expect("expected a circuit event before timeout")
            .unwrap();
        if matches!(event, CircuitEvent::HalfOpen { ref endpoint } if endpoint == "quote") {
            break;
        }
    }

    assert_eq!(fixture.breaker.state("quote").state, CircuitState::HalfOpen);
    let snapshot = fixture.monitor.snapshot();
    assert!(snapshot.backend_healthy);
    assert_eq!(snapshot.consecutive_failures, 0);

    fixture.shutdown.cancel();
    handle.await.unwrap();
}
