// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Market Data Client - Rust Core Library
//!
//! Resilient data access layer for the Marketdeck dashboard. Fetches
//! quotes, company metrics, financials, and news from the market data
//! API while shielding the UI from transient failures and backend
//! outages.
//!
//! # Architecture
//!
//! The read path composes four pieces, leaves first:
//!
//! - [`cache`]: TTL cache keyed by request fingerprint (`SYMBOL:kind`)
//! - [`resilience`]: per-endpoint circuit breaker + bounded retry with
//!   jittered exponential backoff
//! - [`api`]: typed HTTP client for the market data API
//! - [`client`]: the composed facade the UI talks to
//!
//! Independently, [`health`] polls the backend's health endpoint and
//! reconciles server-reported health with the client's circuit state.
//! All components publish lifecycle notifications through [`events`];
//! nothing in this crate ever depends on a consumer responding.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use market_data_client::{
//!     Config, CircuitBreaker, EventHub, HealthMonitor, MarketDataClient,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! let config = Config::default();
//! let events = Arc::new(EventHub::new(config.events.to_hub_config()));
//! let breaker = Arc::new(CircuitBreaker::new(
//!     config.circuit_breaker.to_breaker_config(),
//!     Arc::clone(&events),
//! ));
//!
//! let shutdown = CancellationToken::new();
//! let monitor = Arc::new(HealthMonitor::new(
//!     config.health.clone(),
//!     Arc::clone(&breaker),
//!     Arc::clone(&events),
//!     shutdown.clone(),
//! )?);
//! monitor.spawn();
//!
//! let client = MarketDataClient::new(&config, breaker, events)?;
//! let quote = client.quote("AAPL").await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Typed HTTP client and wire model for the market data API.
pub mod api;

/// TTL cache keyed by request fingerprint.
pub mod cache;

/// Composed data access facade.
pub mod client;

/// Configuration loading and validation.
pub mod config;

/// Error taxonomy for the data access layer.
pub mod error;

/// Lifecycle event distribution.
pub mod events;

/// Backend health monitoring and circuit synchronization.
pub mod health;

/// Circuit breaking and retry with backoff.
pub mod resilience;

/// Console tracing setup.
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use api::{
    ApiClient, CompanyMetrics, FinancialReport, NewsItem, Quote, SearchResult, WatchlistEntry,
};
pub use cache::{CacheStats, TtlCache};
pub use client::MarketDataClient;
pub use config::{Config, ConfigError, load_config};
pub use error::DataError;
pub use events::{CircuitEvent, DataEvent, EventHub, EventHubConfig, HealthEvent, SharedEventHub};
pub use health::{HealthMonitor, HealthSnapshot};
pub use resilience::{
    BreakerStats, CircuitBreaker, CircuitBreakerConfig, CircuitState, EndpointSnapshot,
    RetryPolicy, retry_with_backoff,
};
