//! Market Data Client Binary
//!
//! Small driver around the data access layer: wires up the event hub,
//! circuit breaker, and health monitor, then fetches and prints data for
//! the requested symbols.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin market-data-client -- AAPL MSFT
//! ```
//!
//! # Environment Variables
//!
//! - `MARKETDECK_CONFIG`: Path to config YAML (default: config.yaml,
//!   falling back to built-in defaults when absent)
//! - `MARKETDECK_API_BASE`: Override for the API base URL
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use market_data_client::telemetry::init_telemetry;
use market_data_client::{
    CircuitBreaker, Config, EventHub, HealthMonitor, MarketDataClient, load_config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (ignore if missing)
    let _ = dotenvy::dotenv();

    init_telemetry();

    let mut config = resolve_config();
    if let Ok(base) = std::env::var("MARKETDECK_API_BASE") {
        config.api.base_url = base;
    }
    config
        .validate()
        .context("invalid configuration")?;

    tracing::info!(api_base = %config.api.base_url, "Starting market data client");

    let events = Arc::new(EventHub::new(config.events.to_hub_config()));
    let breaker = Arc::new(CircuitBreaker::new(
        config.circuit_breaker.to_breaker_config(),
        Arc::clone(&events),
    ));

    let shutdown = CancellationToken::new();
    let monitor = Arc::new(
        HealthMonitor::new(
            config.health.clone(),
            Arc::clone(&breaker),
            Arc::clone(&events),
            shutdown.clone(),
        )
        .context("failed to build health monitor")?,
    );
    let monitor_handle = monitor.spawn();

    let client = MarketDataClient::new(&config, Arc::clone(&breaker), Arc::clone(&events))
        .context("failed to build data client")?;

    let symbols: Vec<String> = std::env::args().skip(1).collect();
    let symbols = if symbols.is_empty() {
        vec!["AAPL".to_string()]
    } else {
        symbols
    };

    for symbol in &symbols {
        match client.quote(symbol).await {
            Ok(quote) => {
                tracing::info!(
                    symbol = %quote.symbol,
                    price = %quote.price,
                    change_percent = %quote.change_percent,
                    "Quote"
                );
            }
            Err(e) => {
                tracing::error!(symbol = %symbol, error = %e, "Quote fetch failed");
            }
        }
    }

    let stats = client.breaker_stats();
    tracing::info!(
        endpoints = stats.tracked_endpoints,
        calls = stats.total_calls,
        success_rate = stats.success_rate,
        "Breaker stats"
    );

    shutdown.cancel();
    monitor_handle.await.ok();
    Ok(())
}

/// Load config from `MARKETDECK_CONFIG` / `config.yaml`, falling back to
/// defaults when no file exists.
fn resolve_config() -> Config {
    let path = std::env::var("MARKETDECK_CONFIG").ok();
    match load_config(path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "Config file unavailable, using defaults");
            Config::default()
        }
    }
}
