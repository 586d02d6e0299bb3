//! Composed data access facade.
//!
//! [`MarketDataClient`] is the read path the dashboard UI talks to. For
//! each typed request it consults the TTL cache first (a fresh cached
//! value is returned immediately and never blocked by backend trouble)
//! and on a miss runs the fetch through the retry loop and the endpoint's
//! circuit breaker, writing successes back through the cache.
//!
//! Lifecycle events (`Loading` / `Loaded` / `Failed`) are published for
//! every fingerprint so the UI can render spinners and error banners
//! without ever being awaited on.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::api::{
    ApiClient, CompanyMetrics, FinancialReport, NewsItem, Quote, SearchResult, WatchlistEntry,
    WatchlistMutation,
};
use crate::cache::{CacheStats, TtlCache};
use crate::config::Config;
use crate::error::DataError;
use crate::events::{DataEvent, SharedEventHub};
use crate::resilience::{BreakerStats, CircuitBreaker, RetryPolicy, retry_with_backoff};

/// Endpoint keys used to partition the circuit breaker.
mod endpoint {
    pub const QUOTE: &str = "quote";
    pub const METRICS: &str = "metrics";
    pub const FINANCIALS: &str = "financials";
    pub const NEWS: &str = "news";
    pub const SEARCH: &str = "search";
    pub const WATCHLIST: &str = "watchlist";
}

/// Composed read path for dashboard data.
pub struct MarketDataClient {
    api: ApiClient,
    cache: TtlCache<Value>,
    breaker: Arc<CircuitBreaker>,
    retry_policy: RetryPolicy,
    events: SharedEventHub,
}

impl MarketDataClient {
    /// Create a client from config, sharing the given breaker and hub.
    ///
    /// # Errors
    ///
    /// Returns `DataError::Config` when the HTTP client cannot be built.
    pub fn new(
        config: &Config,
        breaker: Arc<CircuitBreaker>,
        events: SharedEventHub,
    ) -> Result<Self, DataError> {
        Ok(Self {
            api: ApiClient::new(&config.api)?,
            cache: TtlCache::new(config.cache.ttl()),
            breaker,
            retry_policy: config.retry.to_policy(),
            events,
        })
    }

    /// Latest quote for a symbol.
    ///
    /// # Errors
    ///
    /// Returns `DataError` on invalid input or when the fetch fails after
    /// exhausting its retry budget.
    pub async fn quote(&self, symbol: &str) -> Result<Quote, DataError> {
        let symbol = validate_symbol(symbol)?;
        let fingerprint = format!("{symbol}:quote");
        let path = format!("/quote/{symbol}");
        self.fetch_typed(endpoint::QUOTE, &fingerprint, &path).await
    }

    /// Valuation and trading metrics for a symbol.
    ///
    /// # Errors
    ///
    /// Same contract as [`MarketDataClient::quote`].
    pub async fn company_metrics(&self, symbol: &str) -> Result<CompanyMetrics, DataError> {
        let symbol = validate_symbol(symbol)?;
        let fingerprint = format!("{symbol}:metrics");
        let path = format!("/metrics/{symbol}");
        self.fetch_typed(endpoint::METRICS, &fingerprint, &path)
            .await
    }

    /// Reported financials for a symbol.
    ///
    /// # Errors
    ///
    /// Same contract as [`MarketDataClient::quote`].
    pub async fn financials(&self, symbol: &str) -> Result<Vec<FinancialReport>, DataError> {
        let symbol = validate_symbol(symbol)?;
        let fingerprint = format!("{symbol}:financials");
        let path = format!("/financials/{symbol}");
        self.fetch_typed(endpoint::FINANCIALS, &fingerprint, &path)
            .await
    }

    /// Recent news for a symbol.
    ///
    /// # Errors
    ///
    /// Same contract as [`MarketDataClient::quote`].
    pub async fn news(&self, symbol: &str) -> Result<Vec<NewsItem>, DataError> {
        let symbol = validate_symbol(symbol)?;
        let fingerprint = format!("{symbol}:news");
        let path = format!("/news/{symbol}");
        self.fetch_typed(endpoint::NEWS, &fingerprint, &path).await
    }

    /// Search for symbols matching a query.
    ///
    /// # Errors
    ///
    /// Same contract as [`MarketDataClient::quote`].
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, DataError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(DataError::Validation("search query is empty".to_string()));
        }
        let fingerprint = format!("search:{}", query.to_lowercase());
        let path = format!("/search?q={query}");
        self.fetch_typed(endpoint::SEARCH, &fingerprint, &path)
            .await
    }

    /// The user's watchlist.
    ///
    /// # Errors
    ///
    /// Same contract as [`MarketDataClient::quote`].
    pub async fn watchlist(&self) -> Result<Vec<WatchlistEntry>, DataError> {
        self.fetch_typed(endpoint::WATCHLIST, "watchlist", "/watchlist")
            .await
    }

    /// Add a symbol to the watchlist, invalidating cached watchlist data.
    ///
    /// # Errors
    ///
    /// Returns `DataError` on invalid input or a failed mutation.
    pub async fn add_to_watchlist(&self, symbol: &str) -> Result<(), DataError> {
        let symbol = validate_symbol(symbol)?;
        let body = WatchlistMutation {
            symbol: symbol.clone(),
        };

        self.breaker
            .execute(endpoint::WATCHLIST, || self.api.post("/watchlist", &body))
            .await?;

        let invalidated = self.cache.remove_matching("watchlist");
        tracing::info!(symbol = %symbol, invalidated, "Added to watchlist");
        Ok(())
    }

    /// Remove a symbol from the watchlist, invalidating cached watchlist
    /// data.
    ///
    /// # Errors
    ///
    /// Returns `DataError` on invalid input or a failed mutation.
    pub async fn remove_from_watchlist(&self, symbol: &str) -> Result<(), DataError> {
        let symbol = validate_symbol(symbol)?;
        let path = format!("/watchlist/{symbol}");

        self.breaker
            .execute(endpoint::WATCHLIST, || self.api.delete(&path))
            .await?;

        let invalidated = self.cache.remove_matching("watchlist");
        tracing::info!(symbol = %symbol, invalidated, "Removed from watchlist");
        Ok(())
    }

    /// Warm the cache for a symbol with a concurrent fan-out of every
    /// data kind. Best-effort: individual failures are logged and
    /// published as events, not returned.
    ///
    /// # Errors
    ///
    /// Returns `DataError::Validation` for an invalid symbol.
    pub async fn preload(&self, symbol: &str) -> Result<(), DataError> {
        let symbol = validate_symbol(symbol)?;

        let (quote, metrics, financials, news) = futures::join!(
            self.quote(&symbol),
            self.company_metrics(&symbol),
            self.financials(&symbol),
            self.news(&symbol),
        );

        let failures = [
            quote.err().map(|e| e.to_string()),
            metrics.err().map(|e| e.to_string()),
            financials.err().map(|e| e.to_string()),
            news.err().map(|e| e.to_string()),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

        if failures.is_empty() {
            tracing::debug!(symbol = %symbol, "Preload complete");
        } else {
            tracing::warn!(symbol = %symbol, failures = ?failures, "Preload partially failed");
        }
        Ok(())
    }

    /// Drop one cached fingerprint.
    pub fn invalidate(&self, fingerprint: &str) -> bool {
        self.cache.remove(fingerprint)
    }

    /// Drop every cached entry.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Cache diagnostics.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Aggregate circuit breaker statistics.
    #[must_use]
    pub fn breaker_stats(&self) -> BreakerStats {
        self.breaker.stats()
    }

    /// Cached-or-fetched JSON for a fingerprint, deserialized into `T`.
    async fn fetch_typed<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        fingerprint: &str,
        path: &str,
    ) -> Result<T, DataError> {
        let value = self.fetch_json(endpoint, fingerprint, path).await?;
        serde_json::from_value(value).map_err(|e| DataError::Parse(e.to_string()))
    }

    /// The composed read path: cache, then retry around the breaker.
    async fn fetch_json(
        &self,
        endpoint: &'static str,
        fingerprint: &str,
        path: &str,
    ) -> Result<Value, DataError> {
        if let Some(value) = self.cache.get(fingerprint) {
            tracing::debug!(fingerprint, "Cache hit");
            let _ = self.events.send_data(DataEvent::Loaded {
                fingerprint: fingerprint.to_string(),
                from_cache: true,
            });
            return Ok(value);
        }

        let _ = self.events.send_data(DataEvent::Loading {
            fingerprint: fingerprint.to_string(),
        });

        let result = retry_with_backoff(&self.retry_policy, endpoint, || {
            self.breaker.execute(endpoint, || self.api.get(path))
        })
        .await;

        match result {
            Ok(value) => {
                self.cache.insert(fingerprint, value.clone());
                let _ = self.events.send_data(DataEvent::Loaded {
                    fingerprint: fingerprint.to_string(),
                    from_cache: false,
                });
                Ok(value)
            }
            Err(err) => {
                let _ = self.events.send_data(DataEvent::Failed {
                    fingerprint: fingerprint.to_string(),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }
}

/// Validate and normalize a stock symbol before any network activity.
fn validate_symbol(symbol: &str) -> Result<String, DataError> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(DataError::Validation("symbol is empty".to_string()));
    }
    if symbol.len() > 10 {
        return Err(DataError::Validation(format!(
            "symbol '{symbol}' is too long"
        )));
    }
    if !symbol
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(DataError::Validation(format!(
            "symbol '{symbol}' contains invalid characters"
        )));
    }
    Ok(symbol)
}
