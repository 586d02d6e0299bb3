//! HTTP client for the market data API.
//!
//! A thin wrapper over `reqwest` that maps transport failures, non-success
//! statuses, and logical `error` envelopes into [`DataError`]. Retry and
//! circuit breaking deliberately live elsewhere: callers compose this
//! client with the resilience layer, so a single request here is exactly
//! one wire attempt.

mod types;

pub use types::{
    ApiErrorBody, CompanyMetrics, FinancialReport, NewsItem, Quote, SearchResult, WatchlistEntry,
    WatchlistMutation,
};

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::error::DataError;

/// HTTP client for the market data API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client from config.
    ///
    /// # Errors
    ///
    /// Returns `DataError::Config` when the base URL is empty or the
    /// underlying client cannot be constructed.
    pub fn new(config: &ApiConfig) -> Result<Self, DataError> {
        if config.base_url.is_empty() {
            return Err(DataError::Config("api.base_url is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| DataError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a GET request and return the JSON body.
    ///
    /// # Errors
    ///
    /// Returns `DataError` on transport failure, non-2xx status, or a 2xx
    /// body carrying an `error` field.
    pub async fn get(&self, path: &str) -> Result<Value, DataError> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.get(&url).send().await?;
        Self::handle_response(response).await
    }

    /// Issue a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// Same error mapping as [`ApiClient::get`].
    pub async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<Value, DataError> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.post(&url).json(body).send().await?;
        Self::handle_response(response).await
    }

    /// Issue a DELETE request.
    ///
    /// # Errors
    ///
    /// Same error mapping as [`ApiClient::get`].
    pub async fn delete(&self, path: &str) -> Result<Value, DataError> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.delete(&url).send().await?;
        Self::handle_response(response).await
    }

    /// Map a response into a JSON value or a `DataError`.
    async fn handle_response(response: reqwest::Response) -> Result<Value, DataError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| DataError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(Self::status_error(status, &text));
        }

        if text.is_empty() {
            return Ok(Value::Null);
        }

        let value: Value =
            serde_json::from_str(&text).map_err(|e| DataError::Parse(e.to_string()))?;

        // A successful-looking response can still carry a logical failure.
        if let Some(error) = value.get("error").and_then(Value::as_str) {
            return Err(DataError::Api(error.to_string()));
        }

        Ok(value)
    }

    /// Build a `Status` error, preferring the body's own description.
    fn status_error(status: StatusCode, body: &str) -> DataError {
        let message = serde_json::from_str::<ApiErrorBody>(body)
            .ok()
            .and_then(|b| b.error.or(b.message))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

        DataError::Status {
            status: status.as_u16(),
            message,
        }
    }
}
