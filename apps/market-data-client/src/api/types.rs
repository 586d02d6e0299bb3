//! Market data API request and response types.
//!
//! These types map directly to the dashboard backend's REST API format.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Quote Types
// ============================================================================

/// Latest price snapshot for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    /// Stock symbol.
    pub symbol: String,
    /// Last traded price.
    pub price: Decimal,
    /// Absolute change since previous close.
    pub change: Decimal,
    /// Percent change since previous close.
    pub change_percent: Decimal,
    /// Previous session close.
    #[serde(default)]
    pub previous_close: Option<Decimal>,
    /// When the backend captured this quote.
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Company Types
// ============================================================================

/// Valuation and trading metrics for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyMetrics {
    /// Stock symbol.
    pub symbol: String,
    /// Market capitalization in dollars.
    #[serde(default)]
    pub market_cap: Option<Decimal>,
    /// Trailing price/earnings ratio.
    #[serde(default)]
    pub pe_ratio: Option<Decimal>,
    /// Earnings per share.
    #[serde(default)]
    pub eps: Option<Decimal>,
    /// Dividend yield as a fraction.
    #[serde(default)]
    pub dividend_yield: Option<Decimal>,
    /// 52-week high.
    #[serde(default)]
    pub week52_high: Option<Decimal>,
    /// 52-week low.
    #[serde(default)]
    pub week52_low: Option<Decimal>,
}

/// One fiscal period of reported financials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialReport {
    /// Stock symbol.
    pub symbol: String,
    /// Fiscal year of the report.
    pub fiscal_year: i32,
    /// Total revenue.
    pub revenue: Decimal,
    /// Net income.
    pub net_income: Decimal,
    /// Total assets.
    #[serde(default)]
    pub total_assets: Option<Decimal>,
    /// Total liabilities.
    #[serde(default)]
    pub total_liabilities: Option<Decimal>,
    /// Free cash flow.
    #[serde(default)]
    pub free_cash_flow: Option<Decimal>,
}

/// A news headline attached to a symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    /// Headline text.
    pub headline: String,
    /// Publisher name.
    pub source: String,
    /// Link to the full story.
    #[serde(default)]
    pub url: Option<String>,
    /// Publication time.
    pub published_at: DateTime<Utc>,
}

/// A symbol match from the search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Stock symbol.
    pub symbol: String,
    /// Company name.
    pub name: String,
    /// Listing exchange.
    #[serde(default)]
    pub exchange: Option<String>,
}

// ============================================================================
// Watchlist Types
// ============================================================================

/// One entry of the user's watchlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistEntry {
    /// Stock symbol.
    pub symbol: String,
    /// When the symbol was added.
    pub added_at: DateTime<Utc>,
}

/// Request body for watchlist mutations.
#[derive(Debug, Clone, Serialize)]
pub struct WatchlistMutation {
    /// Stock symbol to add or remove.
    pub symbol: String,
}

// ============================================================================
// Error Envelope
// ============================================================================

/// Error envelope the API may attach to any response body.
///
/// A 2xx response carrying a non-empty `error` field is a logical failure.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Error description.
    #[serde(default)]
    pub error: Option<String>,
    /// Optional human-readable detail.
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn quote_deserializes_from_api_shape() {
        let json = r#"{
            "symbol": "AAPL",
            "price": 189.25,
            "change": -1.75,
            "change_percent": -0.92,
            "previous_close": 191.0,
            "updated_at": "2026-08-05T14:30:00Z"
        }"#;

        let quote: Quote = serde_json::from_str(json).unwrap();
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.price, dec!(189.25));
        assert_eq!(quote.previous_close, Some(dec!(191.0)));
    }

    #[test]
    fn metrics_tolerate_missing_optional_fields() {
        let json = r#"{"symbol": "AAPL", "pe_ratio": 31.4}"#;
        let metrics: CompanyMetrics = serde_json::from_str(json).unwrap();
        assert_eq!(metrics.pe_ratio, Some(dec!(31.4)));
        assert!(metrics.market_cap.is_none());
        assert!(metrics.week52_high.is_none());
    }

    #[test]
    fn error_body_parses_either_field() {
        let body: ApiErrorBody = serde_json::from_str(r#"{"error": "unknown symbol"}"#).unwrap();
        assert_eq!(body.error.as_deref(), Some("unknown symbol"));

        let body: ApiErrorBody = serde_json::from_str(r#"{"message": "slow down"}"#).unwrap();
        assert!(body.error.is_none());
        assert_eq!(body.message.as_deref(), Some("slow down"));
    }
}
