//! Configuration for the market data access layer.
//!
//! Provides configuration loading and validation for every component of the
//! client: API endpoint, cache TTL, retry policy, circuit breaker
//! thresholds, health monitoring cadence, and event channel capacities.
//!
//! # Usage
//!
//! ```rust,ignore
//! use market_data_client::config::{Config, load_config};
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("custom/config.yaml"))?;
//!
//! // Or build in code, overriding individual fields
//! let config = Config {
//!     api: ApiConfig { base_url: "https://api.example.com".into(), ..Default::default() },
//!     ..Default::default()
//! };
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::EventHubConfig;
use crate::resilience::{CircuitBreakerConfig, RetryPolicy};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Market data API configuration.
    #[serde(default)]
    pub api: ApiConfig,
    /// Response cache configuration.
    #[serde(default)]
    pub cache: CacheSettings,
    /// Retry policy configuration.
    #[serde(default)]
    pub retry: RetrySettings,
    /// Circuit breaker configuration.
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSettings,
    /// Health monitor configuration.
    #[serde(default)]
    pub health: HealthSettings,
    /// Event channel capacities.
    #[serde(default)]
    pub events: EventSettings,
}

impl Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` when a field is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "api.base_url must not be empty".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.circuit_breaker.failure_threshold == 0 {
            return Err(ConfigError::ValidationError(
                "circuit_breaker.failure_threshold must be at least 1".to_string(),
            ));
        }
        if self.circuit_breaker.success_threshold == 0 {
            return Err(ConfigError::ValidationError(
                "circuit_breaker.success_threshold must be at least 1".to_string(),
            ));
        }
        if self.health.max_consecutive_failures == 0 {
            return Err(ConfigError::ValidationError(
                "health.max_consecutive_failures must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Market data API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the market data API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    /// Per-request timeout as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Response cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Time-to-live for cached responses in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
        }
    }
}

impl CacheSettings {
    /// TTL as a `Duration`.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Maximum number of attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay before the first retry, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Backoff multiplier for exponential growth.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Jitter factor for randomization (0.2 = ±20%).
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
    /// Maximum backoff delay in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter_factor: default_jitter_factor(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetrySettings {
    /// Convert settings to the resilience module's [`RetryPolicy`].
    #[must_use]
    pub const fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
            jitter_factor: self.jitter_factor,
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

/// Circuit breaker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerSettings {
    /// Consecutive failures before an endpoint opens.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Successes in half-open before an endpoint closes.
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
    /// Seconds an endpoint stays open before probation.
    #[serde(default = "default_open_timeout")]
    pub open_timeout_secs: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            success_threshold: default_success_threshold(),
            open_timeout_secs: default_open_timeout(),
        }
    }
}

impl CircuitBreakerSettings {
    /// Convert settings to the resilience module's [`CircuitBreakerConfig`].
    #[must_use]
    pub const fn to_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            success_threshold: self.success_threshold,
            open_timeout: Duration::from_secs(self.open_timeout_secs),
        }
    }
}

/// Health monitor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSettings {
    /// Health endpoint URL. `None` disables monitoring.
    #[serde(default)]
    pub url: Option<String>,
    /// Poll interval in seconds while the circuit is closed.
    #[serde(default = "default_health_interval")]
    pub interval_secs: u64,
    /// Poll interval in seconds while the circuit is open.
    #[serde(default = "default_health_open_interval")]
    pub open_interval_secs: u64,
    /// Consecutive probe failures before forcing the breaker open.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    /// Probe request timeout in seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            url: None,
            interval_secs: default_health_interval(),
            open_interval_secs: default_health_open_interval(),
            max_consecutive_failures: default_max_consecutive_failures(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

impl HealthSettings {
    /// Poll interval while the circuit is closed.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Poll interval while the circuit is open.
    #[must_use]
    pub const fn open_interval(&self) -> Duration {
        Duration::from_secs(self.open_interval_secs)
    }

    /// Probe request timeout.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// Event channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSettings {
    /// Capacity of the data event channel.
    #[serde(default = "default_data_capacity")]
    pub data_capacity: usize,
    /// Capacity of the circuit event channel.
    #[serde(default = "default_circuit_capacity")]
    pub circuit_capacity: usize,
    /// Capacity of the health event channel.
    #[serde(default = "default_health_capacity")]
    pub health_capacity: usize,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            data_capacity: default_data_capacity(),
            circuit_capacity: default_circuit_capacity(),
            health_capacity: default_health_capacity(),
        }
    }
}

impl EventSettings {
    /// Convert settings to the event module's [`EventHubConfig`].
    #[must_use]
    pub const fn to_hub_config(&self) -> EventHubConfig {
        EventHubConfig {
            data_capacity: self.data_capacity,
            circuit_capacity: self.circuit_capacity,
            health_capacity: self.health_capacity,
        }
    }
}

/// Load configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` when the file cannot be read, parsed, or fails
/// validation.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_string(),
        source,
    })?;

    let config: Config = serde_yaml_bw::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

const fn default_request_timeout() -> u64 {
    10
}

const fn default_cache_ttl() -> u64 {
    300
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_base_delay_ms() -> u64 {
    1000
}

const fn default_backoff_multiplier() -> f64 {
    2.0
}

const fn default_jitter_factor() -> f64 {
    0.2
}

const fn default_max_delay_ms() -> u64 {
    30_000
}

const fn default_failure_threshold() -> u32 {
    5
}

const fn default_success_threshold() -> u32 {
    2
}

const fn default_open_timeout() -> u64 {
    30
}

const fn default_health_interval() -> u64 {
    30
}

const fn default_health_open_interval() -> u64 {
    15
}

const fn default_max_consecutive_failures() -> u32 {
    3
}

const fn default_probe_timeout() -> u64 {
    5
}

const fn default_data_capacity() -> usize {
    1024
}

const fn default_circuit_capacity() -> usize {
    256
}

const fn default_health_capacity() -> usize {
    256
}
