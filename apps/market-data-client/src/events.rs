//! Lifecycle event distribution.
//!
//! Implements notification fan-out using tokio broadcast channels so UI
//! collaborators can react to data loads, circuit transitions, and health
//! status changes without the core ever depending on a response.
//!
//! # Architecture
//!
//! The [`EventHub`] provides a separate channel per event family:
//! - Data lifecycle events (loading / loaded / failed) keyed by fingerprint
//! - Circuit breaker transitions keyed by endpoint
//! - Backend health status updates
//!
//! Each channel supports multiple receivers with configurable capacity.
//! Sends are fire-and-forget: with no subscribers the event is dropped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

// =============================================================================
// Event Types
// =============================================================================

/// Data request lifecycle event.
#[derive(Debug, Clone)]
pub enum DataEvent {
    /// A fetch started for the given fingerprint.
    Loading {
        /// Cache fingerprint of the request.
        fingerprint: String,
    },
    /// Data is available for the given fingerprint.
    Loaded {
        /// Cache fingerprint of the request.
        fingerprint: String,
        /// Whether the value was served from cache.
        from_cache: bool,
    },
    /// A fetch failed after exhausting its attempt budget.
    Failed {
        /// Cache fingerprint of the request.
        fingerprint: String,
        /// Human-readable failure description.
        message: String,
    },
}

/// Circuit breaker transition event.
#[derive(Debug, Clone)]
pub enum CircuitEvent {
    /// An endpoint transitioned to open.
    Opened {
        /// Endpoint that opened.
        endpoint: String,
    },
    /// An endpoint transitioned to closed.
    Closed {
        /// Endpoint that closed.
        endpoint: String,
    },
    /// An endpoint entered probation.
    HalfOpen {
        /// Endpoint under probation.
        endpoint: String,
    },
    /// All endpoints were forced open by an operator or the health monitor.
    ForceOpen,
    /// All endpoints were forced closed by an operator.
    ForceClosed,
}

/// Backend health status event.
#[derive(Debug, Clone)]
pub struct HealthEvent {
    /// Whether the backend currently looks healthy.
    pub healthy: bool,
    /// Consecutive failed probes at the time of this event.
    pub consecutive_failures: u32,
    /// When the probe completed.
    pub checked_at: DateTime<Utc>,
}

// =============================================================================
// Event Hub
// =============================================================================

/// Configuration for event channel capacities.
#[derive(Debug, Clone, Copy)]
pub struct EventHubConfig {
    /// Capacity for data lifecycle events.
    pub data_capacity: usize,
    /// Capacity for circuit transition events.
    pub circuit_capacity: usize,
    /// Capacity for health status events.
    pub health_capacity: usize,
}

impl Default for EventHubConfig {
    fn default() -> Self {
        Self {
            data_capacity: 1024,
            circuit_capacity: 256,
            health_capacity: 256,
        }
    }
}

/// Central hub for all lifecycle event channels.
///
/// # Example
///
/// ```rust
/// use market_data_client::events::{EventHub, EventHubConfig};
///
/// let hub = EventHub::new(EventHubConfig::default());
///
/// // UI layer subscribes to circuit transitions
/// let mut rx = hub.circuit_rx();
///
/// // Core components publish as state changes
/// // hub.send_circuit(CircuitEvent::Opened { endpoint: "quote".into() });
/// ```
#[derive(Debug)]
pub struct EventHub {
    data_tx: broadcast::Sender<DataEvent>,
    circuit_tx: broadcast::Sender<CircuitEvent>,
    health_tx: broadcast::Sender<HealthEvent>,
}

impl EventHub {
    /// Create a new event hub with the given configuration.
    #[must_use]
    pub fn new(config: EventHubConfig) -> Self {
        Self {
            data_tx: broadcast::channel(config.data_capacity).0,
            circuit_tx: broadcast::channel(config.circuit_capacity).0,
            health_tx: broadcast::channel(config.health_capacity).0,
        }
    }

    /// Create a new event hub with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(EventHubConfig::default())
    }

    /// Publish a data lifecycle event.
    ///
    /// Returns the number of receivers, or `None` with no active receivers.
    pub fn send_data(&self, event: DataEvent) -> Option<usize> {
        self.data_tx.send(event).ok()
    }

    /// Get a new receiver for data lifecycle events.
    #[must_use]
    pub fn data_rx(&self) -> broadcast::Receiver<DataEvent> {
        self.data_tx.subscribe()
    }

    /// Publish a circuit transition event.
    pub fn send_circuit(&self, event: CircuitEvent) -> Option<usize> {
        self.circuit_tx.send(event).ok()
    }

    /// Get a new receiver for circuit transition events.
    #[must_use]
    pub fn circuit_rx(&self) -> broadcast::Receiver<CircuitEvent> {
        self.circuit_tx.subscribe()
    }

    /// Publish a health status event.
    pub fn send_health(&self, event: HealthEvent) -> Option<usize> {
        self.health_tx.send(event).ok()
    }

    /// Get a new receiver for health status events.
    #[must_use]
    pub fn health_rx(&self) -> broadcast::Receiver<HealthEvent> {
        self.health_tx.subscribe()
    }

    /// Get statistics about all channels.
    #[must_use]
    pub fn stats(&self) -> EventHubStats {
        EventHubStats {
            data_receivers: self.data_tx.receiver_count(),
            circuit_receivers: self.circuit_tx.receiver_count(),
            health_receivers: self.health_tx.receiver_count(),
        }
    }
}

/// Shared event hub reference.
pub type SharedEventHub = Arc<EventHub>;

/// Statistics about event channels.
#[derive(Debug, Clone, Default)]
pub struct EventHubStats {
    /// Number of data event receivers.
    pub data_receivers: usize,
    /// Number of circuit event receivers.
    pub circuit_receivers: usize,
    /// Number of health event receivers.
    pub health_receivers: usize,
}

impl EventHubStats {
    /// Total receivers across all channels.
    #[must_use]
    pub const fn total_receivers(&self) -> usize {
        self.data_receivers + self.circuit_receivers + self.health_receivers
    }
}

// =============================================================================
// Tests
// =============================================================================
