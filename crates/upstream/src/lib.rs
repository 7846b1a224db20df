//! Eventwise Upstream Crate
//!
//! This crate holds everything that touches the two upstream services the
//! budget pipeline depends on: the KudaGo event catalog and the CBR daily
//! exchange-rate feed.
//!
//! # Overview
//!
//! The upstream crate provides:
//! - Records exchanged with the upstreams (events, date windows, rate tables)
//! - Transport traits plus their reqwest implementations
//! - A permit gate bounding concurrent outbound calls
//! - A circuit breaker for a failing upstream
//! - The upstream error taxonomy with retry classification
//!
//! # Architecture
//!
//! ```text
//! +------------------+        +------------------+
//! |   eventwise-core | -----> |   PermitGate     |  (admission control)
//! +------------------+        +------------------+
//!          |                           |
//!          |                           v
//!          |                  +------------------+
//!          |                  |  EventCatalog    |  (KudaGo JSON)
//!          |                  +------------------+
//!          v
//! +------------------+        +------------------+
//! |  CircuitBreaker  | -----> |  RateProvider    |  (CBR XML)
//! +------------------+        +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`Event`] - Catalog event with its free-form price text
//! - [`DateWindow`] - Inclusive day range, validated `from <= to`
//! - [`RateTable`] - Immutable snapshot of rates against the settlement currency
//! - [`PermitGate`] - Fair, cancellation-safe semaphore wrapper
//! - [`CircuitBreaker`] - Rolling-window breaker with half-open probing

pub mod errors;
pub mod models;
pub mod provider;
pub mod resilience;

// Re-export all public types from models
pub use models::{
    parse_rate_value, DateWindow, EpochSpan, Event, ProviderId, RateTable, WindowError,
};

// Re-export provider types
pub use provider::cbr::CbrRateProvider;
pub use provider::kudago::KudaGoCatalog;
pub use provider::{EventCatalog, RateProvider};

// Re-export resilience types
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitMetrics, CircuitState, PermitGate, PermitGuard,
};

pub use errors::{RetryClass, UpstreamError};
