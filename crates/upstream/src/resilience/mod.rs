//! Resilience primitives shared by the upstream clients.
//!
//! This module provides:
//! - Admission control bounding concurrent outbound calls (`PermitGate`)
//! - Circuit breaking for fault tolerance (`CircuitBreaker`)

mod circuit_breaker;
mod permit_gate;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitMetrics, CircuitState};
pub use permit_gate::{PermitGate, PermitGuard};
