//! Eventwise Core - budget-constrained event aggregation.
//!
//! This crate contains the business logic of the pipeline: converting a
//! budget into the settlement currency through a cached, circuit-broken
//! rate source, fetching catalog events through a shared permit gate, and
//! joining the two into a filtered result. Transports are consumed through
//! the traits defined in `eventwise-upstream`.

pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod fx;

pub use config::PipelineConfig;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
