//! Upstream transports and their implementations.
//!
//! This module contains:
//! - The `EventCatalog` and `RateProvider` traits the pipeline consumes
//! - `kudago`: the KudaGo public events API (JSON)
//! - `cbr`: the Central Bank of Russia daily rates feed (XML)
//!
//! Implementations do one round trip per call and map every transport,
//! status, or decoding failure onto [`UpstreamError`](crate::errors::UpstreamError).
//! Admission control, timeouts, caching and circuit breaking are applied by
//! the callers.

mod traits;

pub mod cbr;
pub mod kudago;

pub use traits::{EventCatalog, RateProvider};
