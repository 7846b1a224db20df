//! Upstream transport traits.
//!
//! The pipeline only talks to its upstreams through these traits, so the
//! HTTP clients can be swapped for in-memory doubles in tests.

use async_trait::async_trait;

use crate::errors::UpstreamError;
use crate::models::{EpochSpan, Event, RateTable};

/// Catalog of events that can be listed for a time span.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use eventwise_upstream::provider::EventCatalog;
///
/// struct FixedCatalog(Vec<Event>);
///
/// #[async_trait]
/// impl EventCatalog for FixedCatalog {
///     fn id(&self) -> &'static str {
///         "FIXED"
///     }
///
///     async fn list_events(&self, _span: EpochSpan, _page_size: u32) -> Result<Vec<Event>, UpstreamError> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
#[async_trait]
pub trait EventCatalog: Send + Sync {
    /// Unique identifier for this catalog, used in logs and errors.
    fn id(&self) -> &'static str;

    /// List events active inside `span`.
    ///
    /// One call is one upstream round trip; the caller is responsible for
    /// gating and timing it out.
    async fn list_events(&self, span: EpochSpan, page_size: u32)
        -> Result<Vec<Event>, UpstreamError>;
}

/// Source of the daily exchange-rate table.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Unique identifier for this provider, used in logs and errors.
    fn id(&self) -> &'static str;

    /// Fetch the current rate table in one upstream round trip.
    async fn fetch_daily_rates(&self) -> Result<RateTable, UpstreamError>;
}
