//! Permit-gated access to the event catalog.
//!
//! A window is turned into one or more catalog queries (one per
//! `query_span_days` slice, or a single query for the whole window). Each
//! query holds a permit from the shared [`PermitGate`] from before the
//! request is sent until its response has been fully read, so the number of
//! catalog calls in flight never exceeds the gate capacity no matter how many
//! requests are being served.

use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use eventwise_upstream::{DateWindow, Event, EventCatalog, PermitGate, UpstreamError};
use futures::stream::{self, BoxStream, StreamExt};
use log::{info, warn};

use crate::config::PipelineConfig;

/// Events gathered for a window, with the number of catalog queries that
/// failed along the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogEvents {
    pub events: Vec<Event>,
    pub failed_queries: usize,
}

impl CatalogEvents {
    /// Some slice of the window is missing.
    pub fn is_partial(&self) -> bool {
        self.failed_queries > 0
    }
}

#[derive(Clone)]
pub struct EventSourceClient {
    catalog: Arc<dyn EventCatalog>,
    gate: PermitGate,
    timeout: Duration,
    page_size: u32,
    span_days: Option<u32>,
    timezone: Tz,
}

impl EventSourceClient {
    pub fn new(catalog: Arc<dyn EventCatalog>, gate: PermitGate, config: &PipelineConfig) -> Self {
        Self {
            catalog,
            gate,
            timeout: config.upstream_timeout,
            page_size: config.catalog_page_size,
            span_days: config.query_span_days,
            timezone: config.catalog_timezone,
        }
    }

    pub fn gate(&self) -> &PermitGate {
        &self.gate
    }

    /// Catalog queries needed to cover `window`.
    pub fn plan(&self, window: DateWindow) -> Vec<DateWindow> {
        match self.span_days {
            Some(span) => window.split(span),
            None => vec![window],
        }
    }

    /// Stream the events of `window`.
    ///
    /// Nothing is requested until the stream is polled. Queries run
    /// concurrently (still bounded by the gate) and their results are
    /// yielded in window order. A failed query yields its error in place of
    /// its events and the remaining queries still run; the stream is
    /// single-use and a new call issues new requests.
    pub fn fetch_events(&self, window: DateWindow) -> BoxStream<'static, Result<Event, UpstreamError>> {
        self.run_queries(self.plan(window))
            .flat_map(|result| {
                let items: Vec<Result<Event, UpstreamError>> = match result {
                    Ok(events) => events.into_iter().map(Ok).collect(),
                    Err(err) => vec![Err(err)],
                };
                stream::iter(items)
            })
            .boxed()
    }

    /// Collect every event of `window`.
    ///
    /// Failed queries are logged and counted; their slices of the window
    /// contribute nothing. Fails only when every query failed.
    pub async fn collect_events(&self, window: DateWindow) -> Result<CatalogEvents, UpstreamError> {
        let queries = self.plan(window);
        let total = queries.len();
        let mut results = self.run_queries(queries);

        let mut events = Vec::new();
        let mut failed_queries = 0;
        let mut last_error = None;
        while let Some(result) = results.next().await {
            match result {
                Ok(batch) => events.extend(batch),
                Err(err) => {
                    warn!("{} query for {} failed: {}", self.catalog.id(), window, err);
                    failed_queries += 1;
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) if failed_queries == total => Err(err),
            _ => Ok(CatalogEvents {
                events,
                failed_queries,
            }),
        }
    }

    /// One result per query, in query order.
    fn run_queries(&self, queries: Vec<DateWindow>) -> BoxStream<'static, Result<Vec<Event>, UpstreamError>> {
        let fan_out = queries.len().min(self.gate.capacity()).max(1);
        let client = self.clone();

        stream::iter(queries)
            .map(move |query| {
                let client = client.clone();
                async move { client.query(query).await }
            })
            .buffered(fan_out)
            .boxed()
    }

    async fn query(&self, window: DateWindow) -> Result<Vec<Event>, UpstreamError> {
        let span = window.epoch_span(self.timezone);
        let catalog = self.catalog.id();

        let result = self
            .gate
            .run(async {
                info!(
                    "{} request for {} started, permits available: {}",
                    catalog,
                    window,
                    self.gate.available_permits()
                );
                match tokio::time::timeout(self.timeout, self.catalog.list_events(span, self.page_size)).await {
                    Ok(result) => result,
                    Err(_) => Err(UpstreamError::Timeout {
                        provider: catalog.to_string(),
                    }),
                }
            })
            .await;

        info!(
            "{} request for {} completed, permits available: {}",
            catalog,
            window,
            self.gate.available_permits()
        );
        result
    }
}
