//! In-memory upstream doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eventwise_core::events::{BudgetEventService, EventSourceClient};
use eventwise_core::fx::{CurrencyService, RateCache};
use eventwise_core::PipelineConfig;
use eventwise_upstream::{
    EpochSpan, Event, EventCatalog, PermitGate, RateProvider, RateTable, UpstreamError,
};
use rust_decimal_macros::dec;

/// Catalog returning a fixed list, or a fixed HTTP error, and tracking
/// how many calls overlap.
pub struct StubCatalog {
    events: Vec<Event>,
    fail_status: Option<u16>,
    fail_since: Option<i64>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl StubCatalog {
    pub fn with_events(events: Vec<Event>) -> Arc<Self> {
        Arc::new(Self::build(events, None, Duration::ZERO))
    }

    pub fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self::build(Vec::new(), Some(status), Duration::ZERO))
    }

    pub fn slow(events: Vec<Event>, delay: Duration) -> Arc<Self> {
        Arc::new(Self::build(events, None, delay))
    }

    /// Answers 502 for the query starting at `since`, `events` otherwise.
    pub fn failing_at(events: Vec<Event>, since: i64) -> Arc<Self> {
        Arc::new(Self {
            fail_since: Some(since),
            ..Self::build(events, None, Duration::ZERO)
        })
    }

    fn build(events: Vec<Event>, fail_status: Option<u16>, delay: Duration) -> Self {
        Self {
            events,
            fail_status,
            fail_since: None,
            delay,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventCatalog for StubCatalog {
    fn id(&self) -> &'static str {
        "STUB_CATALOG"
    }

    async fn list_events(&self, span: EpochSpan, _page_size: u32) -> Result<Vec<Event>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.fail_since == Some(span.since) {
            return Err(UpstreamError::status("STUB_CATALOG", 502, "Bad Gateway"));
        }
        match self.fail_status {
            Some(status) => Err(UpstreamError::status("STUB_CATALOG", status, "stubbed failure")),
            None => Ok(self.events.clone()),
        }
    }
}

/// Rate provider that succeeds for the first `successes` calls and then
/// answers 503.
pub struct StubRates {
    table: RateTable,
    successes: usize,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubRates {
    pub fn healthy() -> Arc<Self> {
        Arc::new(Self::build(usize::MAX, Duration::ZERO))
    }

    pub fn down() -> Arc<Self> {
        Arc::new(Self::build(0, Duration::ZERO))
    }

    pub fn succeeds_times(successes: usize) -> Arc<Self> {
        Arc::new(Self::build(successes, Duration::ZERO))
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self::build(usize::MAX, delay))
    }

    fn build(successes: usize, delay: Duration) -> Self {
        Self {
            table: RateTable::new(None, [("USD", dec!(90)), ("EUR", dec!(100))]),
            successes,
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateProvider for StubRates {
    fn id(&self) -> &'static str {
        "STUB_RATES"
    }

    async fn fetch_daily_rates(&self) -> Result<RateTable, UpstreamError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if call < self.successes {
            Ok(self.table.clone())
        } else {
            Err(UpstreamError::status("STUB_RATES", 503, "Service Unavailable"))
        }
    }
}

/// Fully wired pipeline over the given doubles.
pub struct Pipeline {
    pub budget: BudgetEventService,
    pub currency: CurrencyService,
    pub gate: PermitGate,
}

pub fn pipeline(
    catalog: Arc<StubCatalog>,
    rates: Arc<StubRates>,
    config: PipelineConfig,
) -> Pipeline {
    let gate = PermitGate::new(config.max_concurrent_requests);
    let cache = RateCache::new(
        rates,
        config.rates_cache_ttl,
        config.upstream_timeout,
        config.circuit_breaker.clone(),
    );
    let currency = CurrencyService::new(Arc::new(cache));
    let source = EventSourceClient::new(catalog, gate.clone(), &config);
    let budget = BudgetEventService::new(source, Arc::new(currency.clone()), &config);

    Pipeline {
        budget,
        currency,
        gate,
    }
}
