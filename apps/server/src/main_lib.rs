use std::sync::Arc;

use crate::config::Config;
use eventwise_core::{
    events::{BudgetEventService, EventSourceClient},
    fx::{CurrencyService, FxServiceTrait, RateCache},
    PipelineConfig,
};
use eventwise_upstream::{CbrRateProvider, EventCatalog, KudaGoCatalog, PermitGate, RateProvider};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub budget_service: Arc<BudgetEventService>,
    pub fx_service: Arc<dyn FxServiceTrait>,
    /// Shared by every catalog query the process makes.
    pub permit_gate: PermitGate,
}

pub fn init_tracing() {
    let log_format = std::env::var("EW_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // `init` also routes `log` records from the library crates into tracing.
    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let timeout = config.pipeline.upstream_timeout;
    tracing::info!(
        "Event catalog: {}, rate provider: {}",
        config.kudago_base_url,
        config.cbr_daily_url
    );

    let catalog = Arc::new(KudaGoCatalog::new(config.kudago_base_url.clone(), timeout));
    let rates = Arc::new(CbrRateProvider::new(config.cbr_daily_url.clone(), timeout));
    build_state_with(&config.pipeline, catalog, rates)
}

/// Wire the pipeline over the given upstreams.
pub fn build_state_with(
    pipeline: &PipelineConfig,
    catalog: Arc<dyn EventCatalog>,
    rates: Arc<dyn RateProvider>,
) -> anyhow::Result<Arc<AppState>> {
    pipeline.validate()?;

    let permit_gate = PermitGate::new(pipeline.max_concurrent_requests);
    let rate_cache = Arc::new(RateCache::new(
        rates,
        pipeline.rates_cache_ttl,
        pipeline.upstream_timeout,
        pipeline.circuit_breaker.clone(),
    ));
    let fx_service: Arc<dyn FxServiceTrait> = Arc::new(CurrencyService::new(rate_cache));
    let event_source = EventSourceClient::new(catalog, permit_gate.clone(), pipeline);
    let budget_service = Arc::new(BudgetEventService::new(
        event_source,
        fx_service.clone(),
        pipeline,
    ));

    tracing::info!(
        "Pipeline ready: {} catalog permits, rates cached for {:?}",
        permit_gate.capacity(),
        pipeline.rates_cache_ttl
    );

    Ok(Arc::new(AppState {
        budget_service,
        fx_service,
        permit_gate,
    }))
}
