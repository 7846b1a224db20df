//! Pipeline configuration.

use std::time::Duration;

use chrono_tz::Tz;
use eventwise_upstream::CircuitBreakerConfig;

use crate::constants::{CATALOG_TIMEZONE, DEFAULT_WINDOW_DAYS};
use crate::errors::{Error, Result};

/// Tunables shared by the conversion service and the event source.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Permit gate capacity: catalog calls allowed in flight at once.
    pub max_concurrent_requests: usize,
    /// Bound on every single upstream round trip.
    pub upstream_timeout: Duration,
    /// How long a fetched rate table counts as fresh.
    pub rates_cache_ttl: Duration,
    pub circuit_breaker: CircuitBreakerConfig,
    /// Length of the default window, counted from its first day.
    pub default_window_days: u32,
    /// Split the window into catalog queries of this many days. `None` sends
    /// a single query covering the whole window.
    pub query_span_days: Option<u32>,
    pub catalog_page_size: u32,
    /// Timezone used to turn calendar days into epoch bounds.
    pub catalog_timezone: Tz,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 4,
            upstream_timeout: Duration::from_secs(5),
            rates_cache_ttl: Duration::from_secs(60 * 60),
            circuit_breaker: CircuitBreakerConfig::default(),
            default_window_days: DEFAULT_WINDOW_DAYS,
            query_span_days: None,
            catalog_page_size: 100,
            catalog_timezone: CATALOG_TIMEZONE,
        }
    }
}

impl PipelineConfig {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_requests == 0 {
            return Err(Error::InvalidConfigValue(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.upstream_timeout.is_zero() {
            return Err(Error::InvalidConfigValue(
                "upstream_timeout must be positive".to_string(),
            ));
        }
        if self.rates_cache_ttl.is_zero() {
            return Err(Error::InvalidConfigValue(
                "rates_cache_ttl must be positive".to_string(),
            ));
        }
        if self.circuit_breaker.failure_threshold == 0 {
            return Err(Error::InvalidConfigValue(
                "circuit_breaker.failure_threshold must be at least 1".to_string(),
            ));
        }
        if self.circuit_breaker.half_open_success_threshold == 0 {
            return Err(Error::InvalidConfigValue(
                "circuit_breaker.half_open_success_threshold must be at least 1".to_string(),
            ));
        }
        if self.query_span_days == Some(0) {
            return Err(Error::InvalidConfigValue(
                "query_span_days must be at least 1".to_string(),
            ));
        }
        if self.catalog_page_size == 0 {
            return Err(Error::InvalidConfigValue(
                "catalog_page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
