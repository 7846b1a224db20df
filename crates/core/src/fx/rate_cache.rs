//! Process-wide rate table cache.
//!
//! The cache owns the only copy of the daily rate table and the circuit
//! breaker for the rate provider. Callers only ever read snapshots.
//!
//! Refreshes are single-flight: the first caller to find the table missing
//! or expired takes the refresh lock and talks to the provider; callers that
//! queued behind it reuse the outcome of that attempt instead of issuing
//! their own request. A table that has expired stays servable until a
//! refresh succeeds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use eventwise_upstream::{
    CircuitBreaker, CircuitBreakerConfig, RateProvider, RateTable, RetryClass, UpstreamError,
};
use log::{debug, info, warn};
use tokio::sync::{Mutex, RwLock};

use super::fx_model::{FxStatus, RatesSnapshot, RatesSource};

#[derive(Debug)]
struct CachedTable {
    table: Arc<RateTable>,
    fetched_at: Instant,
}

pub struct RateCache {
    provider: Arc<dyn RateProvider>,
    breaker: CircuitBreaker,
    ttl: Duration,
    timeout: Duration,
    current: RwLock<Option<CachedTable>>,
    refresh_lock: Mutex<()>,
    /// Completed refresh attempts, successful or not.
    attempts: AtomicU64,
    /// Calls that reached the provider.
    fetches: AtomicU64,
}

impl RateCache {
    pub fn new(
        provider: Arc<dyn RateProvider>,
        ttl: Duration,
        timeout: Duration,
        breaker_config: CircuitBreakerConfig,
    ) -> Self {
        let breaker = CircuitBreaker::with_config(provider.id(), breaker_config);
        Self {
            provider,
            breaker,
            ttl,
            timeout,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            attempts: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
        }
    }

    /// Current rate table, refreshing it first if it is missing or expired.
    ///
    /// Never fails: when the provider cannot be reached the stale table is
    /// returned, or an empty one if nothing was ever fetched.
    pub async fn rates(&self) -> RatesSnapshot {
        if let Some(table) = self.fresh_table().await {
            return RatesSnapshot {
                table,
                source: RatesSource::Cache,
            };
        }

        let seen_attempts = self.attempts.load(Ordering::Acquire);
        let _refresh = self.refresh_lock.lock().await;

        if let Some(table) = self.fresh_table().await {
            return RatesSnapshot {
                table,
                source: RatesSource::Upstream,
            };
        }

        if self.attempts.load(Ordering::Acquire) != seen_attempts {
            // A refresh finished while we waited and it did not produce a
            // fresh table; share its outcome.
            debug!("Rate refresh already attempted by a concurrent caller, using its outcome");
            return self.fallback().await;
        }

        self.refresh().await
    }

    /// Drop the cached table. The next call to [`rates`](Self::rates) fetches.
    pub async fn invalidate(&self) {
        let mut current = self.current.write().await;
        if current.take().is_some() {
            info!("Rate table for '{}' invalidated", self.provider.id());
        }
    }

    /// Remaining cool-down when the provider's circuit is open.
    pub fn retry_after(&self) -> Option<Duration> {
        self.breaker.retry_after()
    }

    pub fn cool_down(&self) -> Duration {
        self.breaker.config().recovery_timeout
    }

    pub async fn status(&self) -> FxStatus {
        let metrics = self.breaker.metrics();
        let current = self.current.read().await;

        FxStatus {
            provider: metrics.provider,
            circuit_state: metrics.state,
            failure_count: metrics.failure_count,
            retry_after_secs: metrics.retry_after.map(|d| d.as_secs()),
            cached_rates: current.as_ref().map_or(0, |c| c.table.len()),
            cache_age_secs: current.as_ref().map(|c| c.fetched_at.elapsed().as_secs()),
            rates_date: current.as_ref().and_then(|c| c.table.date()),
            upstream_fetches: self.fetches.load(Ordering::Relaxed),
        }
    }

    async fn fresh_table(&self) -> Option<Arc<RateTable>> {
        let current = self.current.read().await;
        current
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < self.ttl)
            .map(|cached| Arc::clone(&cached.table))
    }

    /// Must be called with the refresh lock held.
    async fn refresh(&self) -> RatesSnapshot {
        let provider = self.provider.id();

        if !self.breaker.is_allowed() {
            debug!(
                "Circuit open for '{}', skipping rate refresh ({:?} left)",
                provider,
                self.breaker.retry_after()
            );
            self.attempts.fetch_add(1, Ordering::AcqRel);
            return self.fallback().await;
        }

        self.fetches.fetch_add(1, Ordering::Relaxed);
        let outcome = match tokio::time::timeout(self.timeout, self.provider.fetch_daily_rates()).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout {
                provider: provider.to_string(),
            }),
        };

        let snapshot = match outcome {
            Ok(table) => {
                self.breaker.record_success();
                info!(
                    "Fetched {} rates from '{}' dated {:?}",
                    table.len(),
                    provider,
                    table.date()
                );
                let table = Arc::new(table);
                *self.current.write().await = Some(CachedTable {
                    table: Arc::clone(&table),
                    fetched_at: Instant::now(),
                });
                RatesSnapshot {
                    table,
                    source: RatesSource::Upstream,
                }
            }
            Err(err) => {
                if err.retry_class() == RetryClass::WithPenalty {
                    self.breaker.record_failure();
                }
                warn!("Rate refresh from '{}' failed: {}", provider, err);
                self.fallback().await
            }
        };

        self.attempts.fetch_add(1, Ordering::AcqRel);
        snapshot
    }

    async fn fallback(&self) -> RatesSnapshot {
        let current = self.current.read().await;
        match current.as_ref() {
            Some(cached) => {
                debug!(
                    "Serving stale rate table ({}s old)",
                    cached.fetched_at.elapsed().as_secs()
                );
                RatesSnapshot {
                    table: Arc::clone(&cached.table),
                    source: RatesSource::StaleCache,
                }
            }
            None => {
                warn!("No rate table available, falling back to an empty table");
                RatesSnapshot {
                    table: Arc::new(RateTable::empty()),
                    source: RatesSource::Fallback,
                }
            }
        }
    }
}
