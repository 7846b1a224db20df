use std::sync::Arc;

use chrono::NaiveDate;
use eventwise_upstream::{CircuitState, RateTable};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    pub from_currency: String,
    pub to_currency: String,
    pub amount: Decimal,
}

impl ConversionRequest {
    pub fn new(from_currency: &str, to_currency: &str, amount: Decimal) -> Self {
        Self {
            from_currency: from_currency.to_string(),
            to_currency: to_currency.to_string(),
            amount,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub from_currency: String,
    pub to_currency: String,
    pub converted_amount: Decimal,
}

/// Settlement-currency price of one unit of `currency`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyRate {
    pub currency: String,
    pub rate: Decimal,
}

/// Where a rate table handed out by the cache came from.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RatesSource {
    /// Fetched from the provider for this caller or a concurrent one.
    Upstream,
    /// Served from a table still inside its TTL.
    Cache,
    /// Refresh failed or was skipped; an expired table was served instead.
    StaleCache,
    /// Refresh failed and nothing was cached; the table is empty.
    Fallback,
}

/// A rate table together with how it was obtained.
#[derive(Debug, Clone)]
pub struct RatesSnapshot {
    pub table: Arc<RateTable>,
    pub source: RatesSource,
}

impl RatesSnapshot {
    /// True when the table cannot answer any lookup.
    pub fn is_unavailable(&self) -> bool {
        self.table.is_empty()
    }
}

/// Observational state of the conversion side. Not used for decisions.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FxStatus {
    pub provider: String,
    pub circuit_state: CircuitState,
    pub failure_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    pub cached_rates: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_age_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rates_date: Option<NaiveDate>,
    pub upstream_fetches: u64,
}
