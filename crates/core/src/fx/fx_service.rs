use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use rust_decimal::Decimal;

use super::currency::normalize_currency_code;
use super::fx_errors::FxError;
use super::fx_model::{
    ConversionRequest, ConversionResult, CurrencyRate, FxStatus, RatesSnapshot,
};
use super::fx_traits::FxServiceTrait;
use super::rate_cache::RateCache;
use crate::constants::{DECIMAL_PRECISION, SETTLEMENT_CURRENCY};
use crate::errors::Result;

/// Currency conversion backed by the shared [`RateCache`].
///
/// The settlement currency always has rate 1 and never requires the table.
#[derive(Clone)]
pub struct CurrencyService {
    cache: Arc<RateCache>,
}

impl CurrencyService {
    pub fn new(cache: Arc<RateCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<RateCache> {
        &self.cache
    }

    /// Outside an open circuit the hint falls back to the full cool-down.
    fn unavailable(&self) -> FxError {
        FxError::RatesUnavailable {
            retry_after: Some(
                self.cache
                    .retry_after()
                    .unwrap_or_else(|| self.cache.cool_down()),
            ),
        }
    }

    /// Rate of `code` in `snapshot`; `missing` builds the error for a code
    /// the table does not know.
    fn lookup(
        &self,
        snapshot: &RatesSnapshot,
        code: &str,
        missing: fn(String) -> FxError,
    ) -> std::result::Result<Decimal, FxError> {
        if code == SETTLEMENT_CURRENCY {
            return Ok(Decimal::ONE);
        }
        match snapshot.table.rate(code) {
            Some(rate) => Ok(rate),
            None if snapshot.is_unavailable() => Err(self.unavailable()),
            None => Err(missing(code.to_string())),
        }
    }
}

#[async_trait]
impl FxServiceTrait for CurrencyService {
    async fn convert(&self, request: ConversionRequest) -> Result<ConversionResult> {
        let from = normalize_currency_code(&request.from_currency)?;
        let to = normalize_currency_code(&request.to_currency)?;

        if request.amount.is_sign_negative() && !request.amount.is_zero() {
            return Err(FxError::InvalidAmount(format!(
                "amount must not be negative, got {}",
                request.amount
            ))
            .into());
        }

        if from == to {
            return Ok(ConversionResult {
                from_currency: from,
                to_currency: to,
                converted_amount: request.amount,
            });
        }

        let snapshot = self.cache.rates().await;
        let from_rate = self.lookup(&snapshot, &from, FxError::UnsupportedCurrency)?;
        let to_rate = self.lookup(&snapshot, &to, FxError::UnsupportedCurrency)?;

        let converted_amount = request
            .amount
            .checked_mul(from_rate)
            .and_then(|value| value.checked_div(to_rate))
            .ok_or_else(|| {
                FxError::InvalidAmount(format!("{} {} cannot be converted", request.amount, from))
            })?
            .round_dp(DECIMAL_PRECISION);

        debug!(
            "Converted {} {} to {} {} (rates {} / {}, {:?})",
            request.amount, from, converted_amount, to, from_rate, to_rate, snapshot.source
        );

        Ok(ConversionResult {
            from_currency: from,
            to_currency: to,
            converted_amount,
        })
    }

    async fn get_rate(&self, code: &str) -> Result<CurrencyRate> {
        let currency = normalize_currency_code(code)?;

        if currency == SETTLEMENT_CURRENCY {
            return Ok(CurrencyRate {
                currency,
                rate: Decimal::ONE,
            });
        }

        let snapshot = self.cache.rates().await;
        let rate = self.lookup(&snapshot, &currency, FxError::CurrencyNotFound)?;
        Ok(CurrencyRate { currency, rate })
    }

    async fn status(&self) -> FxStatus {
        self.cache.status().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use eventwise_upstream::{CircuitBreakerConfig, RateProvider, RateTable, UpstreamError};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FixedProvider {
        table: Option<RateTable>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RateProvider for FixedProvider {
        fn id(&self) -> &'static str {
            "FIXED"
        }

        async fn fetch_daily_rates(&self) -> std::result::Result<RateTable, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.table
                .clone()
                .ok_or_else(|| UpstreamError::status("FIXED", 500, "boom"))
        }
    }

    fn service(table: Option<RateTable>) -> (CurrencyService, Arc<FixedProvider>) {
        let provider = Arc::new(FixedProvider {
            table,
            calls: AtomicUsize::new(0),
        });
        let cache = RateCache::new(
            provider.clone(),
            Duration::from_secs(60),
            Duration::from_secs(1),
            CircuitBreakerConfig::default(),
        );
        (CurrencyService::new(Arc::new(cache)), provider)
    }

    fn table() -> RateTable {
        RateTable::new(None, [("USD", dec!(90)), ("EUR", dec!(100))])
    }

    #[tokio::test]
    async fn test_convert_to_settlement_currency() {
        let (service, _) = service(Some(table()));

        let result = service
            .convert(ConversionRequest::new("usd", "RUB", dec!(10)))
            .await
            .unwrap();

        assert_eq!(result.from_currency, "USD");
        assert_eq!(result.to_currency, "RUB");
        assert_eq!(result.converted_amount, dec!(900));
    }

    #[tokio::test]
    async fn test_cross_conversion_goes_through_settlement() {
        let (service, _) = service(Some(table()));

        let result = service
            .convert(ConversionRequest::new("EUR", "USD", dec!(9)))
            .await
            .unwrap();

        assert_eq!(result.converted_amount, dec!(10));
    }

    #[tokio::test]
    async fn test_settlement_currency_never_touches_table() {
        let (service, provider) = service(None);

        let result = service
            .convert(ConversionRequest::new("rub", "RUB", dec!(1234.5)))
            .await
            .unwrap();
        assert_eq!(result.converted_amount, dec!(1234.5));

        let rate = service.get_rate("RUB").await.unwrap();
        assert_eq!(rate.rate, Decimal::ONE);

        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_code_is_unsupported() {
        let (service, _) = service(Some(table()));

        let err = service
            .convert(ConversionRequest::new("XYZ", "RUB", dec!(1)))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Fx(FxError::UnsupportedCurrency(ref code)) if code == "XYZ"));
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_empty_table_is_unavailable_not_unsupported() {
        let (service, _) = service(None);

        let err = service
            .convert(ConversionRequest::new("USD", "RUB", dec!(1)))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Fx(FxError::RatesUnavailable { .. })));
        assert_eq!(err.status_code(), 503);
    }

    #[tokio::test]
    async fn test_get_rate() {
        let (service, _) = service(Some(table()));

        let rate = service.get_rate("eur").await.unwrap();
        assert_eq!(rate.currency, "EUR");
        assert_eq!(rate.rate, dec!(100));

        let err = service.get_rate("GBP").await.unwrap_err();
        assert!(matches!(err, Error::Fx(FxError::CurrencyNotFound(_))));
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let (service, provider) = service(Some(table()));

        let err = service
            .convert(ConversionRequest::new("US", "RUB", dec!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fx(FxError::InvalidCurrencyCode(_))));

        let err = service
            .convert(ConversionRequest::new("USD", "RUB", dec!(-1)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fx(FxError::InvalidAmount(_))));

        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_amount_converts_to_zero() {
        let (service, _) = service(Some(table()));

        let result = service
            .convert(ConversionRequest::new("USD", "RUB", Decimal::ZERO))
            .await
            .unwrap();
        assert!(result.converted_amount.is_zero());
    }
}
