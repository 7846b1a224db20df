use async_trait::async_trait;

use super::fx_model::{ConversionRequest, ConversionResult, CurrencyRate, FxStatus};
use crate::errors::Result;

/// Trait defining the contract for FX service operations.
#[async_trait]
pub trait FxServiceTrait: Send + Sync {
    /// Convert `request.amount` from one currency into another.
    async fn convert(&self, request: ConversionRequest) -> Result<ConversionResult>;

    /// Settlement-currency rate of a single currency.
    async fn get_rate(&self, code: &str) -> Result<CurrencyRate>;

    async fn status(&self) -> FxStatus;
}
