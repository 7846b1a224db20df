use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FxError {
    #[error("Invalid currency code: '{0}'")]
    InvalidCurrencyCode(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unsupported currency code: {0}")]
    UnsupportedCurrency(String),

    #[error("Currency not found: {0}")]
    CurrencyNotFound(String),

    /// Neither a fresh nor a stale rate table is available.
    #[error("Exchange rates are temporarily unavailable")]
    RatesUnavailable { retry_after: Option<Duration> },
}

impl FxError {
    /// HTTP status equivalent of this error.
    pub fn status_code(&self) -> u16 {
        match self {
            FxError::InvalidCurrencyCode(_)
            | FxError::InvalidAmount(_)
            | FxError::UnsupportedCurrency(_) => 400,
            FxError::CurrencyNotFound(_) => 404,
            FxError::RatesUnavailable { .. } => 503,
        }
    }
}
