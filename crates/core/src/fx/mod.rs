//! FX (Foreign Exchange) module - rate cache, conversion service, and traits.

pub mod currency;
mod fx_errors;
mod fx_model;
mod fx_service;
mod fx_traits;
mod rate_cache;

pub use currency::normalize_currency_code;
pub use fx_errors::FxError;
pub use fx_model::{
    ConversionRequest, ConversionResult, CurrencyRate, FxStatus, RatesSnapshot, RatesSource,
};
pub use fx_service::CurrencyService;
pub use fx_traits::FxServiceTrait;
pub use rate_cache::RateCache;
