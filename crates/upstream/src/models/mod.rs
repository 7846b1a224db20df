//! Upstream models
//!
//! This module contains the records exchanged with the upstream services:
//! - `event` - Catalog events and the date window they are queried with (Event, DateWindow, EpochSpan)
//! - `rates` - Daily exchange-rate snapshot (RateTable)
//! - `types` - Type aliases for common identifiers (ProviderId)

mod event;
mod rates;
mod types;

pub use event::{DateWindow, EpochSpan, Event, WindowError};
pub use rates::{parse_rate_value, RateTable};
pub use types::ProviderId;
