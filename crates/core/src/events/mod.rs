//! Events module - catalog fetching, price filtering, and the budget aggregator.

mod budget_service;
mod event_source;
mod events_model;
pub mod price_filter;

pub use budget_service::BudgetEventService;
pub use event_source::{CatalogEvents, EventSourceClient};
pub use events_model::{BudgetEvents, BudgetQuery, Degradation};
pub use price_filter::{extract_first_price, is_within_budget};
